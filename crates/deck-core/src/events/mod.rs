use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};

use crate::error::DispatchError;
use crate::navigation::{Direction, ShowSubscriber};

/// Undelivered events kept for later inspection
const UNDELIVERED_CAPACITY: usize = 64;

/// Occurrences a show reports to its observers
#[derive(Debug, Clone, PartialEq)]
pub enum ShowEvent<S> {
    /// The show started on `slide`
    Started { slide: S },
    /// A transition committed and `slide` is now current
    Advanced { slide: S, direction: Direction },
    /// The show reached its end; `last` is the final slide
    Ended { last: S },
    /// The show was stopped
    Stopped,
}

/// Discriminant of a [`ShowEvent`], used to route handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShowEventKind {
    Started,
    Advanced,
    Ended,
    Stopped,
}

impl<S> ShowEvent<S> {
    pub fn kind(&self) -> ShowEventKind {
        match self {
            ShowEvent::Started { .. } => ShowEventKind::Started,
            ShowEvent::Advanced { .. } => ShowEventKind::Advanced,
            ShowEvent::Ended { .. } => ShowEventKind::Ended,
            ShowEvent::Stopped => ShowEventKind::Stopped,
        }
    }
}

/// Outbound notification channel of a show
///
/// `emit` is the primary path. When it fails the show logs the failure and
/// calls `emit_fallback`; navigation is never interrupted.
pub trait EventSink<S>: Send + Sync {
    fn emit(&self, event: &ShowEvent<S>) -> Result<(), DispatchError>;

    /// Secondary path used after `emit` failed
    fn emit_fallback(&self, _event: &ShowEvent<S>) {}
}

/// Sink that drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardEvents;

impl<S> EventSink<S> for DiscardEvents {
    fn emit(&self, _event: &ShowEvent<S>) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// Handler trait for event handlers
pub trait EventHandler<S>: Send {
    fn handle(&mut self, event: &ShowEvent<S>) -> Result<(), DispatchError>;
}

/// An event whose primary delivery failed
#[derive(Debug, Clone)]
pub struct UndeliveredEvent<S> {
    pub event: ShowEvent<S>,
    pub failed_at: DateTime<Utc>,
}

/// Event bus fanning show events out to handlers and subscribers
///
/// Handlers are routed by [`ShowEventKind`]; subscribers see every event and
/// are held weakly. Events whose handlers failed land in a bounded
/// undelivered queue, the bus's fallback path.
pub struct EventBus<S> {
    handlers: Arc<Mutex<AHashMap<ShowEventKind, Vec<Box<dyn EventHandler<S>>>>>>,
    subscribers: Arc<RwLock<Vec<Weak<dyn ShowSubscriber<S>>>>>,
    undelivered: Arc<Mutex<VecDeque<UndeliveredEvent<S>>>>,
}

impl<S: Clone + Send + Sync + 'static> EventBus<S> {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(Mutex::new(AHashMap::new())),
            subscribers: Arc::new(RwLock::new(Vec::new())),
            undelivered: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Register a handler for one kind of event
    pub fn subscribe(&self, kind: ShowEventKind, handler: Box<dyn EventHandler<S>>) {
        let mut handlers = self.handlers.lock();
        handlers.entry(kind).or_insert_with(Vec::new).push(handler);
    }

    /// Add a subscriber that sees every event
    pub fn add_subscriber(&self, subscriber: Arc<dyn ShowSubscriber<S>>) {
        let mut subscribers = self.subscribers.write();
        subscribers.push(Arc::downgrade(&subscriber));
    }

    /// Take every event whose primary delivery failed, oldest first
    pub fn drain_undelivered(&self) -> Vec<UndeliveredEvent<S>> {
        self.undelivered.lock().drain(..).collect()
    }

    fn notify_subscribers(&self, event: &ShowEvent<S>) {
        let live: Vec<Arc<dyn ShowSubscriber<S>>> = {
            let mut subscribers = self.subscribers.write();

            // Remove any dead weak references
            subscribers.retain(|weak| weak.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };

        for subscriber in live {
            subscriber.on_show_event(event);
        }
    }

    /// Run the handlers for `event`, returning every failure
    ///
    /// The handlers are taken out of the map while they run, so they may
    /// register further handlers; those are kept after the existing ones.
    fn run_handlers(&self, event: &ShowEvent<S>) -> Vec<DispatchError> {
        let kind = event.kind();
        let Some(mut running) = self.handlers.lock().remove(&kind) else {
            return Vec::new();
        };

        let failures = running
            .iter_mut()
            .filter_map(|handler| handler.handle(event).err())
            .collect();

        let mut handlers = self.handlers.lock();
        if let Some(added) = handlers.remove(&kind) {
            running.extend(added);
        }
        handlers.insert(kind, running);
        failures
    }
}

impl<S: Clone + Send + Sync + 'static> Default for EventBus<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone + Send + Sync + 'static> EventSink<S> for EventBus<S> {
    fn emit(&self, event: &ShowEvent<S>) -> Result<(), DispatchError> {
        self.notify_subscribers(event);
        let failures = self.run_handlers(event);

        match failures.first() {
            None => Ok(()),
            Some(first) => Err(DispatchError::Handler {
                failed: failures.len(),
                first: first.to_string(),
            }),
        }
    }

    fn emit_fallback(&self, event: &ShowEvent<S>) {
        let mut undelivered = self.undelivered.lock();
        if undelivered.len() == UNDELIVERED_CAPACITY {
            undelivered.pop_front();
        }
        undelivered.push_back(UndeliveredEvent {
            event: event.clone(),
            failed_at: Utc::now(),
        });
    }
}

/// Helper struct for creating event handlers from closures
pub struct ClosureEventHandler<F> {
    handler: F,
}

impl<S, F> EventHandler<S> for ClosureEventHandler<F>
where
    F: FnMut(&ShowEvent<S>) -> Result<(), DispatchError> + Send,
{
    fn handle(&mut self, event: &ShowEvent<S>) -> Result<(), DispatchError> {
        (self.handler)(event)
    }
}

/// Create an event handler from a closure
pub fn handler_from_fn<S, F>(f: F) -> Box<dyn EventHandler<S>>
where
    S: 'static,
    F: FnMut(&ShowEvent<S>) -> Result<(), DispatchError> + Send + 'static,
{
    Box::new(ClosureEventHandler { handler: f })
}
