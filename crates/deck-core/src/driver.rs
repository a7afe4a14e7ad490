//! Tokio host for a [`Slideshow`]
//!
//! The engine itself is synchronous. This module supplies the pieces a
//! tokio application needs around it: a [`Scheduler`] backed by spawned
//! sleeps, [`TransitionHooks`] that complete after a fixed animation time,
//! and [`ShowDriver`], a single-task loop feeding every signal back into the
//! show in arrival order.
//!
//! Navigation requests that arrive while a transition is in flight are
//! queued and replayed once it commits.

use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::ShowError;
use crate::navigation::{NavigationOutcome, Slideshow};
use crate::timer::{Scheduler, TimerTicket};
use crate::transition::{ListenerToken, TransitionHooks};
use crate::tree::SlideTree;

/// Input to a running [`ShowDriver`]
#[derive(Debug, Clone, PartialEq)]
pub enum ShowSignal<S> {
    Next,
    Previous,
    Seek(S),
    TimerFired(TimerTicket),
    TransitionFinished(ListenerToken),
    Stop,
}

impl<S> ShowSignal<S> {
    fn is_navigation(&self) -> bool {
        matches!(self, ShowSignal::Next | ShowSignal::Previous | ShowSignal::Seek(_))
    }
}

pub type SignalSender<S> = mpsc::UnboundedSender<ShowSignal<S>>;
pub type SignalReceiver<S> = mpsc::UnboundedReceiver<ShowSignal<S>>;

/// Create the channel a driver listens on
pub fn signal_channel<S>() -> (SignalSender<S>, SignalReceiver<S>) {
    mpsc::unbounded_channel()
}

/// Scheduler that sleeps on the tokio runtime and reports back as signals
///
/// Must be used from within a runtime.
pub struct TokioScheduler<S> {
    signals: SignalSender<S>,
    sleeps: Arc<Mutex<AHashMap<TimerTicket, JoinHandle<()>>>>,
}

impl<S: Send + 'static> TokioScheduler<S> {
    pub fn new(signals: SignalSender<S>) -> Self {
        Self {
            signals,
            sleeps: Arc::new(Mutex::new(AHashMap::new())),
        }
    }

    /// Sleeps that are still running
    pub fn active(&self) -> usize {
        let mut sleeps = self.sleeps.lock();
        sleeps.retain(|_, handle| !handle.is_finished());
        sleeps.len()
    }
}

impl<S: Send + 'static> Scheduler for TokioScheduler<S> {
    fn schedule(&self, delay: Duration, ticket: TimerTicket) {
        let signals = self.signals.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if signals.send(ShowSignal::TimerFired(ticket)).is_err() {
                tracing::trace!(ticket = ticket.id(), "driver gone before timer fired");
            }
        });

        let mut sleeps = self.sleeps.lock();
        sleeps.retain(|_, handle| !handle.is_finished());
        sleeps.insert(ticket, handle);
    }

    fn cancel(&self, ticket: TimerTicket) {
        if let Some(handle) = self.sleeps.lock().remove(&ticket) {
            handle.abort();
        }
    }
}

/// Transition hooks that treat every phase as a fixed-length animation
pub struct TimedTransitions<S> {
    signals: SignalSender<S>,
    phase: Duration,
}

impl<S: Send + 'static> TimedTransitions<S> {
    /// Each hide and show phase completes `phase` after it starts
    pub fn new(signals: SignalSender<S>, phase: Duration) -> Self {
        Self { signals, phase }
    }

    fn complete_after(&self, listener: ListenerToken) {
        let signals = self.signals.clone();
        let phase = self.phase;
        tokio::spawn(async move {
            tokio::time::sleep(phase).await;
            // a closed channel means the show is already gone
            let _ = signals.send(ShowSignal::TransitionFinished(listener));
        });
    }
}

impl<S: Send + 'static> TransitionHooks<S> for TimedTransitions<S> {
    fn begin_hide(&mut self, _slide: &S, listener: ListenerToken) {
        self.complete_after(listener);
    }

    fn begin_show(&mut self, _slide: &S, listener: ListenerToken) {
        self.complete_after(listener);
    }
}

/// Runs a show on the current task until it is stopped
pub struct ShowDriver<T: SlideTree + 'static> {
    show: Slideshow<T>,
    signals: SignalReceiver<T::Slide>,
    queued: VecDeque<ShowSignal<T::Slide>>,
    stop_on_end: bool,
}

impl<T: SlideTree + 'static> ShowDriver<T> {
    pub fn new(show: Slideshow<T>, signals: SignalReceiver<T::Slide>) -> Self {
        Self {
            show,
            signals,
            queued: VecDeque::new(),
            stop_on_end: false,
        }
    }

    /// Stop once the show has ended and the final transition committed
    pub fn stop_on_end(mut self, stop: bool) -> Self {
        self.stop_on_end = stop;
        self
    }

    pub fn show(&self) -> &Slideshow<T> {
        &self.show
    }

    /// Start the show and process signals until it stops
    ///
    /// Returns the stopped show so its tree can still be inspected or
    /// cleaned up.
    pub async fn run(mut self, initial: Option<T::Slide>) -> Result<Slideshow<T>, ShowError> {
        self.show.start(initial)?;

        while let Some(signal) = self.signals.recv().await {
            if self.handle(signal).is_break() {
                break;
            }
        }

        self.show.stop();
        Ok(self.show)
    }

    fn handle(&mut self, signal: ShowSignal<T::Slide>) -> ControlFlow<()> {
        if signal.is_navigation() && self.show.is_transitioning() {
            tracing::debug!(?signal, "transition in flight, request queued");
            self.queued.push_back(signal);
            return ControlFlow::Continue(());
        }

        let result = match signal {
            ShowSignal::Next => self.show.advance_forward().map(Some),
            ShowSignal::Previous => self.show.advance_backward().map(Some),
            ShowSignal::Seek(target) => self.show.seek(target).map(Some),
            ShowSignal::TimerFired(ticket) => self.show.timer_fired(ticket),
            ShowSignal::TransitionFinished(listener) => {
                if self.show.transition_finished(listener).is_some() {
                    return self.after_commit();
                }
                Ok(None)
            }
            ShowSignal::Stop => return ControlFlow::Break(()),
        };

        match result {
            Ok(Some(NavigationOutcome::Ended)) if self.stop_on_end => ControlFlow::Break(()),
            Ok(_) => ControlFlow::Continue(()),
            Err(err) => {
                tracing::warn!(error = %err, "navigation request failed");
                ControlFlow::Continue(())
            }
        }
    }

    fn after_commit(&mut self) -> ControlFlow<()> {
        if self.stop_on_end && self.show.has_ended() {
            return ControlFlow::Break(());
        }
        while !self.show.is_transitioning() {
            let Some(signal) = self.queued.pop_front() else {
                break;
            };
            if self.handle(signal).is_break() {
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}
