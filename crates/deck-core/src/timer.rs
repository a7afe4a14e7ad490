//! Auto-advance timer
//!
//! The show never sleeps itself. It asks a [`Scheduler`] to deliver a
//! [`TimerTicket`] after a delay and hands the ticket back to
//! [`Slideshow::timer_fired`](crate::Slideshow::timer_fired) when it
//! expires. Only the most recently issued ticket is honoured.

use std::sync::Arc;
use std::time::Duration;
use parking_lot::Mutex;

/// Identifies one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerTicket(u64);

impl TimerTicket {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// Host-side timer facility
pub trait Scheduler {
    /// Deliver `ticket` back to the show after `delay`
    fn schedule(&self, delay: Duration, ticket: TimerTicket);

    /// Drop `ticket` if it has not fired yet
    fn cancel(&self, ticket: TimerTicket);
}

#[derive(Debug, Clone)]
struct PendingTimer<S> {
    ticket: TimerTicket,
    slide: S,
    delay: Duration,
}

/// Owner of the show's single outstanding auto-advance timer
pub struct AutoAdvanceTimer<S> {
    scheduler: Box<dyn Scheduler>,
    next_ticket: u64,
    pending: Option<PendingTimer<S>>,
}

impl<S: Clone + PartialEq> AutoAdvanceTimer<S> {
    pub fn new(scheduler: Box<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            next_ticket: 0,
            pending: None,
        }
    }

    /// Start a timer for `slide`, replacing any outstanding one
    pub fn schedule_for(&mut self, slide: S, delay: Duration) -> TimerTicket {
        self.cancel();

        self.next_ticket += 1;
        let ticket = TimerTicket(self.next_ticket);
        self.scheduler.schedule(delay, ticket);
        self.pending = Some(PendingTimer { ticket, slide, delay });
        ticket
    }

    /// Invalidate the outstanding timer; idempotent
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            tracing::debug!(ticket = pending.ticket.0, "auto-advance timer cancelled");
            self.scheduler.cancel(pending.ticket);
        }
    }

    /// Accept an expired ticket
    ///
    /// Returns the slide the timer was scheduled for when `ticket` is the
    /// outstanding one; anything else is stale and yields `None`.
    pub fn claim(&mut self, ticket: TimerTicket) -> Option<S> {
        if self.pending.as_ref().is_some_and(|pending| pending.ticket == ticket) {
            self.pending.take().map(|pending| pending.slide)
        } else {
            None
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Outstanding ticket with its slide and delay
    pub fn pending(&self) -> Option<(TimerTicket, &S, Duration)> {
        self.pending
            .as_ref()
            .map(|pending| (pending.ticket, &pending.slide, pending.delay))
    }
}

#[derive(Debug, Default)]
struct ManualClock {
    now: Duration,
    timers: Vec<(Duration, TimerTicket)>,
}

/// Scheduler driven by an explicit virtual clock
///
/// Useful for headless hosts and tests. Clones share the same clock.
#[derive(Debug, Clone, Default)]
pub struct ManualScheduler {
    clock: Arc<Mutex<ManualClock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Move the clock forward, returning expired tickets in deadline order
    pub fn advance(&self, by: Duration) -> Vec<TimerTicket> {
        let mut clock = self.clock.lock();
        clock.now += by;
        let now = clock.now;

        let mut due: Vec<(Duration, TimerTicket)> = Vec::new();
        clock.timers.retain(|entry| {
            if entry.0 <= now {
                due.push(*entry);
                false
            } else {
                true
            }
        });
        due.sort();
        due.into_iter().map(|(_, ticket)| ticket).collect()
    }

    /// Timers that have not yet expired or been cancelled
    pub fn pending(&self) -> usize {
        self.clock.lock().timers.len()
    }

    /// Deadline of `ticket`, if it is still scheduled
    pub fn deadline(&self, ticket: TimerTicket) -> Option<Duration> {
        self.clock
            .lock()
            .timers
            .iter()
            .find(|(_, t)| *t == ticket)
            .map(|(deadline, _)| *deadline)
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, ticket: TimerTicket) {
        let mut clock = self.clock.lock();
        let deadline = clock.now + delay;
        clock.timers.push((deadline, ticket));
    }

    fn cancel(&self, ticket: TimerTicket) {
        self.clock.lock().timers.retain(|(_, t)| *t != ticket);
    }
}
