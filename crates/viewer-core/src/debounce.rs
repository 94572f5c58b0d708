//! Trailing-edge debouncing driven by the caller's clock.
//!
//! The debouncer owns only the pending value and its deadline. The caller
//! decides what "now" is and when to [`Debouncer::poll`], which keeps the
//! type usable from a synchronous event loop, an async runtime, or a test
//! that steps time by hand.

use std::time::{Duration, Instant};

#[derive(Debug)]
struct Pending<T> {
    deadline: Instant,
    value: T,
}

#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<Pending<T>>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self { delay, pending: None }
    }

    /// Replaces any pending value and pushes the deadline to `now + delay`.
    ///
    /// Returns the new deadline.
    pub fn schedule(&mut self, value: T, now: Instant) -> Instant {
        let deadline = now + self.delay;
        self.pending = Some(Pending { deadline, value });
        deadline
    }

    /// Drops the pending value, if any, without firing it.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|pending| pending.value)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }

    /// Fires the pending value once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some(pending) if now >= pending.deadline => {}
            _ => return None,
        }

        self.pending.take().map(|pending| pending.value)
    }
}
