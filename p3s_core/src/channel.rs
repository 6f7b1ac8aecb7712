//! Unidirectional value carrier with arrival-delayed visibility.
//!
//! A Channel models interconnect latency: a value sent at cycle `now` with
//! delay `d` only becomes visible to a receiver once simulator time reaches
//! `now + d`. It is single-slot -- a second send before a recv overwrites
//! the pending value, which is allowed by design (see error-handling policy
//! in the crate root).

use std::cell::Cell;

use crate::Cycle;

/// A single-slot, delay-visible value carrier shared by a producer and a
/// consumer transition.
#[derive(Debug)]
pub struct Channel {
    name: String,
    pending: Cell<bool>,
    sent_at_cycle: Cell<Cycle>,
    data: Cell<i64>,
}

impl Channel {
    /// Construct a new, initially empty channel.
    pub fn new(name: impl Into<String>) -> Self {
        Channel {
            name: name.into(),
            pending: Cell::new(false),
            sent_at_cycle: Cell::new(0),
            data: Cell::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set data, mark pending, and record the cycle at which it becomes
    /// visible (`now + delay`). Overwrites any unreceived pending value.
    pub fn send(&self, data: i64, now: Cycle, delay: Cycle) {
        self.data.set(data);
        self.pending.set(true);
        self.sent_at_cycle.set(now + delay);
    }

    /// Clear pending and return the carried value.
    ///
    /// Callers are expected to have checked [`Channel::is_ready`] first;
    /// calling `recv` on an empty channel simply returns the last value and
    /// leaves the channel empty, matching the original implementation's
    /// unconditional `recv`.
    pub fn recv(&self) -> i64 {
        self.pending.set(false);
        self.data.get()
    }

    /// Whether a value is waiting to be received (regardless of visibility).
    pub fn pending(&self) -> bool {
        self.pending.get()
    }

    /// The cycle at which the pending value becomes visible to a receiver.
    pub fn sent_at_cycle(&self) -> Cycle {
        self.sent_at_cycle.get()
    }

    /// Whether a receive-polarity transition's default guard should succeed
    /// at `now`: pending and arrived.
    pub fn is_ready(&self, now: Cycle) -> bool {
        self.pending.get() && self.sent_at_cycle.get() <= now
    }
}
