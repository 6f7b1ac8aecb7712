//! OS-style one-shot per-task signal mailbox.

use std::cell::Cell;

use p3s_common::consts::{INIT_PRI, NO_WAIT};

/// Per-task mailbox implementing WAIT/SET semantics.
///
/// `wait_id = NO_WAIT` iff the owning task is not currently waiting on this
/// mailbox -- this is the invariant the data model calls out explicitly.
#[derive(Debug)]
pub struct Signal {
    wait_id: Cell<i64>,
    wait_priority: Cell<i32>,
}

impl Default for Signal {
    fn default() -> Self {
        Signal {
            wait_id: Cell::new(NO_WAIT),
            wait_priority: Cell::new(INIT_PRI),
        }
    }
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that the owning task is now waiting on `sig_id` at `priority`.
    pub fn record_wait(&self, sig_id: i64, priority: i32) {
        self.wait_id.set(sig_id);
        self.wait_priority.set(priority);
    }

    /// Whether the owning task is currently waiting on `sig_id`.
    pub fn is_waiting_on(&self, sig_id: i64) -> bool {
        self.wait_id.get() == sig_id
    }

    /// Whether the owning task is waiting on anything at all.
    pub fn is_waiting(&self) -> bool {
        self.wait_id.get() != NO_WAIT
    }

    /// Clear the mailbox back to its not-waiting state.
    pub fn clear(&self) {
        self.wait_id.set(NO_WAIT);
        self.wait_priority.set(INIT_PRI);
    }
}
