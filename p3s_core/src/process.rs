//! Automaton executor: drives a current location, an optional in-flight
//! transition, and the transition substate machine.

use std::cell::Cell;

use p3s_common::enums::TransSubstate;
use p3s_common::error::{ModelError, P3sError};

use crate::location::{Location, Transition};
use crate::Cycle;

/// Shared state and restart algorithm used by both a plain [`Process`] and
/// a [`crate::task::Task`] (composition instead of inheritance: a Task owns
/// a `ProcessCore` rather than subclassing a Process).
pub(crate) struct ProcessCore {
    name: String,
    locations: Vec<Location>,
    current_loc: Cell<Option<usize>>,
    current_trans: Cell<Option<usize>>,
    substate: Cell<Option<TransSubstate>>,
    /// Value taken from a bound channel at `sync()` time, held until the
    /// matching `update()` fires -- part of the transition's continuation,
    /// since `sync` and `update` can be ticks apart.
    pending_recv: Cell<Option<i64>>,
    finished: Cell<bool>,
}

impl ProcessCore {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        ProcessCore {
            name: name.into(),
            locations: Vec::new(),
            current_loc: Cell::new(None),
            current_trans: Cell::new(None),
            substate: Cell::new(None),
            pending_recv: Cell::new(None),
            finished: Cell::new(false),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn add_location(&mut self, loc: Location, is_initial: bool) -> usize {
        let idx = self.locations.len();
        self.locations.push(loc);
        if is_initial {
            self.current_loc.set(Some(idx));
        }
        idx
    }

    pub(crate) fn finished(&self) -> bool {
        self.finished.get()
    }

    pub(crate) fn current_location_name(&self) -> Option<&str> {
        self.current_loc
            .get()
            .map(|idx| self.locations[idx].name.as_str())
    }

    pub(crate) fn current_loc_index(&self) -> Option<usize> {
        self.current_loc.get()
    }

    /// Whether an initial location was ever set -- checked once at
    /// `Simulator::simulate()` entry so a misconfigured process is rejected
    /// up front instead of surfacing lazily as `ModelError::NoCurrentLocation`
    /// the first time it happens to be restarted.
    pub(crate) fn has_initial_location(&self) -> bool {
        self.current_loc.get().is_some()
    }

    /// Force `current_loc` to `idx`, used by [`crate::task::Isr::rearm`].
    /// Only valid to call when no transition is in-flight.
    pub(crate) fn set_current_loc(&self, idx: usize) {
        self.current_loc.set(Some(idx));
    }

    pub(crate) fn clear_finished(&self) {
        self.finished.set(false);
    }

    /// Whether some outgoing transition of location `idx` currently has a
    /// satisfied guard -- used by [`crate::task::Isr::interrupt`].
    pub(crate) fn location_armed(&self, idx: usize, now: Cycle) -> bool {
        self.locations[idx]
            .transitions()
            .iter()
            .any(|t| t.evaluate_guard(now))
    }

    /// Advance for at most `budget` cycles beginning at `now`; return the
    /// unused cycle count, or a fatal error.
    ///
    /// `on_commit` runs exactly once per committed transition, after
    /// `current_loc` has already advanced to the target and the location
    /// change has been logged; it receives the transition and the engine's
    /// own event verdict (always `false` here) and returns the final event
    /// verdict used to decide whether to keep looping. Plain Processes pass
    /// a closure that always returns `false`; [`crate::task::Task`] uses it
    /// to fold in task-state bookkeeping and the event flag from
    /// `update()`.
    pub(crate) fn restart(
        &self,
        now: Cycle,
        budget: Cycle,
        scheduler: Option<&crate::task::SchedulerCtx<'_>>,
        mut on_commit: impl FnMut(&Transition, Cycle, bool) -> bool,
    ) -> Result<Cycle, P3sError> {
        let mut runnable = budget;
        loop {
            let loc_idx = self.current_loc.get().ok_or_else(|| {
                P3sError::from(ModelError::NoCurrentLocation {
                    process: self.name.clone(),
                })
            })?;
            let location = &self.locations[loc_idx];
            let elapsed_now = now + (budget - runnable);

            if self.current_trans.get().is_none() {
                let selected = location
                    .transitions()
                    .iter()
                    .position(|t| t.evaluate_guard(elapsed_now));
                let trans_idx = match selected {
                    Some(idx) => idx,
                    None => return Ok(runnable),
                };
                let selected_trans = &location.transitions()[trans_idx];
                let recv_value = selected_trans.perform_sync(elapsed_now);
                self.pending_recv.set(recv_value);
                selected_trans.set_rest_cycle(-1);
                self.current_trans.set(Some(trans_idx));
                self.substate.set(Some(TransSubstate::BeforeGetDelay));
            }

            let trans_idx = self.current_trans.get().expect("just selected above");
            let trans = &location.transitions()[trans_idx];

            if self.substate.get() == Some(TransSubstate::BeforeGetDelay) {
                let delay = trans.compute_delay(elapsed_now);
                if delay < 0 {
                    return Err(ModelError::NegativeDelay {
                        process: self.name.clone(),
                        delay,
                    }
                    .into());
                }
                trans.set_rest_cycle(delay);
                self.substate.set(Some(TransSubstate::BeforeUpdate));
            }

            let rest = trans.rest_cycle();
            if runnable >= 0 {
                if rest > runnable {
                    trans.set_rest_cycle(rest - runnable);
                    return Ok(0);
                }
                runnable -= rest;
                trans.set_rest_cycle(0);
            }

            let commit_now = now + (budget - runnable);
            let recv_value = self.pending_recv.take();
            let outcome = trans.perform_update(commit_now, recv_value, scheduler);
            self.current_loc.set(Some(trans.target));
            self.current_trans.set(None);
            self.substate.set(None);

            let target_name = &self.locations[trans.target].name;
            tracing::info!(
                process = %self.name,
                cycle = commit_now,
                location = %target_name,
                "@{} C:{} : change location to {}",
                self.name,
                commit_now,
                target_name
            );

            let is_event = on_commit(trans, commit_now, outcome.event);

            if self.locations[trans.target].terminal {
                self.finished.set(true);
                return Ok(runnable);
            }
            if is_event {
                return Ok(runnable);
            }
        }
    }
}

/// A plain automaton executor with no scheduling concerns: a [`Process`]
/// just runs its timed automaton to completion or to the edge of its
/// budget.
#[derive(Debug)]
pub struct Process {
    core: ProcessCore,
}

impl std::fmt::Debug for ProcessCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessCore")
            .field("name", &self.name)
            .field("current_loc", &self.current_location_name())
            .field("finished", &self.finished.get())
            .finish()
    }
}

impl Process {
    pub fn new(name: impl Into<String>) -> Self {
        Process {
            core: ProcessCore::new(name),
        }
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    /// Add a new Location; the first one added with `is_initial = true`
    /// becomes `current_loc`. Returns the index used to reference this
    /// location as a Transition target.
    pub fn add_location(&mut self, loc: Location, is_initial: bool) -> usize {
        self.core.add_location(loc, is_initial)
    }

    pub fn finished(&self) -> bool {
        self.core.finished()
    }

    pub fn current_location_name(&self) -> Option<&str> {
        self.core.current_location_name()
    }

    pub(crate) fn has_initial_location(&self) -> bool {
        self.core.has_initial_location()
    }

    /// Advance this process for at most `budget` cycles beginning at `now`;
    /// return the unused cycle count.
    pub fn restart(&self, now: Cycle, budget: Cycle) -> Result<Cycle, P3sError> {
        self.core
            .restart(now, budget, None, |_trans, _now, _event| false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{NoopLogic, Transition};

    #[test]
    fn two_location_process_finishes_after_delay() {
        #[derive(Debug)]
        struct FixedDelay(i64);
        impl crate::location::TransitionLogic for FixedDelay {
            fn get_delay(&self, _ctx: &crate::location::HookCtx) -> Cycle {
                self.0
            }
        }

        let mut process = Process::new("P");
        let l0 = Location::new("L0", false);
        let l1 = Location::new("L1", true);
        let l1_idx = process.add_location(l1, false);
        let mut l0 = l0;
        l0.add_trans(Transition::new(l1_idx, Box::new(FixedDelay(10))));
        // l0 must be added last as initial, since l1 was already appended.
        let l0_idx = process.add_location(l0, true);
        assert_eq!(l0_idx, 1);

        for cycle in 0..9 {
            let leftover = process.restart(cycle, 1).unwrap();
            assert_eq!(leftover, 0);
            assert!(!process.finished());
        }
        let leftover = process.restart(9, 1).unwrap();
        assert_eq!(leftover, 0);
        assert!(process.finished());
    }

    #[test]
    fn restart_with_no_current_location_is_an_error() {
        let process = Process::new("P");
        let err = process.restart(0, 1).unwrap_err();
        assert!(matches!(err, P3sError::Model(_)));
    }

    #[test]
    fn negative_delay_is_a_model_error() {
        #[derive(Debug)]
        struct NegativeDelay;
        impl crate::location::TransitionLogic for NegativeDelay {
            fn get_delay(&self, _ctx: &crate::location::HookCtx) -> Cycle {
                -1
            }
        }

        let mut process = Process::new("P");
        let l1 = Location::new("L1", true);
        let l1_idx = process.add_location(l1, false);
        let mut l0 = Location::new("L0", false);
        l0.add_trans(Transition::new(l1_idx, Box::new(NegativeDelay)));
        process.add_location(l0, true);

        let err = process.restart(0, 1).unwrap_err();
        assert!(matches!(err, P3sError::Model(_)));
    }

    #[test]
    fn no_selectable_transition_returns_full_budget() {
        let mut process = Process::new("P");
        let l0 = Location::new("L0", false);
        process.add_location(l0, true);
        let leftover = process.restart(0, 5).unwrap();
        assert_eq!(leftover, 5);
        assert!(!process.finished());
        let _ = NoopLogic; // silence unused-import warning if NoopLogic unused elsewhere
    }
}
