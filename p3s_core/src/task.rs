//! Task/ISR: specializations of a Process that add scheduling state.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use p3s_common::enums::{TaskPriority, TaskState};
use p3s_common::error::P3sError;

use crate::cpu::CpuModel;
use crate::location::Location;
use crate::process::ProcessCore;
use crate::signal::Signal;
use crate::Cycle;

/// Handle an `update()` hook uses to reach CPU scheduler state and other
/// tasks' signal mailboxes, replacing the module-level globals the example
/// code historically relied on (see design notes on context-passing).
pub struct SchedulerCtx<'a> {
    cpu: &'a CpuModel,
    self_task: &'a Task,
}

impl<'a> SchedulerCtx<'a> {
    /// Put the executing task itself into WAITING on `sig_id`, and charge
    /// the CPU the configured wait-signal switch cost.
    pub fn wait_signal(&self, sig_id: i64, switch_delay: Cycle) {
        self.self_task.enter_wait(sig_id);
        self.cpu.add_rest_task_cycle(switch_delay);
        self.cpu.clear_current_task();
    }

    /// Deliver `sig_id` to `dst`; returns whether it actually changed `dst`
    /// from WAITING to READY. If it did and `dst` outranks the executing
    /// task, charges the combined set+wait switch cost; otherwise only the
    /// set cost, per the convention documented in the CPU scheduler.
    pub fn set_signal(&self, dst: &Task, sig_id: i64, set_delay: Cycle, wait_delay: Cycle) -> bool {
        let changed = dst.deliver_signal(sig_id);
        if changed && dst.priority() > self.self_task.priority() {
            self.cpu.add_rest_task_cycle(set_delay + wait_delay);
        } else {
            self.cpu.add_rest_task_cycle(set_delay);
        }
        changed
    }

    pub fn self_task(&self) -> &Task {
        self.self_task
    }
}

/// A Process extended with priority, a scheduling state, a signal mailbox
/// and a weak back-reference to its owning CPU.
#[derive(Debug)]
pub struct Task {
    core: ProcessCore,
    priority: TaskPriority,
    task_state: Cell<TaskState>,
    signal: Signal,
    last_wait_sig: Cell<i64>,
    cpu: RefCell<Option<Weak<CpuModel>>>,
}

impl Task {
    pub fn new(name: impl Into<String>, priority: TaskPriority) -> Self {
        Task {
            core: ProcessCore::new(name),
            priority,
            task_state: Cell::new(TaskState::Ready),
            signal: Signal::new(),
            last_wait_sig: Cell::new(p3s_common::consts::NO_WAIT),
            cpu: RefCell::new(None),
        }
    }

    pub fn name(&self) -> &str {
        self.core.name()
    }

    pub fn add_location(&mut self, loc: Location, is_initial: bool) -> usize {
        self.core.add_location(loc, is_initial)
    }

    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    pub fn state(&self) -> TaskState {
        self.task_state.get()
    }

    pub fn set_state(&self, state: TaskState) {
        self.task_state.set(state);
    }

    pub fn finished(&self) -> bool {
        self.core.finished()
    }

    pub fn current_location_name(&self) -> Option<&str> {
        self.core.current_location_name()
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    pub fn last_wait_signal(&self) -> i64 {
        self.last_wait_sig.get()
    }

    /// Record a wait on `sig_id` and move to WAITING. Does not itself touch
    /// CPU bookkeeping; callers driving this from an `update()` hook should
    /// go through [`SchedulerCtx::wait_signal`] so the switch-delay is
    /// charged consistently.
    pub fn enter_wait(&self, sig_id: i64) {
        self.signal.record_wait(sig_id, self.priority.value());
        self.last_wait_sig.set(sig_id);
        self.task_state.set(TaskState::Waiting);
    }

    /// Deliver `sig_id`: if currently WAITING on it, move to READY and
    /// clear the mailbox. Returns whether state changed.
    pub fn deliver_signal(&self, sig_id: i64) -> bool {
        if self.task_state.get() == TaskState::Waiting && self.signal.is_waiting_on(sig_id) {
            self.signal.clear();
            self.task_state.set(TaskState::Ready);
            true
        } else {
            false
        }
    }

    pub(crate) fn attach_cpu(&self, cpu: &Rc<CpuModel>) {
        *self.cpu.borrow_mut() = Some(Rc::downgrade(cpu));
    }

    fn cpu(&self) -> Option<Rc<CpuModel>> {
        self.cpu.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// Advance this task for at most `budget` cycles beginning at `now`.
    /// Returns early (with positive leftover) as soon as `update()` reports
    /// a scheduler-visible event, handing control back to the CPU.
    pub fn restart(&self, now: Cycle, budget: Cycle) -> Result<Cycle, P3sError> {
        let cpu = self.cpu();
        let scheduler = cpu.as_deref().map(|cpu| SchedulerCtx {
            cpu,
            self_task: self,
        });
        self.core
            .restart(now, budget, scheduler.as_ref(), |_trans, _now, event| event)
    }

    pub(crate) fn core_current_loc_index(&self) -> Option<usize> {
        self.core.current_loc_index()
    }

    pub(crate) fn has_initial_location(&self) -> bool {
        self.core.has_initial_location()
    }

    pub(crate) fn core_set_current_loc(&self, idx: usize) {
        self.core.set_current_loc(idx);
    }

    pub(crate) fn core_clear_finished(&self) {
        self.core.clear_finished();
    }

    pub(crate) fn core_location_armed(&self, idx: usize, now: Cycle) -> bool {
        self.core.location_armed(idx, now)
    }
}

/// An interrupt service routine: a Task that is armed only while sitting at
/// its init location with some outgoing guard satisfied, and which never
/// truly terminates -- reaching its "terminal" location is a rearm, not a
/// finish (see the explicit open-question resolution in the design notes).
#[derive(Debug)]
pub struct Isr {
    task: Task,
    init_loc: usize,
}

impl Isr {
    /// Wrap a fully-built Task (its locations already added via
    /// [`Task::add_location`]) as an ISR armed at `init_loc`, which must be
    /// the index that call returned for the ISR's init/wait location.
    pub fn new(task: Task, init_loc: usize) -> Self {
        task.set_state(TaskState::Waiting);
        Isr { task, init_loc }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    /// Armed iff sitting at `init_loc` and some outgoing transition's guard
    /// currently holds.
    pub fn interrupt(&self, now: Cycle) -> bool {
        self.task.core_current_loc_index() == Some(self.init_loc)
            && self.task.core_location_armed(self.init_loc, now)
    }

    /// Reset to the init location and WAITING, clearing any finished flag
    /// raised by reaching it. Called by the CPU scheduler once the ISR's
    /// handler transition has committed.
    pub fn rearm(&self) {
        self.task.core_set_current_loc(self.init_loc);
        self.task.core_clear_finished();
        self.task.set_state(TaskState::Waiting);
    }

    pub fn restart(&self, now: Cycle, budget: Cycle) -> Result<Cycle, P3sError> {
        self.task.restart(now, budget)
    }

    pub(crate) fn has_initial_location(&self) -> bool {
        self.task.has_initial_location()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_task_is_ready() {
        let task = Task::new("t", TaskPriority::LOW);
        assert_eq!(task.state(), TaskState::Ready);
    }

    #[test]
    fn fresh_isr_is_waiting() {
        let mut task = Task::new("isr", TaskPriority::REALTIME);
        let l0 = crate::location::Location::new("L0", false);
        let idx = task.add_location(l0, true);
        let isr = Isr::new(task, idx);
        assert_eq!(isr.task().state(), TaskState::Waiting);
    }

    #[test]
    fn deliver_signal_only_changes_state_when_waiting_on_it() {
        let task = Task::new("t", TaskPriority::NORMAL);
        assert!(!task.deliver_signal(6));
        task.enter_wait(6);
        assert!(task.deliver_signal(6));
        assert_eq!(task.state(), TaskState::Ready);
    }

    #[test]
    fn deliver_signal_ignores_mismatched_id() {
        let task = Task::new("t", TaskPriority::NORMAL);
        task.enter_wait(6);
        assert!(!task.deliver_signal(7));
        assert_eq!(task.state(), TaskState::Waiting);
    }
}
