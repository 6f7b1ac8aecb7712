//! Fixed-priority preemptive scheduler for Tasks and ISRs sharing one CPU.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use p3s_common::enums::TaskState;
use p3s_common::error::{AssertionError, ConfigError, P3sError};

use crate::task::{Isr, Task};
use crate::Cycle;

/// One CPU core: an ISR queue and a Task queue, both ordered by priority
/// descending (ties broken by insertion order), plus switch-delay
/// bookkeeping shared across both phases of a tick.
pub struct CpuModel {
    name: String,
    #[allow(dead_code)]
    clock_mhz: u32,
    task_switch_delay: Cycle,
    cycle: Cell<Cycle>,
    tasks: RefCell<Vec<Rc<Task>>>,
    isrs: RefCell<Vec<Rc<Isr>>>,
    current_task: Cell<Option<usize>>,
    rest_task_cycle: Cell<Cycle>,
    current_isr: Cell<Option<usize>>,
    rest_isr_cycle: Cell<Cycle>,
}

impl std::fmt::Debug for CpuModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuModel")
            .field("name", &self.name)
            .field("cycle", &self.cycle.get())
            .finish()
    }
}

impl CpuModel {
    pub fn new(name: impl Into<String>, clock_mhz: u32, task_switch_delay: Cycle) -> Rc<Self> {
        Rc::new(CpuModel {
            name: name.into(),
            clock_mhz,
            task_switch_delay,
            cycle: Cell::new(0),
            tasks: RefCell::new(Vec::new()),
            isrs: RefCell::new(Vec::new()),
            current_task: Cell::new(None),
            rest_task_cycle: Cell::new(0),
            current_isr: Cell::new(None),
            rest_isr_cycle: Cell::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle.get()
    }

    /// Insert in descending-priority order; ties are appended after any
    /// existing tasks of equal priority.
    pub fn add_task(self: &Rc<Self>, task: Rc<Task>) {
        task.attach_cpu(self);
        let mut tasks = self.tasks.borrow_mut();
        let pos = tasks.iter().position(|t| task.priority() > t.priority());
        match pos {
            Some(idx) => tasks.insert(idx, task),
            None => tasks.push(task),
        }
    }

    pub fn add_isr(self: &Rc<Self>, isr: Rc<Isr>) {
        isr.task().attach_cpu(self);
        let mut isrs = self.isrs.borrow_mut();
        let pos = isrs
            .iter()
            .position(|i| isr.task().priority() > i.task().priority());
        match pos {
            Some(idx) => isrs.insert(idx, isr),
            None => isrs.push(isr),
        }
    }

    /// Checked once at `Simulator::simulate()` entry: every Task and ISR
    /// attached to this CPU must have an initial location.
    pub(crate) fn validate_initial_locations(&self) -> Result<(), P3sError> {
        for task in self.tasks.borrow().iter() {
            if !task.has_initial_location() {
                return Err(ConfigError::NoInitialLocation {
                    process: task.name().to_string(),
                }
                .into());
            }
        }
        for isr in self.isrs.borrow().iter() {
            if !isr.has_initial_location() {
                return Err(ConfigError::NoInitialLocation {
                    process: isr.task().name().to_string(),
                }
                .into());
            }
        }
        Ok(())
    }

    pub(crate) fn add_rest_task_cycle(&self, delay: Cycle) {
        self.rest_task_cycle.set(self.rest_task_cycle.get() + delay);
    }

    pub(crate) fn clear_current_task(&self) {
        self.current_task.set(None);
    }

    /// Run one quantum `q`. Returns `true` iff a Task finished during this
    /// tick (the scheduler does not look inside ISRs for "finished": they
    /// are never terminal, see [`Isr::rearm`]).
    pub fn run(&self, q: Cycle) -> Result<bool, P3sError> {
        match self.run_isr_phase(q)? {
            PhaseOutcome::TickConsumed => Ok(false),
            PhaseOutcome::Remaining(budget_used) => self.run_task_phase(q, budget_used),
        }
    }

    fn run_isr_phase(&self, q: Cycle) -> Result<PhaseOutcome, P3sError> {
        let mut used = 0;

        if self.rest_isr_cycle.get() > 0 && self.current_isr.get().is_none() {
            let rest = self.rest_isr_cycle.get();
            if q < rest {
                self.cycle.set(self.cycle.get() + q);
                self.rest_isr_cycle.set(rest - q);
                return Ok(PhaseOutcome::TickConsumed);
            }
            self.rest_isr_cycle.set(0);
            used += rest;
        }

        let budget = q - used;
        if budget <= 0 {
            return Ok(PhaseOutcome::Remaining(used));
        }

        let now = self.cycle.get() + used;
        let Some(idx) = self.select_isr(now) else {
            return Ok(PhaseOutcome::Remaining(used));
        };

        if self.current_isr.get() != Some(idx) {
            self.preempt_for_isr();
            if let Some(prev) = self.current_isr.get() {
                let isrs = self.isrs.borrow();
                if isrs[prev].task().state() == TaskState::Running {
                    isrs[prev].task().set_state(TaskState::Ready);
                }
            }
            self.isrs.borrow()[idx].task().set_state(TaskState::Running);
            self.current_isr.set(Some(idx));
        }

        let isrs = self.isrs.borrow();
        let isr = &isrs[idx];
        let leftover = isr.restart(now, budget)?;
        used += budget - leftover;

        if isr.task().finished() {
            isr.rearm();
            self.current_isr.set(None);
        }
        drop(isrs);

        Ok(PhaseOutcome::Remaining(used))
    }

    /// Highest-priority ISR eligible to run this phase, scanning in priority
    /// order: already RUNNING (keep going), preempted and READY to resume,
    /// or WAITING with its interrupt condition newly armed. Because the scan
    /// is priority-ordered and returns the first match, a higher-priority
    /// ISR arming while a lower-priority one is mid-handler is picked here
    /// instead of the lower one, which is how preemption between ISRs
    /// happens -- the caller demotes whichever was RUNNING to READY once the
    /// selected index differs from `current_isr`.
    fn select_isr(&self, now: Cycle) -> Option<usize> {
        self.isrs.borrow().iter().position(|isr| match isr.task().state() {
            TaskState::Running | TaskState::Ready => true,
            TaskState::Waiting => isr.interrupt(now),
            TaskState::Inactive => false,
        })
    }

    /// Demote whatever is currently running (ISR preempting a Task) to
    /// READY and clear `current_task`, without charging a switch delay: the
    /// original implementation does not credit the interrupted task for the
    /// ISR's switch-in cost (left as an explicit open question upstream).
    fn preempt_for_isr(&self) {
        if let Some(idx) = self.current_task.get() {
            let tasks = self.tasks.borrow();
            if tasks[idx].state() == TaskState::Running {
                tasks[idx].set_state(TaskState::Ready);
            }
            drop(tasks);
            self.current_task.set(None);
        }
    }

    fn run_task_phase(&self, q: Cycle, used_by_isr: Cycle) -> Result<bool, P3sError> {
        let mut used = used_by_isr;

        loop {
            if used >= q {
                self.cycle.set(self.cycle.get() + q);
                return Ok(false);
            }

            if self.current_task.get().is_none() && self.rest_task_cycle.get() > 0 {
                let rest = self.rest_task_cycle.get();
                let remaining_budget = q - used;
                if remaining_budget < rest {
                    self.cycle.set(self.cycle.get() + q);
                    self.rest_task_cycle.set(rest - remaining_budget);
                    return Ok(false);
                }
                used += rest;
                self.rest_task_cycle.set(0);
                continue;
            }

            if self.current_task.get().is_none() {
                let idx = self.pick_highest_ready();
                let Some(idx) = idx else {
                    self.cycle.set(self.cycle.get() + q);
                    return Ok(false);
                };
                self.assert_no_double_running()?;
                self.tasks.borrow()[idx].set_state(TaskState::Running);
                self.current_task.set(Some(idx));
            }

            let idx = self.current_task.get().expect("set above");
            let now = self.cycle.get() + used;
            let budget = q - used;
            let leftover = {
                let tasks = self.tasks.borrow();
                tasks[idx].restart(now, budget)?
            };
            let consumed = budget - leftover;
            used += consumed;

            let finished = self.tasks.borrow()[idx].finished();
            if finished {
                self.cycle.set(self.cycle.get() + used);
                return Ok(true);
            }

            self.sweep_priority_after_restart();

            if consumed == 0 && self.current_task.get() == Some(idx) {
                // Nothing was consumed and the same task is still the one
                // to run. That alone isn't stuck: a zero-delay transition
                // that commits and yields (event=true) with no scheduler-
                // visible side effect also reports consumed=0 and leaves
                // current_task unchanged, yet the task's location really
                // did advance and may have a next transition ready to go.
                // Check the current location itself: only end the tick here
                // if nothing is selectable there, which is the one case
                // that would otherwise call restart with identical
                // arguments forever.
                let stuck = {
                    let tasks = self.tasks.borrow();
                    let task = &tasks[idx];
                    match task.core_current_loc_index() {
                        Some(loc_idx) => !task.core_location_armed(loc_idx, now),
                        None => true,
                    }
                };
                if stuck {
                    self.cycle.set(self.cycle.get() + q);
                    return Ok(false);
                }
            }
        }
    }

    /// Post-restart priority sweep (spec 4.5 step 4): find the first task
    /// in priority order that is RUNNING or READY. If READY comes first, a
    /// switch is due -- demote the current task and clear it so the next
    /// loop iteration burns the switch delay before picking a successor.
    fn sweep_priority_after_restart(&self) {
        let switch_due = {
            let tasks = self.tasks.borrow();
            let mut due = false;
            for task in tasks.iter() {
                match task.state() {
                    TaskState::Running => break,
                    TaskState::Ready => {
                        due = true;
                        break;
                    }
                    _ => continue,
                }
            }
            due
        };
        if !switch_due {
            return;
        }
        if let Some(idx) = self.current_task.get() {
            let tasks = self.tasks.borrow();
            if tasks[idx].state() == TaskState::Running {
                tasks[idx].set_state(TaskState::Ready);
            }
        }
        self.current_task.set(None);
    }

    fn pick_highest_ready(&self) -> Option<usize> {
        self.tasks
            .borrow()
            .iter()
            .position(|t| t.state() == TaskState::Ready)
    }

    fn assert_no_double_running(&self) -> Result<(), P3sError> {
        let running = self
            .tasks
            .borrow()
            .iter()
            .filter(|t| t.state() == TaskState::Running)
            .count();
        if running > 1 {
            return Err(AssertionError::DoubleRunning {
                cpu: self.name.clone(),
            }
            .into());
        }
        Ok(())
    }
}

enum PhaseOutcome {
    /// The whole tick was consumed burning a pending switch delay; the Task
    /// phase does not run this tick.
    TickConsumed,
    /// ISR phase used `used` cycles of the quantum; the remainder is
    /// available to the Task phase.
    Remaining(Cycle),
}
