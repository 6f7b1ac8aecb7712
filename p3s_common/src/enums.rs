//! Shared enumerations for the P3S simulation engine.

use static_assertions::const_assert_eq;

/// Scheduling state of a Task or ISR on its owning CPU.
///
/// Initial state for a plain `Task` is `Ready`; for an `ISR` it is `Waiting`
/// (an ISR only becomes runnable once its interrupt condition is armed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Inactive,
    Waiting,
    Ready,
    Running,
}

/// Fixed scheduling priority, signed so IDLE can sit below the zero point
/// and REALTIME (reserved for ISRs) above every ordinary task.
///
/// Ordering: `Idle < Low < Normal < High < Realtime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskPriority(pub i32);

impl TaskPriority {
    pub const IDLE: TaskPriority = TaskPriority(-3);
    pub const LOW: TaskPriority = TaskPriority(-2);
    pub const NORMAL: TaskPriority = TaskPriority(0);
    pub const HIGH: TaskPriority = TaskPriority(2);
    pub const REALTIME: TaskPriority = TaskPriority(3);

    pub const fn new(value: i32) -> Self {
        TaskPriority(value)
    }

    pub const fn value(self) -> i32 {
        self.0
    }
}

// `Task::priority()` is copied by value on every comparison in the CPU's
// priority sweep; a niche or padding byte here would silently change that
// cost.
const_assert_eq!(core::mem::size_of::<TaskPriority>(), core::mem::size_of::<i32>());

/// Where an in-flight Transition sits in its guard -> sync -> delay -> update
/// lifecycle. `None` (absence of this type, i.e. `Option<TransSubstate>`) means
/// there is no in-flight transition at all -- see the Process invariant
/// `(current_trans = None) <=> (substate = None)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransSubstate {
    BeforeGetDelay,
    BeforeUpdate,
    AfterUpdate,
}

/// Sentinel recorded in a Signal mailbox when the owning task is not waiting
/// on any signal id.
pub const SIGNAL_ID_NO_WAIT: i64 = -1;

/// Sentinel priority recorded in a Signal mailbox before any wait has
/// occurred.
pub const SIGNAL_INIT_PRI: i32 = -1;
