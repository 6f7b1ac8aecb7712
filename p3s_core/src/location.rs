//! Automaton structure: Locations own ordered Transitions.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use crate::channel::Channel;
use crate::task::{SchedulerCtx, Task};
use crate::Cycle;

/// Send/recv polarity of a Transition's channel binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Send,
    Recv,
}

/// A Transition's optional binding to a shared Channel.
#[derive(Debug, Clone)]
pub struct ChannelBinding {
    pub channel: Rc<Channel>,
    pub polarity: Polarity,
}

/// Context handed to a Transition's hooks at each phase of its lifecycle.
/// Holds only what the phase needs; fields the phase cannot use are absent.
pub struct HookCtx<'a> {
    pub now: Cycle,
    pub channel: Option<&'a Channel>,
    /// Value taken from the bound channel during `sync()`, available to
    /// `update()` for recv-polarity transitions.
    pub recv_value: Option<i64>,
    /// The transition's signal-destination task, if one was configured.
    pub sig_dst: Option<&'a Rc<Task>>,
    /// Scheduler handle, present only for transitions owned by a Task/ISR,
    /// letting `update()` poke `rest_task_cycle`/`current_task` and call
    /// `wait_signal`/`set_signal` the way the original global-state example
    /// code did, but through an explicit context instead of module globals.
    pub scheduler: Option<&'a SchedulerCtx<'a>>,
}

/// Outcome of a Transition's `update()` hook.
///
/// `event = true` means a scheduler-visible event occurred (wait_signal,
/// set_signal to a higher-priority task, voluntary yield); only meaningful
/// for Task/ISR-owned transitions, where it is the sole in-code preemption
/// point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub event: bool,
}

/// The four overridable hooks of a Transition.
///
/// Defaults implement "no-op, non-blocking, zero-delay" behavior; a
/// receive-polarity transition's channel readiness check is applied by the
/// engine itself before `guard()` is consulted, so a user override only
/// adds *extra* admission conditions.
pub trait TransitionLogic: fmt::Debug {
    fn guard(&self, _ctx: &HookCtx) -> bool {
        true
    }

    fn sync(&self, _ctx: &HookCtx) {}

    fn get_delay(&self, _ctx: &HookCtx) -> Cycle {
        0
    }

    fn update(&self, _ctx: &HookCtx) -> UpdateOutcome {
        UpdateOutcome::default()
    }
}

/// The default transition: unconditional guard, no-op sync/update, zero
/// delay. Useful for plain automaton steps with no user behavior attached.
#[derive(Debug, Default)]
pub struct NoopLogic;

impl TransitionLogic for NoopLogic {}

/// One edge of an automaton: guard -> sync -> get_delay -> update, with an
/// optional Channel binding and an optional signal-destination Task.
pub struct Transition {
    /// Index of the destination Location within the owning Process.
    pub target: usize,
    pub channel: Option<ChannelBinding>,
    pub sig_dst: Option<Rc<Task>>,
    pub logic: Box<dyn TransitionLogic>,
    rest_cycle: Cell<i64>,
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transition")
            .field("target", &self.target)
            .field("channel", &self.channel.is_some())
            .field("logic", &self.logic)
            .finish()
    }
}

impl Transition {
    pub fn new(target: usize, logic: Box<dyn TransitionLogic>) -> Self {
        Transition {
            target,
            channel: None,
            sig_dst: None,
            logic,
            rest_cycle: Cell::new(-1),
        }
    }

    pub fn with_channel(mut self, channel: Rc<Channel>, polarity: Polarity) -> Self {
        self.channel = Some(ChannelBinding { channel, polarity });
        self
    }

    pub fn with_signal_dst(mut self, dst: Rc<Task>) -> Self {
        self.sig_dst = Some(dst);
        self
    }

    /// Full guard evaluation: the channel-receive readiness rule, ANDed
    /// with the user-supplied `logic.guard()`. Send-polarity bindings never
    /// block on guard.
    pub(crate) fn evaluate_guard(&self, now: Cycle) -> bool {
        if let Some(binding) = &self.channel {
            if binding.polarity == Polarity::Recv && !binding.channel.is_ready(now) {
                return false;
            }
        }
        let ctx = HookCtx {
            now,
            channel: self.channel.as_ref().map(|b| b.channel.as_ref()),
            recv_value: None,
            sig_dst: self.sig_dst.as_ref(),
            scheduler: None,
        };
        self.logic.guard(&ctx)
    }

    /// Atomic take-on-select: consumes the bound channel for recv-polarity
    /// transitions, then runs the user's `sync()`.
    pub(crate) fn perform_sync(&self, now: Cycle) -> Option<i64> {
        let recv_value = match &self.channel {
            Some(binding) if binding.polarity == Polarity::Recv => Some(binding.channel.recv()),
            _ => None,
        };
        let ctx = HookCtx {
            now,
            channel: self.channel.as_ref().map(|b| b.channel.as_ref()),
            recv_value,
            sig_dst: self.sig_dst.as_ref(),
            scheduler: None,
        };
        self.logic.sync(&ctx);
        recv_value
    }

    pub(crate) fn compute_delay(&self, now: Cycle) -> Cycle {
        let ctx = HookCtx {
            now,
            channel: self.channel.as_ref().map(|b| b.channel.as_ref()),
            recv_value: None,
            sig_dst: self.sig_dst.as_ref(),
            scheduler: None,
        };
        self.logic.get_delay(&ctx)
    }

    /// Run `update()`, optionally exposing a scheduler handle so a Task/ISR
    /// transition can poke `rest_task_cycle`/`current_task` or call
    /// `wait_signal`/`set_signal`. Plain Process/HW transitions pass `None`.
    pub(crate) fn perform_update(
        &self,
        now: Cycle,
        recv_value: Option<i64>,
        scheduler: Option<&SchedulerCtx<'_>>,
    ) -> UpdateOutcome {
        let ctx = HookCtx {
            now,
            channel: self.channel.as_ref().map(|b| b.channel.as_ref()),
            recv_value,
            sig_dst: self.sig_dst.as_ref(),
            scheduler,
        };
        self.logic.update(&ctx)
    }

    pub(crate) fn rest_cycle(&self) -> i64 {
        self.rest_cycle.get()
    }

    pub(crate) fn set_rest_cycle(&self, value: i64) {
        self.rest_cycle.set(value);
    }
}

/// A node of an automaton: an ordered sequence of outgoing Transitions, and
/// whether reaching it ends the owning Process.
#[derive(Debug)]
pub struct Location {
    pub name: String,
    pub terminal: bool,
    transitions: Vec<Transition>,
}

impl Location {
    pub fn new(name: impl Into<String>, terminal: bool) -> Self {
        Location {
            name: name.into(),
            terminal,
            transitions: Vec::new(),
        }
    }

    /// Append a new outgoing Transition. Order is significant: it is the
    /// fixed evaluation order used during selection.
    pub fn add_trans(&mut self, trans: Transition) {
        self.transitions.push(trans);
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }
}
