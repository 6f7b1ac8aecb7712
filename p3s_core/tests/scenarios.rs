//! Integration tests for the engine's core scenarios: channel latency,
//! priority preemption via signals, and ISR arming off a channel send.

use std::cell::Cell;
use std::rc::Rc;

use p3s_core::prelude::*;

#[derive(Debug)]
struct SendSeven;
impl TransitionLogic for SendSeven {
    fn update(&self, ctx: &HookCtx) -> UpdateOutcome {
        ctx.channel.unwrap().send(7, ctx.now, 3);
        UpdateOutcome::default()
    }
}

#[test]
fn channel_latency_gates_recv_until_arrival() {
    p3s_core::init_tracing();

    let channel = Rc::new(Channel::new("C"));

    // Producer: sends 7 at cycle 5 with delay 3 -> visible at cycle 8.
    let mut producer = Process::new("producer");
    let p1 = Location::new("P1", true);
    let p1_idx = producer.add_location(p1, false);
    let mut p0 = Location::new("P0", false);
    p0.add_trans(
        Transition::new(p1_idx, Box::new(SendSeven))
            .with_channel(channel.clone(), Polarity::Send),
    );
    producer.add_location(p0, true);

    // Burn 5 cycles before the send fires by chaining a fixed zero-delay
    // self loop is unnecessary: drive `now` directly instead.
    let leftover = producer.restart(5, 1).unwrap();
    assert_eq!(leftover, 0);
    assert!(producer.finished());
    assert!(channel.pending());
    assert!(!channel.is_ready(7));
    assert!(channel.is_ready(8));

    // Consumer's receive transition's guard fails until cycle 8.
    let received = Rc::new(Cell::new(0i64));
    #[derive(Debug)]
    struct StoreRecv(Rc<Cell<i64>>);
    impl TransitionLogic for StoreRecv {
        fn update(&self, ctx: &HookCtx) -> UpdateOutcome {
            self.0.set(ctx.recv_value.unwrap());
            UpdateOutcome::default()
        }
    }

    let mut consumer = Process::new("consumer");
    let c1 = Location::new("C1", true);
    let c1_idx = consumer.add_location(c1, false);
    let mut c0 = Location::new("C0", false);
    c0.add_trans(
        Transition::new(c1_idx, Box::new(StoreRecv(received.clone())))
            .with_channel(channel.clone(), Polarity::Recv),
    );
    consumer.add_location(c0, true);

    let leftover = consumer.restart(7, 1).unwrap();
    assert_eq!(leftover, 1, "guard must still fail at cycle 7");
    assert!(!consumer.finished());

    let leftover = consumer.restart(8, 1).unwrap();
    assert_eq!(leftover, 0);
    assert!(consumer.finished());
    assert_eq!(received.get(), 7);
    assert!(!channel.pending());
}

const WAIT_DELAY: Cycle = 3;
const SET_DELAY: Cycle = 3;
const SIG_READY: i64 = 1;

#[derive(Debug)]
struct WaitOnReady;
impl TransitionLogic for WaitOnReady {
    fn update(&self, ctx: &HookCtx) -> UpdateOutcome {
        let scheduler = ctx.scheduler.expect("task-owned transition");
        scheduler.wait_signal(SIG_READY, WAIT_DELAY);
        UpdateOutcome { event: true }
    }
}

#[derive(Debug)]
struct SetReadyOn(Rc<Task>);
impl TransitionLogic for SetReadyOn {
    fn update(&self, ctx: &HookCtx) -> UpdateOutcome {
        let scheduler = ctx.scheduler.expect("task-owned transition");
        let changed = scheduler.set_signal(&self.0, SIG_READY, SET_DELAY, WAIT_DELAY);
        UpdateOutcome { event: changed }
    }
}

/// A task with one transition from L0 to a non-terminal, dead-end L1: the
/// transition's `update()` side effect (a wait_signal/set_signal call) is
/// what this test cares about, not the task finishing.
fn two_location_task(name: &str, priority: TaskPriority, logic: Box<dyn TransitionLogic>) -> Rc<Task> {
    let mut task = Task::new(name, priority);
    let l1 = Location::new("L1", false);
    let l1_idx = task.add_location(l1, false);
    let mut l0 = Location::new("L0", false);
    l0.add_trans(Transition::new(l1_idx, logic));
    task.add_location(l0, true);
    Rc::new(task)
}

#[test]
fn priority_preemption_via_signal() {
    // TaskH waits on SIG_READY; TaskL sets it. TaskH must run first (higher
    // priority, both READY), wait, yield to TaskL, then resume once TaskL
    // delivers the signal. Neither task ever reaches a terminal location
    // (the wait/set transitions land on a dead-end L1), so this scenario is
    // checked through scheduling state rather than `finished()`.
    let cpu = CpuModel::new("cpu0", 100, 2);

    let high = two_location_task("high", TaskPriority::HIGH, Box::new(WaitOnReady));
    cpu.add_task(high.clone());

    let low = two_location_task("low", TaskPriority::LOW, Box::new(SetReadyOn(high.clone())));
    cpu.add_task(low.clone());

    // Tick 1: TaskH picked (higher priority), waits -> WAITING, event=true.
    let finished = cpu.run(1).unwrap();
    assert!(!finished);
    assert_eq!(high.state(), TaskState::Waiting);

    // Burn the wait-signal switch delay (WAIT_DELAY=3 cycles); TaskL gets
    // picked once it elapses and delivers the signal within that same
    // window, promoting TaskH back to READY.
    for _ in 0..WAIT_DELAY {
        let finished = cpu.run(1).unwrap();
        assert!(!finished);
    }
    assert_eq!(high.state(), TaskState::Ready);
    assert_eq!(low.state(), TaskState::Ready);

    // Burn the combined set+wait switch delay TaskL's signal charged, then
    // TaskH is picked again and resumes running.
    let mut resumed = false;
    for _ in 0..(SET_DELAY + WAIT_DELAY + 1) {
        cpu.run(1).unwrap();
        if high.state() == TaskState::Running {
            resumed = true;
            break;
        }
    }
    assert!(resumed, "TaskH must be rescheduled once the switch delay elapses");
}

#[derive(Debug)]
struct IsrFinish;
impl TransitionLogic for IsrFinish {}

#[test]
fn isr_arms_off_a_channel_send() {
    let channel = Rc::new(Channel::new("C"));
    let cpu = CpuModel::new("cpu0", 100, 2);

    // ISR: init location INIT has one outgoing transition gated on the
    // channel's recv readiness; firing it "finishes" (rearms) the ISR.
    let mut isr_task = Task::new("isr", TaskPriority::REALTIME);
    let done_idx = {
        let done = Location::new("DONE", true);
        isr_task.add_location(done, false)
    };
    let mut init = Location::new("INIT", false);
    init.add_trans(
        Transition::new(done_idx, Box::new(IsrFinish)).with_channel(channel.clone(), Polarity::Recv),
    );
    let init_idx = isr_task.add_location(init, true);
    let isr = Rc::new(Isr::new(isr_task, init_idx));
    cpu.add_isr(isr.clone());

    assert_eq!(isr.task().state(), TaskState::Waiting);
    assert!(!isr.interrupt(0));

    channel.send(1, 0, 2);
    assert!(!isr.interrupt(1));
    assert!(isr.interrupt(2));

    // Two quiet ticks while the channel is not yet visible (cycles 0, 1).
    assert!(!cpu.run(1).unwrap());
    assert!(!cpu.run(1).unwrap());
    assert_eq!(cpu.cycle(), 2);

    // Third tick starts at cycle 2: the ISR is armed, promoted, runs to its
    // rearm. Completion is a rearm, not a Task-finish, so the tick itself
    // reports unfinished.
    let finished = cpu.run(1).unwrap();
    assert!(!finished, "ISR completion is a rearm, never a Task-finish");
    assert_eq!(isr.task().state(), TaskState::Waiting);
    assert!(!channel.pending());
}
