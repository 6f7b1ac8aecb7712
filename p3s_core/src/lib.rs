//! Cycle-accurate discrete-event simulation engine for embedded multi-task
//! systems running atop a preemptive priority-based RTOS.
//!
//! The engine proper: Process/Transition execution, the CPU's fixed-priority
//! scheduler for Tasks and ISRs, HW cores running in parallel, and the
//! delayed Channel / OS-style Signal primitives automata use to synchronize.
//! Concrete user automata (what a checksum task or a DMA core actually
//! does) are external collaborators built on top of [`location::TransitionLogic`];
//! this crate does not define domain behavior.

pub mod channel;
pub mod cpu;
pub mod hw;
pub mod location;
pub mod process;
pub mod signal;
pub mod simulator;
pub mod task;

/// Integer cycle count used throughout the engine -- model clocks, delays,
/// and quanta are all expressed in this unit.
pub type Cycle = i64;

/// Install a global `tracing` subscriber reading `RUST_LOG` (or the crate's
/// default filter if unset). Safe to call more than once: later calls are
/// no-ops once a subscriber is already installed, which is what lets every
/// integration test call this at its own entry without coordinating.
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

pub mod prelude {
    //! Convenience re-exports for crates building automata on top of this
    //! engine.
    pub use crate::channel::Channel;
    pub use crate::cpu::CpuModel;
    pub use crate::hw::HwModel;
    pub use crate::location::{
        ChannelBinding, HookCtx, Location, NoopLogic, Polarity, Transition, TransitionLogic,
        UpdateOutcome,
    };
    pub use crate::process::Process;
    pub use crate::signal::Signal;
    pub use crate::simulator::Simulator;
    pub use crate::task::{Isr, SchedulerCtx, Task};
    pub use crate::Cycle;
    pub use p3s_common::prelude::*;
}
