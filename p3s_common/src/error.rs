//! Error taxonomy for the P3S simulation engine.

use static_assertions::assert_impl_all;
use thiserror::Error;

/// Errors surfaced while assembling a model, before `simulate()` ever
/// advances a cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A Process was asked to restart but never had an initial location set.
    #[error("process '{process}' has no initial location")]
    NoInitialLocation {
        /// Name of the offending process.
        process: String,
    },

    /// The simulator was started with neither a CPU nor any HW model.
    #[error("simulator has no CPU and no HW model configured")]
    NoRunnableModel,
}

/// Errors surfaced mid-simulation from a model's own cycle arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// `get_delay()` returned a negative cycle count.
    #[error("transition on process '{process}' returned a negative delay ({delay})")]
    NegativeDelay {
        /// Name of the owning process.
        process: String,
        /// The offending (negative) delay value.
        delay: i64,
    },

    /// `restart()` was invoked while `current_loc` was unset.
    #[error("process '{process}' has no current location at restart")]
    NoCurrentLocation {
        /// Name of the offending process.
        process: String,
    },
}

/// Invariant violations: bugs in the engine itself rather than in user
/// automata, surfaced rather than silently tolerated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssertionError {
    /// Two Tasks (or two ISRs) were simultaneously `Running` on one CPU.
    #[error("two entities simultaneously RUNNING on CPU '{cpu}'")]
    DoubleRunning {
        /// Name of the offending CPU model.
        cpu: String,
    },

    /// An in-flight transition was found with no recorded substate.
    #[error("process '{process}' has an in-flight transition with no substate")]
    MissingSubstate {
        /// Name of the offending process.
        process: String,
    },
}

/// Unified error type returned by fallible engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum P3sError {
    /// A construction-time configuration problem.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A mid-simulation cycle-arithmetic problem.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// An internal invariant was violated.
    #[error("assertion failure: {0}")]
    Assertion(#[from] AssertionError),
}

/// Result type for fallible engine operations.
pub type P3sResult<T> = Result<T, P3sError>;

assert_impl_all!(P3sError: std::error::Error, Send, Sync);
