//! Convenience re-exports for crates consuming `p3s_common`.

pub use crate::consts::*;
pub use crate::enums::{TaskPriority, TaskState, TransSubstate};
pub use crate::error::{AssertionError, ConfigError, ModelError, P3sError, P3sResult};
