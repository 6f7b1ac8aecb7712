//! System-wide sentinels and default values shared by engine and model code.

use crate::enums::{SIGNAL_ID_NO_WAIT, SIGNAL_INIT_PRI};

/// Default `get_delay()` for a transition that does not override it.
pub const DEFAULT_DELAY: i64 = 0;

/// Re-exported here so callers can reach every sentinel through `consts`
/// without also importing `enums`.
pub const NO_WAIT: i64 = SIGNAL_ID_NO_WAIT;
pub const INIT_PRI: i32 = SIGNAL_INIT_PRI;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_negative() {
        assert!(NO_WAIT < 0);
        assert!(INIT_PRI < 0);
    }
}
