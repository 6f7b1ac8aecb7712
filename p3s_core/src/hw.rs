//! A hardware accelerator core: wraps a Process as a parallel timeline.

use std::cell::Cell;

use p3s_common::error::{ConfigError, P3sError};

use crate::process::Process;
use crate::Cycle;

/// Parallel hardware core consuming one quantum per tick. Unlike a CPU,
/// hardware time always flows: the model's own cycle counter advances by
/// the full quantum regardless of whether the wrapped process made
/// progress.
#[derive(Debug)]
pub struct HwModel {
    name: String,
    #[allow(dead_code)]
    clock_mhz: u32,
    cycle: Cell<Cycle>,
    core: Process,
}

impl HwModel {
    pub fn new(name: impl Into<String>, clock_mhz: u32, core: Process) -> Self {
        HwModel {
            name: name.into(),
            clock_mhz,
            cycle: Cell::new(0),
            core,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cycle(&self) -> Cycle {
        self.cycle.get()
    }

    pub fn core(&self) -> &Process {
        &self.core
    }

    /// Checked once at `Simulator::simulate()` entry.
    pub(crate) fn validate_initial_location(&self) -> Result<(), P3sError> {
        if self.core.has_initial_location() {
            Ok(())
        } else {
            Err(ConfigError::NoInitialLocation {
                process: self.core.name().to_string(),
            }
            .into())
        }
    }

    /// Run one quantum; returns whether the wrapped core finished.
    pub fn run(&self, q: Cycle) -> Result<bool, P3sError> {
        let result = self.core.restart(self.cycle.get(), q);
        self.cycle.set(self.cycle.get() + q);
        result?;
        Ok(self.core.finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{Location, NoopLogic, Transition};

    #[test]
    fn cycle_advances_by_full_quantum_even_when_blocked() {
        let mut process = Process::new("core");
        let l0 = Location::new("L0", false);
        process.add_location(l0, true);
        let hw = HwModel::new("hw0", 50, process);
        let finished = hw.run(4).unwrap();
        assert!(!finished);
        assert_eq!(hw.cycle(), 4);
    }

    #[test]
    fn terminal_location_marks_finished() {
        let mut process = Process::new("core");
        let l1 = Location::new("L1", true);
        let l1_idx = process.add_location(l1, false);
        let mut l0 = Location::new("L0", false);
        l0.add_trans(Transition::new(l1_idx, Box::new(NoopLogic)));
        process.add_location(l0, true);
        let hw = HwModel::new("hw0", 50, process);
        let finished = hw.run(1).unwrap();
        assert!(finished);
        assert_eq!(hw.cycle(), 1);
    }
}
