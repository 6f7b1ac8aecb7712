//! Top-level driver: ticks every HW model then the CPU, in declared order,
//! until any model reports completion.

use std::rc::Rc;

use p3s_common::error::{ConfigError, P3sError};

use crate::cpu::CpuModel;
use crate::hw::HwModel;
use crate::Cycle;

/// Owns the HW models and (optionally) a CPU model and drives them in
/// lock-step quanta of `quantum` cycles.
pub struct Simulator {
    cpu: Option<Rc<CpuModel>>,
    hw: Vec<HwModel>,
    quantum: Cycle,
}

impl Simulator {
    pub fn new(quantum: Cycle) -> Self {
        Simulator {
            cpu: None,
            hw: Vec::new(),
            quantum,
        }
    }

    pub fn add_cpu(&mut self, cpu: Rc<CpuModel>) {
        self.cpu = Some(cpu);
    }

    pub fn add_hw(&mut self, hw: HwModel) {
        self.hw.push(hw);
    }

    /// Run until any HW model or the CPU reports a finished core/task.
    /// Returns the terminating cycle on success.
    pub fn simulate(&self) -> Result<Cycle, P3sError> {
        if self.hw.is_empty() && self.cpu.is_none() {
            return Err(ConfigError::NoRunnableModel.into());
        }

        for hw in &self.hw {
            hw.validate_initial_location()?;
        }
        if let Some(cpu) = &self.cpu {
            cpu.validate_initial_locations()?;
        }

        loop {
            for hw in &self.hw {
                if hw.run(self.quantum)? {
                    let cycle = hw.cycle();
                    tracing::info!(cycle, "Finished cycle: {}", cycle);
                    println!("Finished cycle: {}", cycle);
                    return Ok(cycle);
                }
            }
            if let Some(cpu) = &self.cpu {
                if cpu.run(self.quantum)? {
                    let cycle = cpu.cycle();
                    tracing::info!(cycle, "Finished cycle: {}", cycle);
                    println!("Finished cycle: {}", cycle);
                    return Ok(cycle);
                }
            }
        }
    }
}
