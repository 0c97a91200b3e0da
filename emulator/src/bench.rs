//! Simulated board hardware.
//!
//! Sensor readings come straight from the [`Scenario`]. The ASIC produces
//! results at a fixed real-time rate once a job has been submitted.

use std::thread;
use std::time::{Duration, Instant};

use selftest_core::benchmark::{AsicResult, SyntheticJob};
use selftest_core::hw::{AsicInterface, Clock, FanSetup, HardwareProbes, JobId, JobSlots};
use selftest_core::thresholds::{PowerSource, RegulatorFamily};

use crate::scenario::Scenario;

const SIMULATED_BAUD: u32 = 1_000_000;

/// Wall clock measured from emulator start.
#[derive(Copy, Clone, Debug)]
pub struct HostClock {
    origin: Instant,
}

impl HostClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for HostClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for HostClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn delay(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Nonce stream started by [`AsicInterface::submit_job`].
#[derive(Clone, Debug)]
struct NonceStream {
    job_id: JobId,
    version: u32,
    version_mask: u32,
    started: Instant,
    issued: u64,
    seed: u32,
}

impl NonceStream {
    /// Whole results owed since the job was submitted.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn due(&self, rate: f64) -> u64 {
        (self.started.elapsed().as_secs_f64() * rate) as u64
    }

    fn next(&mut self) -> AsicResult {
        self.issued += 1;
        // Numerical Recipes LCG.
        self.seed = self.seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let rolled_bits = (self.seed >> 13) & self.version_mask;
        AsicResult {
            nonce: self.seed,
            rolled_version: self.version | rolled_bits,
        }
    }
}

/// [`HardwareProbes`] backed by a [`Scenario`].
#[derive(Clone, Debug)]
pub struct SimulatedBench {
    scenario: Scenario,
    stream: Option<NonceStream>,
}

impl SimulatedBench {
    pub fn new(scenario: &Scenario) -> Self {
        Self {
            scenario: scenario.clone(),
            stream: None,
        }
    }
}

impl AsicInterface for SimulatedBench {
    fn set_difficulty_mask(&mut self, _: u8) {}

    fn submit_job(&mut self, job: &SyntheticJob, slots: &mut JobSlots) -> JobId {
        let job_id = slots.claim();
        self.stream = Some(NonceStream {
            job_id,
            version: job.version,
            version_mask: job.version_mask,
            started: Instant::now(),
            issued: 0,
            seed: job.ntime ^ job.target,
        });
        job_id
    }

    fn poll_result(&mut self, slots: &JobSlots) -> Option<AsicResult> {
        let rate = self.scenario.nonce_rate;
        let stream = self.stream.as_mut()?;
        if !slots.is_valid(stream.job_id) || stream.issued >= stream.due(rate) {
            return None;
        }
        Some(stream.next())
    }
}

impl HardwareProbes for SimulatedBench {
    fn enable_asic_power(&mut self) {}

    fn init_fan_controller(&mut self, _: FanSetup) {}

    fn init_core_regulator(&mut self, _: RegulatorFamily) -> bool {
        true
    }

    fn set_core_voltage_mv(&mut self, _: u16) {}

    fn dac_self_test(&mut self) -> bool {
        true
    }

    fn init_power_monitor(&mut self) {}

    fn detect_asic_chip_count(&mut self, _: u16, _: u8) -> u8 {
        self.scenario.chips
    }

    fn negotiate_max_baud(&mut self) -> u32 {
        SIMULATED_BAUD
    }

    fn read_fan_rpm(&mut self) -> u16 {
        self.scenario.fan_rpm
    }

    fn read_core_voltage_mv(&mut self) -> u16 {
        self.scenario.core_voltage_mv
    }

    fn read_power_draw_watts(&mut self, _: PowerSource) -> f32 {
        self.scenario.power_watts
    }
}
