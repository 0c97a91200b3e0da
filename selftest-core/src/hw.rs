//! Collaborator contracts consumed by the self-test.
//!
//! Drivers for the fan controller, regulators, power monitor, display and
//! ASIC live outside this crate. Firmware and the host emulator provide
//! concrete types that satisfy these traits.

use core::time::Duration;

use crate::benchmark::{AsicResult, SyntheticJob};
use crate::thresholds::{PowerSource, RegulatorFamily};

/// Maximum number of jobs the ASIC can have in flight.
pub const MAX_ACTIVE_JOBS: usize = 128;

/// Character display, present only on some variants.
pub trait DisplaySink {
    /// Returns `true` once the display has been initialized and is usable.
    fn is_present(&self) -> bool;

    /// Brings the display up. Returns `false` when the panel does not respond.
    fn initialize(&mut self) -> bool;

    fn write_line(&mut self, row: u8, text: &str);

    fn clear(&mut self, row: u8);
}

/// Display sink for boards without a panel.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoDisplay;

impl NoDisplay {
    pub const fn new() -> Self {
        Self
    }
}

impl DisplaySink for NoDisplay {
    fn is_present(&self) -> bool {
        false
    }

    fn initialize(&mut self) -> bool {
        false
    }

    fn write_line(&mut self, _: u8, _: &str) {}

    fn clear(&mut self, _: u8) {}
}

/// Fan controller configuration applied during power-up.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct FanSetup {
    pub invert_polarity: bool,
    /// Apply the Gamma temperature-diode ideality and beta compensation.
    pub thermal_tuning: bool,
}

/// Interface to the hashing ASIC used by the benchmark.
pub trait AsicInterface {
    /// Programs the ASIC-side result filter.
    fn set_difficulty_mask(&mut self, mask: u8);

    /// Sends a job, records it in the in-flight slots and returns its slot id.
    fn submit_job(&mut self, job: &SyntheticJob, slots: &mut JobSlots) -> JobId;

    /// Returns the next result if one is waiting. Never blocks.
    fn poll_result(&mut self, slots: &JobSlots) -> Option<AsicResult>;
}

/// Measurements and bring-up operations on the board under test.
pub trait HardwareProbes: AsicInterface {
    /// Drives the ASIC enable line.
    fn enable_asic_power(&mut self);

    fn init_fan_controller(&mut self, setup: FanSetup);

    /// Initializes the core regulator. Returns `false` when the part reports a fault.
    fn init_core_regulator(&mut self, family: RegulatorFamily) -> bool;

    fn set_core_voltage_mv(&mut self, millivolts: u16);

    /// Runs the DAC's own register self-test.
    fn dac_self_test(&mut self) -> bool;

    fn init_power_monitor(&mut self);

    /// Enumerates the ASIC chain and returns how many chips answered.
    fn detect_asic_chip_count(&mut self, frequency_mhz: u16, expected: u8) -> u8;

    /// Switches the ASIC link to its fastest baud rate and returns it.
    fn negotiate_max_baud(&mut self) -> u32;

    fn read_fan_rpm(&mut self) -> u16;

    fn read_core_voltage_mv(&mut self) -> u16;

    fn read_power_draw_watts(&mut self, source: PowerSource) -> f32;
}

/// Monotonic time source with sub-second resolution.
pub trait Clock {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Blocks for at least `duration`.
    fn delay(&self, duration: Duration) {
        let start = self.now();
        while self.now().saturating_sub(start) < duration {}
    }
}

/// Process restart primitive.
pub trait Restart {
    fn restart(&mut self) -> !;
}

/// Identifier of a job slot.
pub type JobId = u8;

/// Fixed-capacity tracking of in-flight ASIC jobs, indexed by job id.
///
/// Owned by a single pipeline run and dropped before the terminal phase.
#[derive(Clone, Debug)]
pub struct JobSlots<const CAPACITY: usize = MAX_ACTIVE_JOBS> {
    active: [Option<JobId>; CAPACITY],
    next: usize,
}

impl<const CAPACITY: usize> JobSlots<CAPACITY> {
    /// Creates an empty tracker.
    pub const fn new() -> Self {
        Self {
            active: [None; CAPACITY],
            next: 0,
        }
    }

    /// Claims the next slot, wrapping around and evicting the oldest job.
    pub fn claim(&mut self) -> JobId {
        let slot = self.next % CAPACITY;
        self.next = (slot + 1) % CAPACITY;
        let id = JobId::try_from(slot).unwrap_or(JobId::MAX);
        self.active[slot] = Some(id);
        id
    }

    /// Returns `true` when `id` refers to a job still in flight.
    pub fn is_valid(&self, id: JobId) -> bool {
        self.active
            .get(usize::from(id))
            .is_some_and(Option::is_some)
    }

    /// Marks `id` as no longer in flight.
    pub fn release(&mut self, id: JobId) {
        if let Some(slot) = self.active.get_mut(usize::from(id)) {
            *slot = None;
        }
    }

    pub fn in_flight(&self) -> usize {
        self.active.iter().filter(|slot| slot.is_some()).count()
    }

    pub const fn capacity(&self) -> usize {
        CAPACITY
    }
}

impl<const CAPACITY: usize> Default for JobSlots<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
