#![allow(dead_code)]

use core::cell::Cell;
use core::time::Duration;

use heapless::{String, Vec};
use portable_atomic::{AtomicBool, AtomicU8, Ordering};
use selftest_core::benchmark::{AsicResult, SyntheticJob};
use selftest_core::hw::{
    AsicInterface, Clock, DisplaySink, FanSetup, HardwareProbes, JobId, JobSlots, Restart,
};
use selftest_core::profile::{DeviceProfile, DeviceVariant};
use selftest_core::thresholds::{PowerSource, RegulatorFamily};
use selftest_core::watchdog::OneShotTimer;

/// Clock that advances by a fixed step every time it is read.
pub struct StepClock {
    now: Cell<Duration>,
    step: Duration,
}

impl StepClock {
    pub fn new(step: Duration) -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            step,
        }
    }

    pub fn millis() -> Self {
        Self::new(Duration::from_millis(1))
    }

    pub fn peek(&self) -> Duration {
        self.now.get()
    }
}

impl Clock for StepClock {
    fn now(&self) -> Duration {
        let next = self.now.get() + self.step;
        self.now.set(next);
        next
    }
}

/// Number of times each probe entry point was called.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProbeCalls {
    pub asic_power: u32,
    pub fan_setup: Option<FanSetup>,
    pub regulator_init: Option<RegulatorFamily>,
    pub voltage_set: Option<u16>,
    pub dac_self_test: u32,
    pub power_monitor_init: u32,
    pub chip_detect: u32,
    pub baud: u32,
    pub difficulty_mask: Option<u8>,
    pub jobs_submitted: u32,
    pub polls: u32,
    pub core_voltage_reads: u32,
    pub power_reads: u32,
    pub power_source: Option<PowerSource>,
    pub fan_reads: u32,
}

impl ProbeCalls {
    /// Count of measurement and bring-up calls made after chip detection.
    pub fn after_chip_detection(&self) -> u32 {
        self.dac_self_test
            + self.power_monitor_init
            + self.baud
            + self.jobs_submitted
            + self.polls
            + self.core_voltage_reads
            + self.power_reads
            + self.fan_reads
    }
}

/// Simulated board whose readings are fixed per test.
#[derive(Clone, Debug)]
pub struct MockBench {
    pub chips: u8,
    pub regulator_ok: bool,
    pub dac_ok: bool,
    pub core_voltage_mv: u16,
    pub power_watts: f32,
    pub fan_rpm: u16,
    pub baud: u32,
    /// Results handed out by `poll_result`, one per call until exhausted.
    pub results: u32,
    pub calls: ProbeCalls,
}

impl MockBench {
    /// Readings that pass every check on a Gamma board.
    pub fn healthy() -> Self {
        Self {
            chips: 1,
            regulator_ok: true,
            dac_ok: true,
            core_voltage_mv: 1_150,
            power_watts: 11.0,
            fan_rpm: 4_200,
            baud: 1_000_000,
            results: 200,
            calls: ProbeCalls::default(),
        }
    }

    pub fn with_results(mut self, results: u32) -> Self {
        self.results = results;
        self
    }
}

impl AsicInterface for MockBench {
    fn set_difficulty_mask(&mut self, mask: u8) {
        self.calls.difficulty_mask = Some(mask);
    }

    fn submit_job(&mut self, _job: &SyntheticJob, slots: &mut JobSlots) -> JobId {
        self.calls.jobs_submitted += 1;
        slots.claim()
    }

    fn poll_result(&mut self, _slots: &JobSlots) -> Option<AsicResult> {
        self.calls.polls += 1;
        if self.results == 0 {
            return None;
        }
        self.results -= 1;
        Some(AsicResult {
            nonce: 0x1234_0000 + self.calls.polls,
            rolled_version: 0x2000_0004,
        })
    }
}

impl HardwareProbes for MockBench {
    fn enable_asic_power(&mut self) {
        self.calls.asic_power += 1;
    }

    fn init_fan_controller(&mut self, setup: FanSetup) {
        self.calls.fan_setup = Some(setup);
    }

    fn init_core_regulator(&mut self, family: RegulatorFamily) -> bool {
        self.calls.regulator_init = Some(family);
        self.regulator_ok
    }

    fn set_core_voltage_mv(&mut self, millivolts: u16) {
        self.calls.voltage_set = Some(millivolts);
    }

    fn dac_self_test(&mut self) -> bool {
        self.calls.dac_self_test += 1;
        self.dac_ok
    }

    fn init_power_monitor(&mut self) {
        self.calls.power_monitor_init += 1;
    }

    fn detect_asic_chip_count(&mut self, _frequency_mhz: u16, _expected: u8) -> u8 {
        self.calls.chip_detect += 1;
        self.chips
    }

    fn negotiate_max_baud(&mut self) -> u32 {
        self.calls.baud += 1;
        self.baud
    }

    fn read_fan_rpm(&mut self) -> u16 {
        self.calls.fan_reads += 1;
        self.fan_rpm
    }

    fn read_core_voltage_mv(&mut self) -> u16 {
        self.calls.core_voltage_reads += 1;
        self.core_voltage_mv
    }

    fn read_power_draw_watts(&mut self, source: PowerSource) -> f32 {
        self.calls.power_reads += 1;
        self.calls.power_source = Some(source);
        self.power_watts
    }
}

/// Four-row panel that remembers every line written to it.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    pub fail_init: bool,
    initialized: bool,
    pub rows: [String<20>; 4],
    pub history: Vec<String<20>, 32>,
}

impl RecordingDisplay {
    pub fn failing() -> Self {
        Self {
            fail_init: true,
            ..Self::default()
        }
    }

    pub fn mentions(&self, needle: &str) -> bool {
        self.history.iter().any(|line| line.contains(needle))
    }
}

impl DisplaySink for RecordingDisplay {
    fn is_present(&self) -> bool {
        self.initialized
    }

    fn initialize(&mut self) -> bool {
        self.initialized = !self.fail_init;
        self.initialized
    }

    fn write_line(&mut self, row: u8, text: &str) {
        let mut line = String::new();
        line.push_str(text).unwrap();
        self.rows[usize::from(row)] = line.clone();
        self.history.push(line).unwrap();
    }

    fn clear(&mut self, row: u8) {
        self.rows[usize::from(row)].clear();
    }
}

/// Timer whose expiry is triggered by the test.
#[derive(Default)]
pub struct ManualTimer {
    active: AtomicBool,
    pub starts: AtomicU8,
    pub stops: AtomicU8,
}

impl ManualTimer {
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            starts: AtomicU8::new(0),
            stops: AtomicU8::new(0),
        }
    }

    /// Simulates the timer period elapsing. Returns `true` if it was armed.
    pub fn elapse(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }
}

impl OneShotTimer for ManualTimer {
    fn start(&self) {
        self.starts.fetch_add(1, Ordering::Relaxed);
        self.active.store(true, Ordering::Release);
    }

    fn stop(&self) -> bool {
        self.stops.fetch_add(1, Ordering::Relaxed);
        self.active.swap(false, Ordering::AcqRel)
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Restart primitive that unwinds instead of resetting.
pub struct PanicRestart;

impl Restart for PanicRestart {
    fn restart(&mut self) -> ! {
        panic!("restart requested");
    }
}

pub fn gamma() -> DeviceProfile {
    DeviceProfile::single_chip(DeviceVariant::Gamma, 650).unwrap()
}

pub fn profile(variant: DeviceVariant, revision: u16) -> DeviceProfile {
    DeviceProfile::single_chip(variant, revision).unwrap()
}
