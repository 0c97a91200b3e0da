//! Sequential hardware-qualification pipeline.
//!
//! [`SelfTest`] runs the stages in [`PIPELINE`] order on the caller's
//! context. Each stage yields a [`StageResult`]; the first failing result is
//! latched into the [`Verdict`] and no later stage runs. Per-variant
//! decisions come from the [`ThresholdSet`] and [`Capabilities`] computed
//! once at the start of a run.

use core::{fmt, time::Duration};

use heapless::Vec;

use crate::benchmark::{SyntheticJob, run_benchmark};
use crate::config::SelfTestSettings;
use crate::display::{
    self, DISPLAY_ROWS, DisplayText, FAN_WARN, HASHRATE_FAIL, MESSAGE_ROW, PASS_MESSAGE,
    POWER_FAIL, TITLE, TITLE_ROW, VCORE_FAIL,
};
use crate::hw::{Clock, DisplaySink, FanSetup, HardwareProbes, JobSlots};
use crate::profile::{Capabilities, DeviceProfile};
use crate::telemetry::{SelfTestEvent, TelemetrySink};
use crate::thresholds::{RegulatorFamily, ThresholdSet, thresholds_for};

/// Number of stages in the pipeline.
pub const STAGE_COUNT: usize = 9;

/// Pipeline stages.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StageId {
    DisplayInit,
    ChipPresence,
    RegulatorSelfCheck,
    PowerMonitorInit,
    AsicBringUp,
    Benchmark,
    CoreVoltage,
    PowerDraw,
    FanSpeed,
}

/// Execution order of the pipeline.
pub const PIPELINE: [StageId; STAGE_COUNT] = [
    StageId::DisplayInit,
    StageId::ChipPresence,
    StageId::RegulatorSelfCheck,
    StageId::PowerMonitorInit,
    StageId::AsicBringUp,
    StageId::Benchmark,
    StageId::CoreVoltage,
    StageId::PowerDraw,
    StageId::FanSpeed,
];

impl StageId {
    pub const fn name(self) -> &'static str {
        match self {
            StageId::DisplayInit => "display-init",
            StageId::ChipPresence => "chip-presence",
            StageId::RegulatorSelfCheck => "regulator-self-check",
            StageId::PowerMonitorInit => "power-monitor-init",
            StageId::AsicBringUp => "asic-bring-up",
            StageId::Benchmark => "benchmark",
            StageId::CoreVoltage => "core-voltage",
            StageId::PowerDraw => "power-draw",
            StageId::FanSpeed => "fan-speed",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scalar readings judged against the [`ThresholdSet`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Measurement {
    CoreVoltage,
    PowerDraw,
    FanSpeed,
}

impl Measurement {
    pub const fn name(self) -> &'static str {
        match self {
            Measurement::CoreVoltage => "core-voltage",
            Measurement::PowerDraw => "power-draw",
            Measurement::FanSpeed => "fan-speed",
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Measurement::CoreVoltage => "mV",
            Measurement::PowerDraw => "W",
            Measurement::FanSpeed => "RPM",
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Reasons a stage can fail.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum StageFailure {
    /// Display is fitted but did not initialize.
    DisplayInitFailure,
    RegulatorSelfCheckFailure(RegulatorFamily),
    ChipCountMismatch { detected: u8, expected: u8 },
    OutOfRangeMeasurement(Measurement),
    HashrateBelowThreshold,
}

impl fmt::Display for StageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageFailure::DisplayInitFailure => f.write_str("display failed to initialize"),
            StageFailure::RegulatorSelfCheckFailure(family) => {
                write!(f, "{} self-check failed", family.part())
            }
            StageFailure::ChipCountMismatch { detected, expected } => {
                write!(f, "{detected} of {expected} chips detected")
            }
            StageFailure::OutOfRangeMeasurement(measurement) => {
                write!(f, "{measurement} out of range")
            }
            StageFailure::HashrateBelowThreshold => f.write_str("hashrate below minimum"),
        }
    }
}

/// Outcome of one stage. Consumed by the [`VerdictLatch`] right away.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StageResult {
    pub stage: StageId,
    pub passed: bool,
    /// The stage had nothing to check on this board and passed vacuously.
    pub skipped: bool,
    pub failure: Option<StageFailure>,
    pub message: DisplayText,
}

impl StageResult {
    pub fn pass(stage: StageId) -> Self {
        Self {
            stage,
            passed: true,
            skipped: false,
            failure: None,
            message: DisplayText::new(),
        }
    }

    pub fn skipped(stage: StageId) -> Self {
        Self {
            skipped: true,
            ..Self::pass(stage)
        }
    }

    pub fn fail(stage: StageId, failure: StageFailure, message: DisplayText) -> Self {
        Self {
            stage,
            passed: false,
            skipped: false,
            failure: Some(failure),
            message,
        }
    }

    fn check(stage: StageId, ok: bool, failure: StageFailure, message: &str) -> Self {
        if ok {
            Self::pass(stage)
        } else {
            Self::fail(stage, failure, display::display_text(message))
        }
    }
}

/// Final outcome of a run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Verdict {
    pub passed: bool,
    pub failing_stage: Option<StageId>,
    pub failure: Option<StageFailure>,
    /// Stage diagnostic on failure, generic success text otherwise.
    pub message: DisplayText,
}

impl Verdict {
    pub fn pass() -> Self {
        Self {
            passed: true,
            failing_stage: None,
            failure: None,
            message: display::display_text(PASS_MESSAGE),
        }
    }
}

/// Accumulates stage results; the first failure wins and is never overwritten.
#[derive(Clone, Debug, Default)]
pub struct VerdictLatch {
    failed: Option<StageResult>,
}

impl VerdictLatch {
    pub const fn new() -> Self {
        Self { failed: None }
    }

    /// Records `result`. Returns `true` while the pipeline may continue.
    pub fn record(&mut self, result: StageResult) -> bool {
        if self.failed.is_some() {
            return false;
        }
        if result.passed {
            return true;
        }
        self.failed = Some(result);
        false
    }

    pub fn is_failed(&self) -> bool {
        self.failed.is_some()
    }

    pub fn finish(self) -> Verdict {
        match self.failed {
            Some(result) => Verdict {
                passed: false,
                failing_stage: Some(result.stage),
                failure: result.failure,
                message: result.message,
            },
            None => Verdict::pass(),
        }
    }
}

/// Per-run view of the board, computed once from the profile.
#[derive(Copy, Clone, Debug)]
struct RunPlan {
    profile: DeviceProfile,
    capabilities: Capabilities,
    thresholds: ThresholdSet,
}

/// Pipeline runner owning the hardware collaborators.
pub struct SelfTest<H, D, K> {
    probes: H,
    display: D,
    clock: K,
    settings: SelfTestSettings,
    trace: Vec<StageId, STAGE_COUNT>,
    powered: bool,
    regulator_init_ok: bool,
}

impl<H, D, K> SelfTest<H, D, K>
where
    H: HardwareProbes,
    D: DisplaySink,
    K: Clock,
{
    pub fn new(probes: H, display: D, clock: K, settings: SelfTestSettings) -> Self {
        Self {
            probes,
            display,
            clock,
            settings,
            trace: Vec::new(),
            powered: false,
            regulator_init_ok: false,
        }
    }

    /// Runs every stage until the first failure and returns the verdict.
    ///
    /// In-flight job tracking lives only for the duration of this call.
    pub fn run<T>(&mut self, profile: &DeviceProfile, telemetry: &mut T) -> Verdict
    where
        T: TelemetrySink + ?Sized,
    {
        let plan = RunPlan {
            profile: *profile,
            capabilities: profile.capabilities(),
            thresholds: thresholds_for(profile),
        };
        self.trace.clear();
        self.powered = false;
        self.regulator_init_ok = false;

        telemetry.record(
            self.clock.now(),
            SelfTestEvent::RunStarted {
                variant: profile.variant,
                board_revision: profile.board_revision,
            },
        );

        let mut slots: JobSlots = JobSlots::new();
        let mut latch = VerdictLatch::new();
        for stage in PIPELINE {
            // Capacity equals the pipeline length and the trace is cleared per run.
            let _ = self.trace.push(stage);
            telemetry.record(self.clock.now(), SelfTestEvent::StageStarted(stage));

            let result = self.run_stage(stage, &plan, &mut slots, telemetry);

            let event = match result.failure {
                Some(failure) => SelfTestEvent::StageFailed(stage, failure),
                None if result.skipped => SelfTestEvent::StageSkipped(stage),
                None => SelfTestEvent::StagePassed(stage),
            };
            telemetry.record(self.clock.now(), event);

            if !result.passed {
                self.show_message(&plan, &result.message);
            }
            if !latch.record(result) {
                break;
            }
        }

        let in_flight = slots.in_flight();
        drop(slots);
        telemetry.record(
            self.clock.now(),
            SelfTestEvent::JobSlotsReleased { in_flight },
        );

        let verdict = latch.finish();
        telemetry.record(
            self.clock.now(),
            SelfTestEvent::VerdictReached {
                passed: verdict.passed,
            },
        );
        verdict
    }

    /// Stages entered during the most recent run, in order.
    pub fn executed_stages(&self) -> &[StageId] {
        &self.trace
    }

    pub fn settings(&self) -> &SelfTestSettings {
        &self.settings
    }

    pub fn probes(&self) -> &H {
        &self.probes
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }

    pub fn into_parts(self) -> (H, D, K) {
        (self.probes, self.display, self.clock)
    }

    fn run_stage<T>(
        &mut self,
        stage: StageId,
        plan: &RunPlan,
        slots: &mut JobSlots,
        telemetry: &mut T,
    ) -> StageResult
    where
        T: TelemetrySink + ?Sized,
    {
        match stage {
            StageId::DisplayInit => self.display_init(plan),
            StageId::ChipPresence => self.chip_presence(plan, telemetry),
            StageId::RegulatorSelfCheck => self.regulator_self_check(plan),
            StageId::PowerMonitorInit => self.power_monitor_init(plan),
            StageId::AsicBringUp => self.asic_bring_up(telemetry),
            StageId::Benchmark => self.benchmark(plan, slots, telemetry),
            StageId::CoreVoltage => self.core_voltage(plan, telemetry),
            StageId::PowerDraw => self.power_draw(plan, telemetry),
            StageId::FanSpeed => self.fan_speed(plan, telemetry),
        }
    }

    fn display_init(&mut self, plan: &RunPlan) -> StageResult {
        if !plan.capabilities.has_display {
            return StageResult::skipped(StageId::DisplayInit);
        }
        if !self.display.initialize() {
            return StageResult::fail(
                StageId::DisplayInit,
                StageFailure::DisplayInitFailure,
                display::display_text(display::DISPLAY_FAIL),
            );
        }
        for row in 0..DISPLAY_ROWS {
            self.display.clear(row);
        }
        self.display.write_line(TITLE_ROW, TITLE);
        StageResult::pass(StageId::DisplayInit)
    }

    /// Switches the board on once per run: ASIC rail, fan, core regulator.
    fn ensure_powered<T>(&mut self, plan: &RunPlan, telemetry: &mut T)
    where
        T: TelemetrySink + ?Sized,
    {
        if self.powered {
            return;
        }
        self.powered = true;

        let capabilities = plan.capabilities;
        if capabilities.asic_power_switch {
            self.probes.enable_asic_power();
        }
        if capabilities.has_fan_controller {
            self.probes.init_fan_controller(FanSetup {
                invert_polarity: self.settings.invert_fan_polarity,
                thermal_tuning: capabilities.thermal_tuning,
            });
        }

        self.regulator_init_ok = match plan.thresholds.regulator {
            Some(family) => self.probes.init_core_regulator(family),
            None => true,
        };
        self.probes.set_core_voltage_mv(self.settings.core_voltage_mv);

        telemetry.record(
            self.clock.now(),
            SelfTestEvent::PoweredUp {
                core_voltage_mv: self.settings.core_voltage_mv,
                regulator_ok: self.regulator_init_ok,
            },
        );
    }

    fn chip_presence<T>(&mut self, plan: &RunPlan, telemetry: &mut T) -> StageResult
    where
        T: TelemetrySink + ?Sized,
    {
        self.ensure_powered(plan, telemetry);

        let expected = plan.profile.expected_chip_count;
        let detected = self
            .probes
            .detect_asic_chip_count(self.settings.asic_frequency_mhz, expected);
        telemetry.record(
            self.clock.now(),
            SelfTestEvent::ChipsDetected { detected, expected },
        );

        if detected == expected {
            StageResult::pass(StageId::ChipPresence)
        } else {
            StageResult::fail(
                StageId::ChipPresence,
                StageFailure::ChipCountMismatch { detected, expected },
                display::chip_count_failure(detected),
            )
        }
    }

    fn regulator_self_check(&mut self, plan: &RunPlan) -> StageResult {
        let Some(family) = plan.thresholds.regulator else {
            return StageResult::skipped(StageId::RegulatorSelfCheck);
        };

        let ok = match family {
            RegulatorFamily::DigitalPowerStage => self.regulator_init_ok,
            RegulatorFamily::DacControlled => self.probes.dac_self_test(),
        };
        if ok {
            StageResult::pass(StageId::RegulatorSelfCheck)
        } else {
            StageResult::fail(
                StageId::RegulatorSelfCheck,
                StageFailure::RegulatorSelfCheckFailure(family),
                display::regulator_failure(family),
            )
        }
    }

    fn power_monitor_init(&mut self, plan: &RunPlan) -> StageResult {
        if !plan.capabilities.has_power_monitor {
            return StageResult::skipped(StageId::PowerMonitorInit);
        }
        self.probes.init_power_monitor();
        StageResult::pass(StageId::PowerMonitorInit)
    }

    fn asic_bring_up<T>(&mut self, telemetry: &mut T) -> StageResult
    where
        T: TelemetrySink + ?Sized,
    {
        let baud = self.probes.negotiate_max_baud();
        telemetry.record(self.clock.now(), SelfTestEvent::BaudNegotiated(baud));

        self.settle(self.settings.baud_settle);
        self.settle(self.settings.asic_settle);
        StageResult::pass(StageId::AsicBringUp)
    }

    fn benchmark<T>(
        &mut self,
        plan: &RunPlan,
        slots: &mut JobSlots,
        telemetry: &mut T,
    ) -> StageResult
    where
        T: TelemetrySink + ?Sized,
    {
        let report = run_benchmark(
            &mut self.probes,
            &self.clock,
            slots,
            &SyntheticJob::reference(),
            self.settings.benchmark,
            telemetry,
        );

        StageResult::check(
            StageId::Benchmark,
            plan.thresholds.hashrate_ok(report.hashrate_ghs),
            StageFailure::HashrateBelowThreshold,
            HASHRATE_FAIL,
        )
    }

    fn core_voltage<T>(&mut self, plan: &RunPlan, telemetry: &mut T) -> StageResult
    where
        T: TelemetrySink + ?Sized,
    {
        let millivolts = self.probes.read_core_voltage_mv();
        self.record_measurement(telemetry, Measurement::CoreVoltage, f32::from(millivolts));

        StageResult::check(
            StageId::CoreVoltage,
            plan.thresholds.core_voltage_ok(millivolts),
            StageFailure::OutOfRangeMeasurement(Measurement::CoreVoltage),
            VCORE_FAIL,
        )
    }

    fn power_draw<T>(&mut self, plan: &RunPlan, telemetry: &mut T) -> StageResult
    where
        T: TelemetrySink + ?Sized,
    {
        let Some(window) = plan.thresholds.power else {
            return StageResult::skipped(StageId::PowerDraw);
        };

        let watts = self.probes.read_power_draw_watts(window.source);
        self.record_measurement(telemetry, Measurement::PowerDraw, watts);

        StageResult::check(
            StageId::PowerDraw,
            window.contains(watts),
            StageFailure::OutOfRangeMeasurement(Measurement::PowerDraw),
            POWER_FAIL,
        )
    }

    fn fan_speed<T>(&mut self, plan: &RunPlan, telemetry: &mut T) -> StageResult
    where
        T: TelemetrySink + ?Sized,
    {
        // Boards without a fan controller read as a stopped fan.
        let rpm = if plan.capabilities.has_fan_controller {
            self.probes.read_fan_rpm()
        } else {
            0
        };
        self.record_measurement(telemetry, Measurement::FanSpeed, f32::from(rpm));

        StageResult::check(
            StageId::FanSpeed,
            plan.thresholds.fan_ok(rpm),
            StageFailure::OutOfRangeMeasurement(Measurement::FanSpeed),
            FAN_WARN,
        )
    }

    fn record_measurement<T>(&self, telemetry: &mut T, measurement: Measurement, value: f32)
    where
        T: TelemetrySink + ?Sized,
    {
        telemetry.record(
            self.clock.now(),
            SelfTestEvent::MeasurementTaken { measurement, value },
        );
    }

    fn settle(&self, duration: Duration) {
        if !duration.is_zero() {
            self.clock.delay(duration);
        }
    }

    fn show_message(&mut self, plan: &RunPlan, message: &str) {
        if plan.capabilities.has_display && self.display.is_present() {
            self.display.write_line(MESSAGE_ROW, message);
        }
    }
}

/// Runs the pipeline once and returns the verdict along with the display,
/// which the terminal phase keeps using.
pub fn run_self_test<H, D, K, T>(
    profile: &DeviceProfile,
    settings: SelfTestSettings,
    probes: H,
    display: D,
    clock: K,
    telemetry: &mut T,
) -> (Verdict, D)
where
    H: HardwareProbes,
    D: DisplaySink,
    K: Clock,
    T: TelemetrySink + ?Sized,
{
    let mut self_test = SelfTest::new(probes, display, clock, settings);
    let verdict = self_test.run(profile, telemetry);
    let (_, display, _) = self_test.into_parts();
    (verdict, display)
}
