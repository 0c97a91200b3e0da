mod support;

use core::time::Duration;

use selftest_core::benchmark::{
    BenchmarkConfig, DEFAULT_DIFFICULTY_MASK, SyntheticJob, run_benchmark,
};
use selftest_core::hw::JobSlots;
use selftest_core::profile::DeviceVariant;
use selftest_core::telemetry::{NoopTelemetry, SelfTestEvent, TelemetryLog};
use selftest_core::thresholds::{
    POWER_TARGET_DAC, POWER_TARGET_DIGITAL, PowerSource, thresholds_for,
};

use support::{MockBench, StepClock, profile};

#[test]
fn ten_results_over_three_seconds_is_114_ghs() {
    let mut asic = MockBench::healthy().with_results(10);
    let clock = StepClock::millis();
    let mut slots: JobSlots = JobSlots::new();
    let mut log = TelemetryLog::<32>::new();

    let report = run_benchmark(
        &mut asic,
        &clock,
        &mut slots,
        &SyntheticJob::reference(),
        BenchmarkConfig::default(),
        &mut log,
    );

    assert_eq!(report.samples, 10);
    assert_eq!(report.difficulty_units, 80);
    assert_eq!(report.elapsed, Duration::from_secs(3));
    assert!((report.hashrate_ghs - 114.53).abs() < 0.01, "{}", report.hashrate_ghs);
    assert!(slots.is_valid(report.job_id));

    let nonces = log
        .oldest_first()
        .filter(|record| matches!(record.event, SelfTestEvent::NonceReceived { .. }))
        .count();
    assert_eq!(nonces, 10);
    assert_eq!(
        log.latest().map(|record| record.event),
        Some(SelfTestEvent::BenchmarkComplete(report))
    );
}

#[test]
fn window_closes_on_time_not_on_result_count() {
    let mut asic = MockBench::healthy().with_results(u32::MAX);
    let clock = StepClock::new(Duration::from_millis(10));
    let mut slots: JobSlots = JobSlots::new();

    let report = run_benchmark(
        &mut asic,
        &clock,
        &mut slots,
        &SyntheticJob::reference(),
        BenchmarkConfig {
            difficulty_mask: DEFAULT_DIFFICULTY_MASK,
            window: Duration::from_millis(500),
        },
        &mut NoopTelemetry,
    );

    assert_eq!(report.elapsed, Duration::from_millis(500));
    assert_eq!(report.samples, 49);
}

#[test]
fn silent_asic_yields_zero_and_fails_positive_minimums() {
    let mut asic = MockBench::healthy().with_results(0);
    let clock = StepClock::millis();
    let mut slots: JobSlots = JobSlots::new();

    let report = run_benchmark(
        &mut asic,
        &clock,
        &mut slots,
        &SyntheticJob::reference(),
        BenchmarkConfig::default(),
        &mut NoopTelemetry,
    );

    assert_eq!(report.samples, 0);
    assert!(report.hashrate_ghs.abs() < f64::EPSILON);
    assert!(!thresholds_for(&profile(DeviceVariant::Supra, 401)).hashrate_ok(report.hashrate_ghs));
    assert!(!thresholds_for(&profile(DeviceVariant::Gamma, 650)).hashrate_ok(report.hashrate_ghs));
    assert!(thresholds_for(&profile(DeviceVariant::Max, 0)).hashrate_ok(report.hashrate_ghs));
}

#[test]
fn digital_revision_selects_digital_power_target() {
    let digital = thresholds_for(&profile(DeviceVariant::Ultra, 450))
        .power
        .unwrap();
    let legacy = thresholds_for(&profile(DeviceVariant::Ultra, 350))
        .power
        .unwrap();

    assert!((digital.target_watts - POWER_TARGET_DIGITAL).abs() < f32::EPSILON);
    assert_eq!(digital.source, PowerSource::RegulatorTelemetry);
    assert!((legacy.target_watts - POWER_TARGET_DAC).abs() < f32::EPSILON);
    assert_eq!(legacy.source, PowerSource::PowerMonitor);
}
