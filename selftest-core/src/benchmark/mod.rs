//! Bounded-window hash-rate benchmark.
//!
//! One fixed job is sent to the ASIC, then results are polled until the
//! wall-clock window closes. Every result counts as `difficulty_mask` units
//! of work; the nonce is not checked against the job target.

use core::time::Duration;

use crate::hw::{AsicInterface, Clock, JobId, JobSlots};
use crate::telemetry::{SelfTestEvent, TelemetrySink};

pub mod job;

pub use job::{REFERENCE_JOB, SyntheticJob};

/// Default ASIC-side result filter.
pub const DEFAULT_DIFFICULTY_MASK: u8 = 8;
/// Default benchmark window.
pub const DEFAULT_BENCHMARK_WINDOW: Duration = Duration::from_secs(3);

/// Hashes searched per unit of difficulty-1 work (2^32).
pub const HASHES_PER_DIFFICULTY_UNIT: f64 = 4_294_967_296.0;

/// Nonce reported by the ASIC.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AsicResult {
    pub nonce: u32,
    pub rolled_version: u32,
}

/// Benchmark parameters.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BenchmarkConfig {
    pub difficulty_mask: u8,
    pub window: Duration,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            difficulty_mask: DEFAULT_DIFFICULTY_MASK,
            window: DEFAULT_BENCHMARK_WINDOW,
        }
    }
}

/// Converts accumulated difficulty over `elapsed` into GH/s.
///
/// A zero elapsed time yields zero rather than dividing by zero.
pub fn hashrate_ghs(difficulty_units: f64, elapsed: Duration) -> f64 {
    let seconds = elapsed.as_secs_f64();
    if seconds <= 0.0 {
        return 0.0;
    }
    (difficulty_units * HASHES_PER_DIFFICULTY_UNIT) / (seconds * 1e9)
}

/// Accumulator for one benchmark run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BenchmarkWindow {
    pub started_at: Duration,
    pub difficulty_units: u32,
    pub samples: u32,
}

impl BenchmarkWindow {
    pub const fn open(started_at: Duration) -> Self {
        Self {
            started_at,
            difficulty_units: 0,
            samples: 0,
        }
    }

    /// Credits one result with `weight` units of difficulty.
    pub fn record(&mut self, weight: u8) {
        self.difficulty_units = self.difficulty_units.saturating_add(u32::from(weight));
        self.samples = self.samples.saturating_add(1);
    }

    pub fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.started_at)
    }

    pub fn hashrate_ghs(&self, elapsed: Duration) -> f64 {
        hashrate_ghs(f64::from(self.difficulty_units), elapsed)
    }

    /// Closes the window at `now`.
    pub fn finish(self, job_id: JobId, now: Duration) -> BenchmarkReport {
        let elapsed = self.elapsed(now);
        BenchmarkReport {
            job_id,
            hashrate_ghs: self.hashrate_ghs(elapsed),
            difficulty_units: self.difficulty_units,
            samples: self.samples,
            elapsed,
        }
    }
}

/// Outcome of a benchmark run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BenchmarkReport {
    pub job_id: JobId,
    pub hashrate_ghs: f64,
    pub difficulty_units: u32,
    pub samples: u32,
    pub elapsed: Duration,
}

/// Runs the benchmark to the end of its window.
///
/// The loop ends only on the wall-clock condition, however many results
/// arrive; there is no cancellation path.
pub fn run_benchmark<A, K, T>(
    asic: &mut A,
    clock: &K,
    slots: &mut JobSlots,
    job: &SyntheticJob,
    config: BenchmarkConfig,
    telemetry: &mut T,
) -> BenchmarkReport
where
    A: AsicInterface + ?Sized,
    K: Clock + ?Sized,
    T: TelemetrySink + ?Sized,
{
    asic.set_difficulty_mask(config.difficulty_mask);
    let job_id = asic.submit_job(job, slots);

    let started_at = clock.now();
    telemetry.record(
        started_at,
        SelfTestEvent::JobSubmitted {
            job_id,
            difficulty_mask: config.difficulty_mask,
        },
    );

    let mut window = BenchmarkWindow::open(started_at);
    let closed_at = loop {
        let now = clock.now();
        if window.elapsed(now) >= config.window {
            break now;
        }

        if let Some(result) = asic.poll_result(slots) {
            window.record(config.difficulty_mask);
            telemetry.record(
                now,
                SelfTestEvent::NonceReceived {
                    nonce: result.nonce,
                    rolled_version: result.rolled_version,
                    running_ghs: window.hashrate_ghs(window.elapsed(now)),
                },
            );
        }
    };

    let report = window.finish(job_id, closed_at);
    telemetry.record(closed_at, SelfTestEvent::BenchmarkComplete(report));
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashrate_formula_matches_reference_numbers() {
        let ghs = hashrate_ghs(80.0, Duration::from_secs(3));
        assert!((ghs - 114.532_461).abs() < 1e-3, "got {ghs}");
    }

    #[test]
    fn zero_elapsed_reports_zero_hashrate() {
        assert!(hashrate_ghs(80.0, Duration::ZERO).abs() < f64::EPSILON);
    }

    #[test]
    fn window_accumulates_mask_weight_per_result() {
        let mut window = BenchmarkWindow::open(Duration::from_millis(500));
        for _ in 0..10 {
            window.record(DEFAULT_DIFFICULTY_MASK);
        }

        let report = window.finish(0, Duration::from_millis(3_500));
        assert_eq!(report.difficulty_units, 80);
        assert_eq!(report.samples, 10);
        assert_eq!(report.elapsed, Duration::from_secs(3));
        assert!((report.hashrate_ghs - 114.53).abs() < 0.01);
    }

    #[test]
    fn empty_window_reports_zero() {
        let report = BenchmarkWindow::open(Duration::ZERO).finish(0, Duration::from_secs(3));
        assert_eq!(report.samples, 0);
        assert!(report.hashrate_ghs.abs() < f64::EPSILON);
    }
}
