//! Monotonic time backed by the Embassy time driver.

use core::time::Duration;

use embassy_time::Instant;
use selftest_core::hw::Clock;

/// [`Clock`] reading the Embassy tick counter.
///
/// `delay` spins on the tick counter, so anything that must keep running
/// during the pipeline (button edges, the one-shot timer) belongs on a
/// higher-priority executor.
#[derive(Copy, Clone, Debug, Default)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now(&self) -> Duration {
        Duration::from_micros(Instant::now().as_micros())
    }

    fn delay(&self, duration: Duration) {
        embassy_time::block_for(to_embassy(duration));
    }
}

/// Converts a `core` duration to Embassy ticks, saturating on overflow.
pub fn to_embassy(duration: Duration) -> embassy_time::Duration {
    let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
    embassy_time::Duration::from_micros(micros)
}
