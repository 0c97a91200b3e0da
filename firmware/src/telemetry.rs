//! Self-test telemetry ring and log mirroring.
//!
//! Every event from the pipeline is kept in a fixed-capacity ring with its
//! Embassy timestamp and echoed to defmt on target or stdout on the host.

use embassy_time::Instant;
use heapless::{HistoryBuf, OldestOrdered};
use selftest_core::telemetry::{EventId, SelfTestEvent, TelemetrySink};

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 128;

/// Telemetry record stored in the ring buffer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub timestamp: Instant,
    pub event: SelfTestEvent,
}

/// Severity used when mirroring an event to the log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LogLevel {
    Info,
    Warn,
}

/// Records self-test events and mirrors them to the console.
pub struct FirmwareTelemetry {
    ring: HistoryBuf<TelemetryRecord, TELEMETRY_RING_CAPACITY>,
    next_event_id: EventId,
    echo_nonces: bool,
}

impl FirmwareTelemetry {
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
            echo_nonces: true,
        }
    }

    /// Stops echoing individual nonces; they are still recorded.
    #[must_use]
    pub const fn quiet_nonces(mut self) -> Self {
        self.echo_nonces = false;
        self
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    fn push(&mut self, timestamp: Instant, event: SelfTestEvent) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);
        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
        });
        id
    }
}

impl Default for FirmwareTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for FirmwareTelemetry {
    fn record(&mut self, timestamp: core::time::Duration, event: SelfTestEvent) {
        let micros = u64::try_from(timestamp.as_micros()).unwrap_or(u64::MAX);
        let instant = Instant::from_micros(micros);
        self.push(instant, event);

        if matches!(event, SelfTestEvent::NonceReceived { .. }) && !self.echo_nonces {
            return;
        }
        emit_log(level_for(&event), micros, &event);
    }
}

const fn level_for(event: &SelfTestEvent) -> LogLevel {
    match event {
        SelfTestEvent::StageFailed(..) | SelfTestEvent::VerdictReached { passed: false } => {
            LogLevel::Warn
        }
        _ => LogLevel::Info,
    }
}

#[cfg(target_os = "none")]
fn emit_log(level: LogLevel, timestamp_us: u64, event: &SelfTestEvent) {
    match level {
        LogLevel::Info => defmt::info!(
            "self-test t={}us {}",
            timestamp_us,
            defmt::Display2Format(event)
        ),
        LogLevel::Warn => defmt::warn!(
            "self-test t={}us {}",
            timestamp_us,
            defmt::Display2Format(event)
        ),
    }
}

#[cfg(not(target_os = "none"))]
fn emit_log(level: LogLevel, timestamp_us: u64, event: &SelfTestEvent) {
    let tag = match level {
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
    };
    println!("[{tag}] self-test t={timestamp_us}us {event}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use selftest_core::orchestrator::{StageFailure, StageId};

    #[test]
    fn records_keep_microsecond_timestamps() {
        let mut telemetry = FirmwareTelemetry::new();
        telemetry.record(Duration::from_micros(250), SelfTestEvent::BaudNegotiated(115_200));
        telemetry.record(
            Duration::from_millis(3),
            SelfTestEvent::StageFailed(StageId::Benchmark, StageFailure::HashrateBelowThreshold),
        );

        assert_eq!(telemetry.len(), 2);
        let first = telemetry.oldest_first().next().copied().unwrap();
        assert_eq!(first.id, 0);
        assert_eq!(first.timestamp.as_micros(), 250);

        let latest = telemetry.latest().copied().unwrap();
        assert_eq!(latest.id, 1);
        assert_eq!(level_for(&latest.event), LogLevel::Warn);
    }

    #[test]
    fn quiet_nonces_still_records_them() {
        let mut telemetry = FirmwareTelemetry::new().quiet_nonces();
        telemetry.record(
            Duration::from_millis(1),
            SelfTestEvent::NonceReceived {
                nonce: 1,
                rolled_version: 0x2000_0004,
                running_ghs: 0.0,
            },
        );
        assert_eq!(telemetry.len(), 1);
    }
}
