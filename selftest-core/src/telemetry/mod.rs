//! Self-test event catalog and a fixed-capacity event log.
//!
//! The core never logs directly. Every observable step of a run is reported
//! as a [`SelfTestEvent`] through a [`TelemetrySink`]; firmware mirrors the
//! events to defmt, the emulator prints them, and tests keep them in a
//! [`TelemetryLog`] to assert on ordering.

use core::{fmt, time::Duration};

use heapless::{HistoryBuf, OldestOrdered};

use crate::benchmark::BenchmarkReport;
use crate::hw::JobId;
use crate::orchestrator::{Measurement, StageFailure, StageId};
use crate::profile::DeviceVariant;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 128;

/// Identifier assigned to each recorded event.
pub type EventId = u32;

/// Discrete events emitted during a self-test execution.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SelfTestEvent {
    RunStarted {
        variant: DeviceVariant,
        board_revision: u16,
    },
    StageStarted(StageId),
    StagePassed(StageId),
    /// Stage had nothing to check on this board.
    StageSkipped(StageId),
    StageFailed(StageId, StageFailure),
    PoweredUp {
        core_voltage_mv: u16,
        regulator_ok: bool,
    },
    ChipsDetected {
        detected: u8,
        expected: u8,
    },
    BaudNegotiated(u32),
    JobSubmitted {
        job_id: JobId,
        difficulty_mask: u8,
    },
    NonceReceived {
        nonce: u32,
        rolled_version: u32,
        running_ghs: f64,
    },
    BenchmarkComplete(BenchmarkReport),
    MeasurementTaken {
        measurement: Measurement,
        value: f32,
    },
    JobSlotsReleased {
        in_flight: usize,
    },
    VerdictReached {
        passed: bool,
    },
    LongPressAcknowledged,
    Restarting,
}

impl fmt::Display for SelfTestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelfTestEvent::RunStarted {
                variant,
                board_revision,
            } => write!(f, "run-started variant={variant} revision={board_revision}"),
            SelfTestEvent::StageStarted(stage) => write!(f, "stage-started {stage}"),
            SelfTestEvent::StagePassed(stage) => write!(f, "stage-passed {stage}"),
            SelfTestEvent::StageSkipped(stage) => write!(f, "stage-skipped {stage}"),
            SelfTestEvent::StageFailed(stage, failure) => {
                write!(f, "stage-failed {stage} ({failure})")
            }
            SelfTestEvent::PoweredUp {
                core_voltage_mv,
                regulator_ok,
            } => write!(
                f,
                "powered-up vcore-target={core_voltage_mv}mV regulator-ok={regulator_ok}"
            ),
            SelfTestEvent::ChipsDetected { detected, expected } => {
                write!(f, "chips-detected {detected} of {expected}")
            }
            SelfTestEvent::BaudNegotiated(baud) => write!(f, "baud-negotiated {baud}"),
            SelfTestEvent::JobSubmitted {
                job_id,
                difficulty_mask,
            } => write!(f, "job-submitted id={job_id} mask={difficulty_mask}"),
            SelfTestEvent::NonceReceived {
                nonce,
                rolled_version,
                running_ghs,
            } => write!(
                f,
                "nonce {nonce:#010x} version={rolled_version:#010x} running={running_ghs:.2}GH/s"
            ),
            SelfTestEvent::BenchmarkComplete(report) => write!(
                f,
                "benchmark-complete {:.2}GH/s samples={} elapsed={}ms",
                report.hashrate_ghs,
                report.samples,
                report.elapsed.as_millis()
            ),
            SelfTestEvent::MeasurementTaken { measurement, value } => {
                write!(f, "measurement {measurement}={value:.2}{}", measurement.unit())
            }
            SelfTestEvent::JobSlotsReleased { in_flight } => {
                write!(f, "job-slots-released in-flight={in_flight}")
            }
            SelfTestEvent::VerdictReached { passed } => {
                f.write_str(if *passed { "verdict PASS" } else { "verdict FAIL" })
            }
            SelfTestEvent::LongPressAcknowledged => f.write_str("long-press-acknowledged"),
            SelfTestEvent::Restarting => f.write_str("restarting"),
        }
    }
}

/// Destination for self-test events.
pub trait TelemetrySink {
    /// Records `event` observed at `timestamp` (monotonic, from the run's clock).
    fn record(&mut self, timestamp: Duration, event: SelfTestEvent);
}

/// Sink that drops every event.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopTelemetry;

impl TelemetrySink for NoopTelemetry {
    fn record(&mut self, _: Duration, _: SelfTestEvent) {}
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub timestamp: Duration,
    pub event: SelfTestEvent,
}

/// Keeps the most recent events in a fixed-size ring.
pub struct TelemetryLog<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: HistoryBuf<TelemetryRecord, CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryLog<CAPACITY> {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Appends an event and returns its identifier.
    pub fn push(&mut self, timestamp: Duration, event: SelfTestEvent) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);
        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
        });
        id
    }

    /// Returns `true` if any retained event satisfies `predicate`.
    pub fn contains(&self, mut predicate: impl FnMut(&SelfTestEvent) -> bool) -> bool {
        self.oldest_first().any(|record| predicate(&record.event))
    }
}

impl<const CAPACITY: usize> Default for TelemetryLog<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const CAPACITY: usize> TelemetrySink for TelemetryLog<CAPACITY> {
    fn record(&mut self, timestamp: Duration, event: SelfTestEvent) {
        self.push(timestamp, event);
    }
}
