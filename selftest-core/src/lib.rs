#![no_std]

// Portable self-test engine for single-board ASIC miners.
//
// The crate stays free of the Rust standard library so the same pipeline runs
// in firmware and in the host emulator. Board drivers plug in through the
// traits in `hw`, `config` and `watchdog`.

pub mod benchmark;
pub mod config;
pub mod display;
pub mod hw;
pub mod latch;
pub mod orchestrator;
pub mod profile;
pub mod telemetry;
pub mod thresholds;
pub mod watchdog;
