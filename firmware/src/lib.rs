#![cfg_attr(target_os = "none", no_std)]

// Embassy platform layer for the self-test.
//
// Provides the pieces every board needs: the one-shot timer service and the
// process-wide long-press watchdog, a monotonic clock, defmt telemetry and the
// generic self-test task. Board crates add their drivers and spawn the tasks.

pub mod clock;
pub mod runner;
pub mod telemetry;
pub mod timer;

#[cfg(target_os = "none")]
pub mod button;
#[cfg(target_os = "none")]
mod platform;
#[cfg(target_os = "none")]
pub mod restart;

pub use timer::LONG_PRESS;
