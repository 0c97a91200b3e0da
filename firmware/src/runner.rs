//! Generic self-test task.
//!
//! Board crates call [`boot_mode`] early in `main`. When it selects
//! [`BootMode::SelfTest`], they spawn the button and one-shot timer tasks on a
//! higher-priority executor and await [`run_self_test_task`] on the thread
//! executor. The pipeline blocks its executor while it runs.

use core::convert::Infallible;

use selftest_core::config::{ConfigStore, SelfTestSettings, should_run_self_test};
use selftest_core::hw::{Clock, DisplaySink, HardwareProbes, Restart};
use selftest_core::latch::{Terminal, enter_terminal};
use selftest_core::orchestrator::run_self_test;
use selftest_core::profile::DeviceProfile;
use selftest_core::telemetry::TelemetrySink;
use selftest_core::watchdog::{LongPressWatchdog, OneShotTimer};

/// What the board should do after reset.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BootMode {
    SelfTest,
    Normal,
}

/// Reads the persisted flags and picks the boot path.
pub fn boot_mode<S: ConfigStore + ?Sized>(profile: &DeviceProfile, config: &S) -> BootMode {
    if should_run_self_test(profile, config) {
        BootMode::SelfTest
    } else {
        BootMode::Normal
    }
}

/// Concrete collaborators supplied by the board crate.
pub struct Board<H, D, K, S, X> {
    pub profile: DeviceProfile,
    pub probes: H,
    pub display: D,
    pub clock: K,
    pub config: S,
    pub restart: X,
}

/// Runs the pipeline, shows the verdict and waits for the long press.
///
/// Only returns by restarting the device.
pub async fn run_self_test_task<T, H, D, K, S, X, R>(
    board: Board<H, D, K, S, X>,
    watchdog: &LongPressWatchdog<T>,
    telemetry: &mut R,
) -> Infallible
where
    T: OneShotTimer,
    H: HardwareProbes,
    D: DisplaySink,
    K: Clock + Copy,
    S: ConfigStore,
    X: Restart,
    R: TelemetrySink + ?Sized,
{
    let Board {
        profile,
        probes,
        display,
        clock,
        mut config,
        mut restart,
    } = board;

    let settings = SelfTestSettings::load(&config, &profile);
    let (verdict, mut display) = run_self_test(&profile, settings, probes, display, clock, telemetry);

    enter_terminal(
        watchdog,
        verdict,
        Terminal {
            display: &mut display,
            config: &mut config,
            telemetry,
            restart: &mut restart,
        },
        || clock.now(),
    )
    .await
}
