//! Terminal phase: show the verdict and wait for the operator.
//!
//! Nothing here has a timeout. The only way out is a long press on the BOOT
//! button, after which the self-test flag is cleared and the device restarts
//! into normal operation.

use core::convert::Infallible;
use core::time::Duration;

use crate::config::{ConfigKey, ConfigStore};
use crate::display::{
    DIAGNOSTIC_ROW, FAIL_MESSAGE, INSTRUCTION_ROW, LONG_PRESS_INSTRUCTION, MESSAGE_ROW,
    PASS_MESSAGE,
};
use crate::hw::{DisplaySink, Restart};
use crate::orchestrator::Verdict;
use crate::telemetry::{SelfTestEvent, TelemetrySink};
use crate::watchdog::{LongPressWatchdog, OneShotTimer};

/// Evidence that the operator acknowledged the verdict.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Acknowledgement {
    pub passed: bool,
}

/// Writes the verdict and the long-press instruction to the display. A
/// failing verdict also moves its stage diagnostic to [`DIAGNOSTIC_ROW`].
///
/// Boards without a working panel are left untouched.
pub fn render_verdict<D: DisplaySink + ?Sized>(display: &mut D, verdict: &Verdict) {
    if !display.is_present() {
        return;
    }

    if !verdict.passed {
        display.clear(DIAGNOSTIC_ROW);
        display.write_line(DIAGNOSTIC_ROW, &verdict.message);
    }
    display.clear(MESSAGE_ROW);
    display.write_line(
        MESSAGE_ROW,
        if verdict.passed {
            PASS_MESSAGE
        } else {
            FAIL_MESSAGE
        },
    );
    display.clear(INSTRUCTION_ROW);
    display.write_line(INSTRUCTION_ROW, LONG_PRESS_INSTRUCTION);
}

/// Waits for the long press, then clears the persisted self-test flag.
///
/// A long press published before this call is observed immediately.
pub async fn await_acknowledgement<T, S, R>(
    watchdog: &LongPressWatchdog<T>,
    verdict: &Verdict,
    config: &mut S,
    telemetry: &mut R,
    now: impl Fn() -> Duration,
) -> Acknowledgement
where
    T: OneShotTimer,
    S: ConfigStore + ?Sized,
    R: TelemetrySink + ?Sized,
{
    watchdog.wait_for_long_press().await;
    telemetry.record(now(), SelfTestEvent::LongPressAcknowledged);

    config.set_u16(ConfigKey::SelfTest, 0);
    Acknowledgement {
        passed: verdict.passed,
    }
}

/// Collaborators the terminal phase needs.
pub struct Terminal<'a, D: ?Sized, S: ?Sized, R: ?Sized, X: ?Sized> {
    pub display: &'a mut D,
    pub config: &'a mut S,
    pub telemetry: &'a mut R,
    pub restart: &'a mut X,
}

/// Renders `verdict`, waits for the operator and restarts.
///
/// The future never resolves: the restart primitive does not return.
pub async fn enter_terminal<T, D, S, R, X>(
    watchdog: &LongPressWatchdog<T>,
    verdict: Verdict,
    terminal: Terminal<'_, D, S, R, X>,
    now: impl Fn() -> Duration,
) -> Infallible
where
    T: OneShotTimer,
    D: DisplaySink + ?Sized,
    S: ConfigStore + ?Sized,
    R: TelemetrySink + ?Sized,
    X: Restart + ?Sized,
{
    let Terminal {
        display,
        config,
        telemetry,
        restart,
    } = terminal;

    render_verdict(display, &verdict);
    await_acknowledgement(watchdog, &verdict, config, telemetry, &now).await;

    telemetry.record(now(), SelfTestEvent::Restarting);
    restart.restart()
}
