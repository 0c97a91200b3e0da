//! One-shot software timer backing the long-press watchdog.
//!
//! The button handler arms and disarms the timer from interrupt context by
//! posting a [`TimerCommand`]; the actual waiting happens in
//! [`run_one_shot_service`], which races an Embassy [`Timer`] against the
//! next command.

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Timer};
use portable_atomic::{AtomicBool, Ordering};
use selftest_core::watchdog::{LONG_PRESS_DURATION, LongPressWatchdog, OneShotTimer};

use crate::clock::to_embassy;

/// Requests posted to the timer service.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TimerCommand {
    Start,
    Stop,
}

/// [`OneShotTimer`] driven by [`run_one_shot_service`].
pub struct EmbassyOneShot {
    commands: Signal<CriticalSectionRawMutex, TimerCommand>,
    active: AtomicBool,
}

impl EmbassyOneShot {
    pub const fn new() -> Self {
        Self {
            commands: Signal::new(),
            active: AtomicBool::new(false),
        }
    }

    async fn next_command(&self) -> TimerCommand {
        self.commands.wait().await
    }
}

impl Default for EmbassyOneShot {
    fn default() -> Self {
        Self::new()
    }
}

impl OneShotTimer for EmbassyOneShot {
    fn start(&self) {
        self.active.store(true, Ordering::Release);
        self.commands.signal(TimerCommand::Start);
    }

    fn stop(&self) -> bool {
        let cancelled = self.active.swap(false, Ordering::AcqRel);
        self.commands.signal(TimerCommand::Stop);
        cancelled
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

pub type FirmwareWatchdog = LongPressWatchdog<EmbassyOneShot>;

/// Process-wide long-press detector for the BOOT button.
pub static LONG_PRESS: FirmwareWatchdog = LongPressWatchdog::new(EmbassyOneShot::new());

/// Timer service loop. Calls [`LongPressWatchdog::on_timer_expired`] whenever
/// an armed period elapses without a stop.
pub async fn run_one_shot_service(watchdog: &FirmwareWatchdog) -> ! {
    serve(watchdog, to_embassy(LONG_PRESS_DURATION)).await
}

async fn serve(watchdog: &FirmwareWatchdog, period: Duration) -> ! {
    let timer = watchdog.timer();

    loop {
        if timer.next_command().await == TimerCommand::Stop {
            continue;
        }

        loop {
            match select(Timer::after(period), timer.next_command()).await {
                Either::First(()) => {
                    // A stop that claimed the flag first has cancelled this expiry.
                    if timer.active.swap(false, Ordering::AcqRel) {
                        watchdog.on_timer_expired();
                    }
                    break;
                }
                // Re-arming restarts the period.
                Either::Second(TimerCommand::Start) => {}
                Either::Second(TimerCommand::Stop) => break,
            }
        }
    }
}

#[cfg(target_os = "none")]
#[embassy_executor::task]
pub async fn one_shot_task(watchdog: &'static FirmwareWatchdog) -> ! {
    run_one_shot_service(watchdog).await
}
