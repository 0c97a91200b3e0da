//! BOOT button edge task.

use embassy_stm32::exti::ExtiInput;
use selftest_core::watchdog::ButtonLevel;

use crate::timer::FirmwareWatchdog;

/// Forwards every edge on the BOOT button to the watchdog.
///
/// The pin is active-low with the internal pull-up enabled.
#[embassy_executor::task]
pub async fn run(mut button: ExtiInput<'static>, watchdog: &'static FirmwareWatchdog) -> ! {
    loop {
        button.wait_for_any_edge().await;
        let level = ButtonLevel::from_active_low(button.is_low());
        watchdog.on_edge(level);
    }
}
