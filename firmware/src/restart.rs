//! Restart primitive for Cortex-M targets.

use selftest_core::hw::Restart;

/// Requests a system reset through the SCB.
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemReset;

impl Restart for SystemReset {
    fn restart(&mut self) -> ! {
        defmt::info!("self-test: restarting");
        cortex_m::peripheral::SCB::sys_reset()
    }
}
