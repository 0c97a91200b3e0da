//! Target runtime glue: critical sections, RTT logging and fault handlers.

use core::panic::PanicInfo;

use cortex_m::interrupt;
use cortex_m::register::primask;
use cortex_m_rt::{ExceptionFrame, exception};
use critical_section::RawRestoreState;
use defmt_rtt as _;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    defmt::error!("PANIC: {}", defmt::Display2Format(info));
    cortex_m::asm::udf();
}

#[exception]
unsafe fn HardFault(frame: &ExceptionFrame) -> ! {
    defmt::error!("hard fault at pc={=u32:#010x}", frame.pc());
    cortex_m::peripheral::SCB::sys_reset()
}
