//! Terminal phase on a background thread.

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, JoinHandle, Thread};

use selftest_core::config::MemoryConfigStore;
use selftest_core::hw::Clock;
use selftest_core::latch::{Terminal, enter_terminal};
use selftest_core::orchestrator::Verdict;

use crate::bench::HostClock;
use crate::console::{ConsoleDisplay, ConsoleTelemetry, ProcessRestart};
use crate::timer::WATCHDOG;

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }

    fn wake_by_ref(self: &Arc<Self>) {
        self.0.unpark();
    }
}

/// Drives `future` on the calling thread, parking between polls.
pub fn park_on<F: Future>(future: F) -> F::Output {
    let mut future = pin!(future);
    let waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
    let mut cx = Context::from_waker(&waker);

    loop {
        if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
            return output;
        }
        thread::park();
    }
}

/// Everything the terminal phase owns once the pipeline is done.
pub struct TerminalState {
    pub verdict: Verdict,
    pub display: ConsoleDisplay,
    pub config: MemoryConfigStore,
    pub telemetry: ConsoleTelemetry,
    pub clock: HostClock,
}

/// Shows the verdict and waits for the long press. The process exits on
/// acknowledgement.
pub fn spawn(state: TerminalState) -> JoinHandle<()> {
    thread::spawn(move || {
        let TerminalState {
            verdict,
            mut display,
            mut config,
            mut telemetry,
            clock,
        } = state;
        let mut restart = ProcessRestart;

        match park_on(enter_terminal(
            &WATCHDOG,
            verdict,
            Terminal {
                display: &mut display,
                config: &mut config,
                telemetry: &mut telemetry,
                restart: &mut restart,
            },
            || clock.now(),
        )) {}
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn park_on_resumes_after_wake() {
        let signal = Arc::new(
            embassy_sync::signal::Signal::<
                embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex,
                u8,
            >::new(),
        );
        let sender = Arc::clone(&signal);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            sender.signal(7);
        });

        assert_eq!(park_on(signal.wait()), 7);
        handle.join().unwrap();
    }
}
