//! Long-press timer for the host.
//!
//! Each start spawns a sleeper thread tagged with a generation number. A stop
//! or re-arm bumps the generation so stale sleepers deliver nothing.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use selftest_core::watchdog::{LONG_PRESS_DURATION, LongPressWatchdog, OneShotTimer};

/// [`OneShotTimer`] backed by sleeping std threads.
#[derive(Debug)]
pub struct ThreadTimer {
    period: Duration,
    generation: AtomicU64,
    active: AtomicBool,
    on_expire: fn(u64),
}

impl ThreadTimer {
    /// `on_expire` runs on the sleeper thread with the generation it was armed under.
    pub const fn new(period: Duration, on_expire: fn(u64)) -> Self {
        Self {
            period,
            generation: AtomicU64::new(0),
            active: AtomicBool::new(false),
            on_expire,
        }
    }

    /// Consumes the expiry for `generation`. Returns `false` if the timer was
    /// stopped or re-armed since.
    pub fn expire(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
            && self.active.swap(false, Ordering::AcqRel)
    }

    fn arm(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.active.store(true, Ordering::Release);
        generation
    }
}

impl OneShotTimer for ThreadTimer {
    fn start(&self) {
        let generation = self.arm();
        let period = self.period;
        let on_expire = self.on_expire;
        thread::spawn(move || {
            thread::sleep(period);
            on_expire(generation);
        });
    }

    fn stop(&self) -> bool {
        let cancelled = self.active.swap(false, Ordering::AcqRel);
        self.generation.fetch_add(1, Ordering::AcqRel);
        cancelled
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}

/// Long-press detector for the emulated BOOT button.
pub static WATCHDOG: LongPressWatchdog<ThreadTimer> =
    LongPressWatchdog::new(ThreadTimer::new(LONG_PRESS_DURATION, deliver_expiry));

fn deliver_expiry(generation: u64) {
    deliver(&WATCHDOG, generation);
}

fn deliver(watchdog: &LongPressWatchdog<ThreadTimer>, generation: u64) {
    if watchdog.timer().expire(generation) {
        watchdog.on_timer_expired();
    }
}
