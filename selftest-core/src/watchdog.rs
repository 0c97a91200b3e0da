//! Long-press detection for the BOOT button.
//!
//! The watchdog combines two asynchronous inputs, button edges and the expiry
//! of a single-shot timer, into one "long press" event. Both inputs arrive
//! from interrupt or timer-service context, so the handlers only touch the
//! atomic [`PressState`], start or stop the timer, and publish the signal.
//!
//! The signal is level-set: a long press that completes before anyone waits
//! is still observed by the next [`LongPressWatchdog::wait_for_long_press`].

use core::time::Duration;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicU8, Ordering};

/// Hold time that turns a press into a long press.
pub const LONG_PRESS_DURATION: Duration = Duration::from_millis(2_000);

/// Debounce state machine phases.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PressState {
    Idle,
    TimingPress,
    /// Terminal until the process restarts.
    LongPressFired,
}

impl PressState {
    const fn as_raw(self) -> u8 {
        match self {
            PressState::Idle => 0,
            PressState::TimingPress => 1,
            PressState::LongPressFired => 2,
        }
    }

    const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => PressState::TimingPress,
            2 => PressState::LongPressFired,
            _ => PressState::Idle,
        }
    }
}

/// Pin level sampled when an edge interrupt fires.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ButtonLevel {
    /// Pin pulled low: button held down.
    Pressed,
    Released,
}

impl ButtonLevel {
    /// Maps an active-low pin reading onto a button level.
    pub const fn from_active_low(pin_is_low: bool) -> Self {
        if pin_is_low {
            ButtonLevel::Pressed
        } else {
            ButtonLevel::Released
        }
    }
}

/// Single-shot software timer that calls back into
/// [`LongPressWatchdog::on_timer_expired`] when its period elapses.
///
/// Every method must be safe to call from interrupt context.
pub trait OneShotTimer {
    /// Arms the timer for its configured period.
    fn start(&self);

    /// Disarms the timer. Returns `true` if it was still armed, `false` if
    /// it had already fired and its expiry is on the way.
    fn stop(&self) -> bool;

    /// Returns `true` while the timer is armed and has not fired.
    fn is_active(&self) -> bool;
}

/// Effect of a single input on the state machine.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PressTransition {
    TimerStarted,
    /// Released before the timer fired.
    ShortPressIgnored,
    /// Released after the timer fired but before its expiry was handled.
    /// The press stays timed and the expiry still publishes.
    ExpiryPending,
    LongPressPublished,
    /// The input did not apply to the current state.
    Ignored,
}

/// Owned long-press detector shared between interrupt, timer and waiter contexts.
pub struct LongPressWatchdog<T> {
    state: AtomicU8,
    timer: T,
    long_press: Signal<CriticalSectionRawMutex, ()>,
}

impl<T: OneShotTimer> LongPressWatchdog<T> {
    /// Creates a watchdog in [`PressState::Idle`].
    pub const fn new(timer: T) -> Self {
        Self {
            state: AtomicU8::new(PressState::Idle.as_raw()),
            timer,
            long_press: Signal::new(),
        }
    }

    /// Current debounce state.
    pub fn state(&self) -> PressState {
        PressState::from_raw(self.state.load(Ordering::Acquire))
    }

    /// Timer driving this watchdog.
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Edge notification handler. Bounded and non-blocking.
    pub fn on_edge(&self, level: ButtonLevel) -> PressTransition {
        match level {
            ButtonLevel::Pressed => {
                if self.transition(PressState::Idle, PressState::TimingPress) {
                    self.timer.start();
                    PressTransition::TimerStarted
                } else {
                    PressTransition::Ignored
                }
            }
            ButtonLevel::Released => {
                if self.state() != PressState::TimingPress {
                    return PressTransition::Ignored;
                }
                if !self.timer.stop() {
                    return PressTransition::ExpiryPending;
                }
                if self.transition(PressState::TimingPress, PressState::Idle) {
                    PressTransition::ShortPressIgnored
                } else {
                    PressTransition::Ignored
                }
            }
        }
    }

    /// Timer expiry handler. Bounded and non-blocking.
    pub fn on_timer_expired(&self) -> PressTransition {
        if self.transition(PressState::TimingPress, PressState::LongPressFired) {
            self.long_press.signal(());
            PressTransition::LongPressPublished
        } else {
            PressTransition::Ignored
        }
    }

    /// Returns `true` when a long press has been published but not yet consumed.
    pub fn long_press_pending(&self) -> bool {
        self.long_press.signaled()
    }

    /// Waits, without timeout, until a long press has been published and
    /// consumes the signal.
    pub async fn wait_for_long_press(&self) {
        self.long_press.wait().await;
    }

    fn transition(&self, from: PressState, to: PressState) -> bool {
        self.state
            .compare_exchange(
                from.as_raw(),
                to.as_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portable_atomic::AtomicBool;

    struct FlagTimer {
        active: AtomicBool,
        starts: AtomicU8,
        stops: AtomicU8,
    }

    impl FlagTimer {
        const fn new() -> Self {
            Self {
                active: AtomicBool::new(false),
                starts: AtomicU8::new(0),
                stops: AtomicU8::new(0),
            }
        }

        fn fire(&self) -> bool {
            self.active.swap(false, Ordering::AcqRel)
        }
    }

    impl OneShotTimer for FlagTimer {
        fn start(&self) {
            self.starts.fetch_add(1, Ordering::Relaxed);
            self.active.store(true, Ordering::Release);
        }

        fn stop(&self) -> bool {
            self.stops.fetch_add(1, Ordering::Relaxed);
            self.active.swap(false, Ordering::AcqRel)
        }

        fn is_active(&self) -> bool {
            self.active.load(Ordering::Acquire)
        }
    }

    #[test]
    fn repeated_press_edges_start_one_timer() {
        let watchdog = LongPressWatchdog::new(FlagTimer::new());

        assert_eq!(
            watchdog.on_edge(ButtonLevel::Pressed),
            PressTransition::TimerStarted
        );
        assert_eq!(watchdog.on_edge(ButtonLevel::Pressed), PressTransition::Ignored);
        assert_eq!(watchdog.timer().starts.load(Ordering::Relaxed), 1);
        assert_eq!(watchdog.state(), PressState::TimingPress);
    }

    #[test]
    fn release_without_press_is_ignored() {
        let watchdog = LongPressWatchdog::new(FlagTimer::new());
        assert_eq!(
            watchdog.on_edge(ButtonLevel::Released),
            PressTransition::Ignored
        );
        assert_eq!(watchdog.timer().stops.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn expiry_after_release_is_discarded() {
        let watchdog = LongPressWatchdog::new(FlagTimer::new());
        watchdog.on_edge(ButtonLevel::Pressed);
        watchdog.on_edge(ButtonLevel::Released);

        assert_eq!(watchdog.on_timer_expired(), PressTransition::Ignored);
        assert!(!watchdog.long_press_pending());
        assert_eq!(watchdog.state(), PressState::Idle);
    }

    #[test]
    fn fired_state_ignores_further_edges() {
        let watchdog = LongPressWatchdog::new(FlagTimer::new());
        watchdog.on_edge(ButtonLevel::Pressed);
        assert!(watchdog.timer().fire());
        watchdog.on_timer_expired();

        assert_eq!(watchdog.on_edge(ButtonLevel::Released), PressTransition::Ignored);
        assert_eq!(watchdog.on_edge(ButtonLevel::Pressed), PressTransition::Ignored);
        assert_eq!(watchdog.state(), PressState::LongPressFired);
        assert_eq!(watchdog.timer().starts.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn release_after_timer_fired_keeps_press_timed() {
        let watchdog = LongPressWatchdog::new(FlagTimer::new());
        watchdog.on_edge(ButtonLevel::Pressed);
        assert!(watchdog.timer().fire());

        assert_eq!(
            watchdog.on_edge(ButtonLevel::Released),
            PressTransition::ExpiryPending
        );
        assert_eq!(watchdog.state(), PressState::TimingPress);
        assert_eq!(
            watchdog.on_timer_expired(),
            PressTransition::LongPressPublished
        );
        assert!(watchdog.long_press_pending());
    }

    #[test]
    fn active_low_pin_maps_to_pressed() {
        assert_eq!(ButtonLevel::from_active_low(true), ButtonLevel::Pressed);
        assert_eq!(ButtonLevel::from_active_low(false), ButtonLevel::Released);
    }
}
