mod support;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use portable_atomic::Ordering;
use selftest_core::config::{ConfigKey, MemoryConfigStore};
use selftest_core::latch::{Terminal, await_acknowledgement, enter_terminal};
use selftest_core::orchestrator::Verdict;
use selftest_core::telemetry::{SelfTestEvent, TelemetryLog};
use selftest_core::watchdog::{
    ButtonLevel, LongPressWatchdog, PressState, PressTransition,
};

use support::{ManualTimer, PanicRestart, RecordingDisplay};

fn watchdog() -> LongPressWatchdog<ManualTimer> {
    LongPressWatchdog::new(ManualTimer::new())
}

/// Delivers the expiry only if the timer was still armed, like a real one-shot.
fn elapse(watchdog: &LongPressWatchdog<ManualTimer>) -> Option<PressTransition> {
    watchdog
        .timer()
        .elapse()
        .then(|| watchdog.on_timer_expired())
}

#[test]
fn short_press_never_signals() {
    let watchdog = watchdog();

    assert_eq!(
        watchdog.on_edge(ButtonLevel::Pressed),
        PressTransition::TimerStarted
    );
    assert_eq!(
        watchdog.on_edge(ButtonLevel::Released),
        PressTransition::ShortPressIgnored
    );
    assert_eq!(elapse(&watchdog), None);

    assert!(!watchdog.long_press_pending());
    assert_eq!(watchdog.state(), PressState::Idle);
    assert_eq!(watchdog.timer().stops.load(Ordering::Relaxed), 1);
}

#[test]
fn held_press_signals_once_even_when_released_after_expiry() {
    let watchdog = watchdog();

    watchdog.on_edge(ButtonLevel::Pressed);
    assert_eq!(elapse(&watchdog), Some(PressTransition::LongPressPublished));
    assert!(watchdog.long_press_pending());

    assert_eq!(
        watchdog.on_edge(ButtonLevel::Released),
        PressTransition::Ignored
    );
    assert_eq!(watchdog.on_timer_expired(), PressTransition::Ignored);
    assert_eq!(watchdog.state(), PressState::LongPressFired);
    assert_eq!(watchdog.timer().stops.load(Ordering::Relaxed), 0);

    embassy_futures::block_on(watchdog.wait_for_long_press());
    assert!(!watchdog.long_press_pending());
}

#[test]
fn release_between_timer_firing_and_its_expiry_still_publishes() {
    let watchdog = watchdog();
    watchdog.on_edge(ButtonLevel::Pressed);

    // The one-shot has fired; its callback has not run yet.
    assert!(watchdog.timer().elapse());
    assert_eq!(
        watchdog.on_edge(ButtonLevel::Released),
        PressTransition::ExpiryPending
    );
    assert_eq!(watchdog.state(), PressState::TimingPress);

    assert_eq!(
        watchdog.on_timer_expired(),
        PressTransition::LongPressPublished
    );
    assert_eq!(watchdog.state(), PressState::LongPressFired);
    assert!(watchdog.long_press_pending());
}

#[test]
fn consecutive_short_presses_return_to_idle() {
    let watchdog = watchdog();

    for _ in 0..2 {
        watchdog.on_edge(ButtonLevel::Pressed);
        assert_eq!(watchdog.state(), PressState::TimingPress);
        watchdog.on_edge(ButtonLevel::Released);
        assert_eq!(watchdog.state(), PressState::Idle);
    }

    assert_eq!(watchdog.timer().starts.load(Ordering::Relaxed), 2);
    assert!(!watchdog.long_press_pending());
}

#[test]
fn expiry_racing_a_release_has_one_winner() {
    let watchdog = watchdog();
    watchdog.on_edge(ButtonLevel::Pressed);

    // Timer callback wins; the late release is ignored.
    assert_eq!(
        watchdog.on_timer_expired(),
        PressTransition::LongPressPublished
    );
    assert_eq!(
        watchdog.on_edge(ButtonLevel::Released),
        PressTransition::Ignored
    );
    assert!(watchdog.long_press_pending());
}

#[test]
fn long_press_before_terminal_wait_is_not_lost() {
    let watchdog = watchdog();
    watchdog.on_edge(ButtonLevel::Pressed);
    elapse(&watchdog);

    let mut config = MemoryConfigStore::new().with(ConfigKey::SelfTest, 1);
    let mut log = TelemetryLog::<16>::new();
    let ack = embassy_futures::block_on(await_acknowledgement(
        &watchdog,
        &Verdict::pass(),
        &mut config,
        &mut log,
        || Duration::from_secs(5),
    ));

    assert!(ack.passed);
    assert_eq!(config.get(ConfigKey::SelfTest), Some(0));
}

#[test]
fn terminal_phase_clears_flag_then_restarts() {
    let watchdog = watchdog();
    watchdog.on_edge(ButtonLevel::Pressed);
    elapse(&watchdog);

    let mut display = RecordingDisplay::default();
    selftest_core::hw::DisplaySink::initialize(&mut display);
    let mut config = MemoryConfigStore::new().with(ConfigKey::SelfTest, 1);
    let mut log = TelemetryLog::<16>::new();
    let mut restart = PanicRestart;

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        embassy_futures::block_on(enter_terminal(
            &watchdog,
            Verdict::pass(),
            Terminal {
                display: &mut display,
                config: &mut config,
                telemetry: &mut log,
                restart: &mut restart,
            },
            || Duration::ZERO,
        ))
    }));

    assert!(outcome.is_err());
    assert_eq!(config.get(ConfigKey::SelfTest), Some(0));
    assert_eq!(display.rows[2].as_str(), "TESTS PASS!");
    assert_eq!(display.rows[3].as_str(), "LONG PRESS BOOT");

    let events: Vec<SelfTestEvent> = log.oldest_first().map(|record| record.event).collect();
    assert_eq!(
        events,
        [SelfTestEvent::LongPressAcknowledged, SelfTestEvent::Restarting]
    );
}
