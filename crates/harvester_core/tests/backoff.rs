use std::time::Duration;

use harvester_core::{Backoff, BackoffController, BackoffSettings, DelayKind};

#[test]
fn normal_delay_stays_inside_window() {
    let controller = BackoffController::new(BackoffSettings {
        normal_min: Duration::from_millis(100),
        normal_max: Duration::from_millis(200),
        ..BackoffSettings::default()
    });
    for _ in 0..200 {
        let delay = controller.next_delay(DelayKind::Normal);
        assert!(delay >= Duration::from_millis(100), "{delay:?}");
        assert!(delay <= Duration::from_millis(200), "{delay:?}");
    }
}

#[test]
fn fast_forward_uses_its_own_window() {
    let controller = BackoffController::new(BackoffSettings {
        fast_forward_min: Duration::from_millis(10),
        fast_forward_max: Duration::from_millis(20),
        ..BackoffSettings::default()
    });
    for _ in 0..50 {
        let delay = controller.next_delay(DelayKind::FastForward);
        assert!(delay >= Duration::from_millis(10) && delay <= Duration::from_millis(20));
    }
}

#[test]
fn failure_delays_are_fixed() {
    let controller = BackoffController::default();
    assert_eq!(
        controller.next_delay(DelayKind::ServerOverload),
        Duration::from_secs(10)
    );
    assert_eq!(
        controller.next_delay(DelayKind::TransientError),
        Duration::from_secs(2)
    );
}

#[test]
fn degenerate_window_returns_minimum() {
    let controller = BackoffController::new(BackoffSettings {
        normal_min: Duration::from_secs(3),
        normal_max: Duration::from_secs(1),
        ..BackoffSettings::default()
    });
    assert_eq!(controller.next_delay(DelayKind::Normal), Duration::from_secs(3));
}

#[test]
fn immediate_settings_never_wait() {
    let controller = BackoffController::new(BackoffSettings::immediate());
    for kind in [
        DelayKind::Normal,
        DelayKind::FastForward,
        DelayKind::ServerOverload,
        DelayKind::TransientError,
    ] {
        assert_eq!(controller.next_delay(kind), Duration::ZERO);
    }
}
