use std::time::Duration;

use harvester_core::{PolicyInput, RunStatus, StopReason, TerminationPolicy};

fn policy() -> TerminationPolicy {
    TerminationPolicy {
        max_steps: 100,
        max_consecutive_no_new: 5,
        max_runtime: Duration::from_secs(60),
    }
}

fn input() -> PolicyInput {
    PolicyInput {
        steps: 10,
        consecutive_no_new: 0,
        elapsed: Duration::from_secs(1),
        cancelled: false,
    }
}

#[test]
fn continues_when_nothing_matches() {
    assert_eq!(policy().should_stop(&input()), None);
}

#[test]
fn cancellation_takes_precedence_over_exhaustion() {
    let state = PolicyInput {
        cancelled: true,
        consecutive_no_new: 5,
        ..input()
    };
    assert_eq!(policy().should_stop(&state), Some(StopReason::Cancelled));
}

#[test]
fn runtime_only_trips_once_strictly_exceeded() {
    let at_limit = PolicyInput {
        elapsed: Duration::from_secs(60),
        ..input()
    };
    assert_eq!(policy().should_stop(&at_limit), None);

    let over = PolicyInput {
        elapsed: Duration::from_secs(61),
        steps: 100,
        ..input()
    };
    assert_eq!(policy().should_stop(&over), Some(StopReason::RuntimeExceeded));
}

#[test]
fn exhaustion_trips_at_the_ceiling() {
    let below = PolicyInput {
        consecutive_no_new: 4,
        ..input()
    };
    assert_eq!(policy().should_stop(&below), None);

    let at = PolicyInput {
        consecutive_no_new: 5,
        steps: 100,
        ..input()
    };
    assert_eq!(policy().should_stop(&at), Some(StopReason::Exhausted));
}

#[test]
fn target_reached_at_max_steps() {
    let at = PolicyInput {
        steps: 100,
        ..input()
    };
    assert_eq!(policy().should_stop(&at), Some(StopReason::TargetReached));
}

#[test]
fn stopped_status_never_returns_to_running() {
    let status = RunStatus::Running.stop(StopReason::TargetReached);
    assert!(status.is_stopped());
    assert_eq!(
        status.stop(StopReason::Cancelled),
        RunStatus::Stopped(StopReason::TargetReached)
    );
}
