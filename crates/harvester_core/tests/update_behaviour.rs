use std::sync::Once;

use harvester_core::{update, HarvestState, Msg, RunStatus, StopReason};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn harvest(state: HarvestState, new_counts: &[usize]) -> HarvestState {
    new_counts.iter().fold(state, |state, &new_items| {
        update(state, Msg::StepHarvested { new_items })
    })
}

#[test]
fn step_with_new_items_advances_and_resets_counter() {
    init_logging();
    let state = harvest(HarvestState::new(), &[0, 0]);
    assert_eq!(state.position(), 2);
    assert_eq!(state.consecutive_no_new(), 2);

    let state = update(state, Msg::StepHarvested { new_items: 3 });
    assert_eq!(state.position(), 3);
    assert_eq!(state.consecutive_no_new(), 0);
}

#[test]
fn update_returns_a_new_state_and_leaves_the_input_alone() {
    init_logging();
    let before = harvest(HarvestState::new(), &[4]);
    let after = update(before.clone(), Msg::StepHarvested { new_items: 0 });

    assert_eq!(before.position(), 1);
    assert_eq!(before.consecutive_no_new(), 0);
    assert_eq!(after.position(), 2);
    assert_eq!(after.consecutive_no_new(), 1);
}

#[test]
fn step_failure_records_attempted_position_without_advancing() {
    init_logging();
    let state = harvest(HarvestState::new(), &[1, 1, 1]);
    let state = update(state, Msg::StepFailed);

    assert_eq!(state.position(), 3);
    assert_eq!(state.failed_positions(), &[4]);
    assert_eq!(state.status(), RunStatus::Running);
}

#[test]
fn position_is_monotonic_under_mixed_messages() {
    init_logging();
    let msgs = vec![
        Msg::StepHarvested { new_items: 2 },
        Msg::StepFailed,
        Msg::StepHarvested { new_items: 0 },
        Msg::StepFailed,
        Msg::StepHarvested { new_items: 1 },
        Msg::Stop(StopReason::Cancelled),
    ];

    let mut state = HarvestState::new();
    let mut last_position = state.position();
    for msg in msgs {
        state = update(state, msg);
        assert!(state.position() >= last_position);
        last_position = state.position();
    }
    assert_eq!(state.position(), 3);
    assert_eq!(state.failed_positions(), &[2, 3]);
}

#[test]
fn stop_is_terminal_and_keeps_first_reason() {
    init_logging();
    let state = update(HarvestState::new(), Msg::Stop(StopReason::Exhausted));
    assert_eq!(state.status(), RunStatus::Stopped(StopReason::Exhausted));

    let state = update(state, Msg::Stop(StopReason::Cancelled));
    assert_eq!(state.status(), RunStatus::Stopped(StopReason::Exhausted));
    assert_eq!(state.status().reason(), Some(StopReason::Exhausted));
}
