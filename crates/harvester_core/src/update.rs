use crate::{HarvestState, Msg};

/// Pure update function: applies a message to the harvest state and returns the next state.
pub fn update(state: HarvestState, msg: Msg) -> HarvestState {
    match msg {
        Msg::StepHarvested { new_items } => {
            let consecutive_no_new = if new_items == 0 {
                state.consecutive_no_new().saturating_add(1)
            } else {
                0
            };
            HarvestState {
                position: state.position() + 1,
                consecutive_no_new,
                ..state
            }
        }
        Msg::StepFailed => {
            let mut failed_positions = state.failed_positions().to_vec();
            failed_positions.push(state.position() + 1);
            HarvestState {
                failed_positions,
                ..state
            }
        }
        Msg::Stop(reason) => HarvestState {
            status: state.status().stop(reason),
            ..state
        },
    }
}
