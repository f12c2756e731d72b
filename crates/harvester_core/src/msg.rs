use crate::StopReason;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// An advance step succeeded and its content was merged into the registry.
    StepHarvested { new_items: usize },
    /// The advance for the next position exhausted its attempts.
    StepFailed,
    /// The termination policy (or the loop) decided the run is over.
    Stop(StopReason),
}
