use crate::{Checkpoint, ItemRegistry, PolicyInput, RunStatus};
use std::time::Duration;

/// Loop counters threaded through the harvest loop by value.
///
/// Only [`crate::update`] produces new states; nothing mutates one in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HarvestState {
    pub(crate) position: u64,
    pub(crate) consecutive_no_new: u32,
    pub(crate) failed_positions: Vec<u64>,
    pub(crate) status: RunStatus,
}

impl HarvestState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the counters recorded in a checkpoint. The run status always starts as running.
    pub fn from_checkpoint(checkpoint: &Checkpoint) -> Self {
        Self {
            position: checkpoint.position,
            consecutive_no_new: checkpoint.consecutive_no_new,
            failed_positions: checkpoint.failed_positions.clone(),
            status: RunStatus::Running,
        }
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn consecutive_no_new(&self) -> u32 {
        self.consecutive_no_new
    }

    pub fn failed_positions(&self) -> &[u64] {
        &self.failed_positions
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn policy_input(&self, elapsed: Duration, cancelled: bool) -> PolicyInput {
        PolicyInput {
            steps: self.position,
            consecutive_no_new: self.consecutive_no_new,
            elapsed,
            cancelled,
        }
    }

    /// Snapshot of the counters plus the registry contents, ready to persist.
    pub fn checkpoint(&self, registry: &ItemRegistry, last_updated: impl Into<String>) -> Checkpoint {
        Checkpoint {
            position: self.position,
            items: registry.items().clone(),
            consecutive_no_new: self.consecutive_no_new,
            failed_positions: self.failed_positions.clone(),
            last_updated: Some(last_updated.into()),
        }
    }
}
