use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Durable, resumable harvesting progress.
///
/// Unknown fields are ignored and missing ones default, so files written by
/// older or newer builds still load. The aliases accept progress files
/// produced by the earlier scripted harvester.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Checkpoint {
    #[serde(alias = "clicks_performed")]
    pub position: u64,
    #[serde(alias = "property_links")]
    pub items: BTreeSet<String>,
    pub consecutive_no_new: u32,
    pub failed_positions: Vec<u64>,
    #[serde(alias = "last_update")]
    pub last_updated: Option<String>,
}

impl Checkpoint {
    pub fn is_fresh(&self) -> bool {
        self.position == 0 && self.items.is_empty()
    }
}

/// Output file contents, derived from a checkpoint on every save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRecord {
    pub total_items: usize,
    pub actions_performed: u64,
    pub harvested_at: String,
    pub items: Vec<String>,
}

impl OutputRecord {
    pub fn project(checkpoint: &Checkpoint, harvested_at: impl Into<String>) -> Self {
        Self {
            total_items: checkpoint.items.len(),
            actions_performed: checkpoint.position,
            harvested_at: harvested_at.into(),
            items: checkpoint.items.iter().cloned().collect(),
        }
    }
}
