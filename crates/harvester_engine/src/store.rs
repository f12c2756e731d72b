use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use engine_logging::{engine_debug, engine_info, engine_warn};
use harvester_core::{Checkpoint, HarvestState, ItemRegistry, OutputRecord};

use crate::persist::{write_atomic, PersistError};

/// Produces the timestamp stamped into persisted records.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

/// Durable home of a run's checkpoint and its derived output record.
///
/// The checkpoint path is the run identity: two runs pointed at the same path resume
/// each other.
#[derive(Clone)]
pub struct CheckpointStore {
    checkpoint_path: PathBuf,
    output_path: PathBuf,
    clock: Clock,
}

impl CheckpointStore {
    pub fn new(checkpoint_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            checkpoint_path: checkpoint_path.into(),
            output_path: output_path.into(),
            clock: Arc::new(|| Utc::now().to_rfc3339()),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Load the last checkpoint. Missing or unreadable state means a fresh start.
    pub fn load(&self) -> Checkpoint {
        let path = &self.checkpoint_path;
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                engine_info!("No checkpoint at {:?}; starting fresh", path);
                return Checkpoint::default();
            }
            Err(err) => {
                engine_warn!("Failed to read checkpoint from {:?}: {}; starting fresh", path, err);
                return Checkpoint::default();
            }
        };

        match serde_json::from_str::<Checkpoint>(&content) {
            Ok(checkpoint) => {
                engine_info!(
                    "Resumed from checkpoint {:?}: position {}, {} items, {} consecutive with no new items",
                    path,
                    checkpoint.position,
                    checkpoint.items.len(),
                    checkpoint.consecutive_no_new
                );
                checkpoint
            }
            Err(err) => {
                engine_warn!("Failed to parse checkpoint from {:?}: {}; starting fresh", path, err);
                Checkpoint::default()
            }
        }
    }

    /// Write the checkpoint, then the output record derived from it.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), PersistError> {
        let content = serde_json::to_string_pretty(checkpoint)?;
        write_atomic(&self.checkpoint_path, &content)?;

        let output = OutputRecord::project(checkpoint, (self.clock)());
        let content = serde_json::to_string_pretty(&output)?;
        write_atomic(&self.output_path, &content)?;

        engine_debug!(
            "Saved checkpoint at position {} ({} items)",
            checkpoint.position,
            checkpoint.items.len()
        );
        Ok(())
    }

    /// Stamp and save the current loop state.
    pub fn save_progress(
        &self,
        state: &HarvestState,
        registry: &ItemRegistry,
    ) -> Result<Checkpoint, PersistError> {
        let checkpoint = state.checkpoint(registry, (self.clock)());
        self.save(&checkpoint)?;
        Ok(checkpoint)
    }
}
