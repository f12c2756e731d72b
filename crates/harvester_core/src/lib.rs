//! Harvester core: pure harvesting state, decisions and persisted record shapes.
mod backoff;
mod checkpoint;
mod msg;
mod policy;
mod registry;
mod state;
mod update;

pub use backoff::{Backoff, BackoffController, BackoffSettings, DelayKind};
pub use checkpoint::{Checkpoint, OutputRecord};
pub use msg::Msg;
pub use policy::{PolicyInput, RunStatus, StopReason, TerminationPolicy};
pub use registry::ItemRegistry;
pub use state::HarvestState;
pub use update::update;
