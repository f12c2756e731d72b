//! Harvester engine: persistence, collaborators and the resumable harvest loop.
mod decode;
mod extract;
mod fetch;
mod harvest;
mod persist;
mod source;
mod store;
mod types;

pub use decode::decode_page;
pub use extract::{canonical_item_url, LinkPatternExtractor, StructuredDataExtractor};
pub use fetch::{FetchSettings, PagedHttpAdvancer, Paging};
pub use harvest::{HarvestSettings, Harvester};
pub use persist::{ensure_output_dir, write_atomic, PersistError};
pub use source::{Advancer, Extractor, Page, PageBuffer};
pub use store::{CheckpointStore, Clock};
pub use types::{AdvanceError, FailureKind, HarvestError, RunOutcome, RunSummary};
