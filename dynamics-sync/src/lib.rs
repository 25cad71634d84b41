//! # dynamics-sync
//!
//! Incremental extraction of entity sets as Singer messages.
//!
//! Call [`sync`] to run every selected stream, [`sync_stream`] for a single
//! catalog entry, or [`discover`] to build a catalog.

pub mod discover;
pub mod driver;
pub mod error;
pub mod labels;
pub mod metrics;
pub mod normalize;
pub mod orchestrator;
pub mod sink;
pub mod state;
pub mod transform;

pub use discover::{catalog_entry, discover};
pub use driver::{determine_mode, sync_stream, ReplicationMode, StreamSummary};
pub use error::SyncError;
pub use labels::label_field_name;
pub use normalize::{normalize_entity, repair_null_strings, MissingLabel, NormalizedRecord};
pub use orchestrator::{sync, SyncSummary};
pub use sink::{JsonLinesSink, MemorySink, Message, Sink};
pub use state::StateManager;
