//! Stream sync driver: one catalog stream from schema to final bookmark.
//!
//! ## `sync_stream`: per-stream protocol
//!
//! 1. Read the stream's bookmark (start date when absent).
//! 2. Resolve the entity descriptor and pick the replication mode.
//! 3. Emit the stream's `SCHEMA` message.
//! 4. Build the query: `<field> ge <bookmark>` ordered ascending, or a plain
//!    read in full mode.
//! 5. Resolve option-set labels once.
//! 6. For each row: normalize, track the watermark, conform, emit.
//! 7. Write the final watermark, even when no row was read.

use std::collections::BTreeSet;
use std::fmt;

use dynamics_client::{Direction, EntityType, Query, Service, CREATED_ON, MODIFIED_ON};
use dynamics_core::{CatalogEntry, Watermark};

use crate::error::SyncError;
use crate::labels::resolve_optionset_map;
use crate::metrics::RecordCounter;
use crate::normalize::{normalize_entity, WatermarkTracker};
use crate::sink::{Message, Sink};
use crate::state::StateManager;
use crate::transform::conform;

// ---------------------------------------------------------------------------
// Replication mode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationMode {
    /// Filter and order on `field`, tracking its maximum.
    Incremental { field: String },
    /// Read everything; the bookmark never moves.
    Full,
}

impl ReplicationMode {
    pub fn replication_field(&self) -> Option<&str> {
        match self {
            ReplicationMode::Incremental { field } => Some(field),
            ReplicationMode::Full => None,
        }
    }
}

impl fmt::Display for ReplicationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicationMode::Incremental { field } => write!(f, "incremental on {field}"),
            ReplicationMode::Full => write!(f, "full table"),
        }
    }
}

/// `modifiedon` if the entity has it, else `createdon`, else full.
pub fn determine_mode(entity: &EntityType) -> ReplicationMode {
    [MODIFIED_ON, CREATED_ON]
        .into_iter()
        .find(|field| entity.has_property(field))
        .map(|field| ReplicationMode::Incremental {
            field: field.to_string(),
        })
        .unwrap_or(ReplicationMode::Full)
}

/// Query for one run of `entity` in `mode`, bounded below by `since`.
pub fn build_query(
    entity: &EntityType,
    mode: &ReplicationMode,
    since: &Watermark,
) -> Result<Query, SyncError> {
    let query = Query::new(entity.entity_set.as_str()).select(entity.property_names());
    match mode {
        ReplicationMode::Full => Ok(query),
        ReplicationMode::Incremental { field } => {
            let instant = since.instant().ok_or_else(|| SyncError::InvalidWatermark {
                stream: entity.entity_set.clone(),
                value: since.to_string(),
            })?;
            Ok(query
                .filter_ge(field.as_str(), instant)
                .order_by(field.as_str(), Direction::Asc))
        }
    }
}

// ---------------------------------------------------------------------------
// sync_stream
// ---------------------------------------------------------------------------

/// Outcome of one stream run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSummary {
    pub stream: String,
    pub mode: ReplicationMode,
    pub records: u64,
    pub missing_labels: u64,
    /// Bookmark written at the end of the run.
    pub watermark: Watermark,
}

/// Sync one stream and commit its bookmark.
///
/// Any query, transport, schema or persistence failure aborts the stream
/// before its bookmark is written.
pub fn sync_stream(
    service: &dyn Service,
    state: &mut StateManager,
    sink: &mut dyn Sink,
    entry: &CatalogEntry,
    start_date: &Watermark,
) -> Result<StreamSummary, SyncError> {
    let stream = entry.tap_stream_id.as_str();

    // Steps 1-2: bookmark, descriptor, mode.
    let bookmark = state.get_bookmark(stream, start_date);
    let entity = service.entity_type(stream)?;
    let mode = determine_mode(&entity);
    tracing::info!("{stream}: syncing ({mode}) from {bookmark}");

    // Step 3: schema precedes every record.
    sink.write_message(&Message::Schema {
        stream: stream.to_string(),
        schema: entry.schema.clone(),
        key_properties: entry.key_properties.clone(),
        bookmark_properties: mode.replication_field().map(str::to_string).into_iter().collect(),
    })?;

    // Steps 4-5.
    let query = build_query(&entity, &mode, &bookmark)?;
    let optionsets = resolve_optionset_map(service, &entity)?;
    let mdata = entry.metadata_map();

    // Step 6.
    let mut tracker = WatermarkTracker::new(
        mode.replication_field().map(str::to_string),
        bookmark.clone(),
    );
    let mut counter = RecordCounter::new(stream);
    let mut missing_labels = 0u64;
    let mut removed = BTreeSet::new();

    for row in service.query(query)? {
        let row = row?;
        let normalized = normalize_entity(&row, &entity, &optionsets);
        missing_labels += normalized.missing_labels.len() as u64;
        tracker.observe(&normalized.record);

        let conformed = conform(stream, normalized.record, &entry.schema, &mdata)?;
        removed.extend(conformed.removed);
        sink.write_message(&Message::Record {
            stream: stream.to_string(),
            record: conformed.record,
        })?;
        counter.increment();
    }

    let records = counter.finish();
    if !removed.is_empty() {
        tracing::debug!(
            "{stream}: removed fields not selected or not in schema: {}",
            removed.into_iter().collect::<Vec<_>>().join(", ")
        );
    }

    // Step 7.
    let watermark = tracker.into_watermark();
    state.set_bookmark(stream, watermark.clone(), sink)?;
    tracing::info!("{stream}: {records} record(s), bookmark {watermark}");

    Ok(StreamSummary {
        stream: stream.to_string(),
        mode,
        records,
        missing_labels,
        watermark,
    })
}
