//! Sync orchestration over every selected stream.

use dynamics_client::Service;
use dynamics_core::{Catalog, CatalogEntry, Watermark};

use crate::discover::discover;
use crate::driver::{sync_stream, StreamSummary};
use crate::error::SyncError;
use crate::sink::Sink;
use crate::state::StateManager;

/// Outcome of a whole run, one summary per stream in sync order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub streams: Vec<StreamSummary>,
}

impl SyncSummary {
    pub fn total_records(&self) -> u64 {
        self.streams.iter().map(|s| s.records).sum()
    }
}

/// Sync every selected stream, one at a time.
///
/// Without a catalog every discovered stream is synced. With one, only its
/// selected streams are, starting from an interrupted `currently_syncing`
/// stream if there is one. The marker names each stream while it runs and
/// is cleared once all of them have finished.
pub fn sync(
    service: &dyn Service,
    catalog: Option<&Catalog>,
    state: &mut StateManager,
    sink: &mut dyn Sink,
    start_date: &Watermark,
) -> Result<SyncSummary, SyncError> {
    let discovered;
    let streams: Vec<&CatalogEntry> = match catalog {
        Some(catalog) => catalog.selected_streams(state.state()),
        None => {
            tracing::info!("no catalog given; syncing every discovered stream");
            discovered = discover(service)?;
            discovered.streams.iter().collect()
        }
    };

    tracing::info!("{} stream(s) selected", streams.len());
    let mut summary = SyncSummary::default();

    for entry in streams {
        state.set_currently_syncing(Some(entry.tap_stream_id.as_str()), sink)?;
        let stream_summary = sync_stream(service, state, sink, entry, start_date)?;
        summary.streams.push(stream_summary);
    }

    state.set_currently_syncing(None, sink)?;
    tracing::info!(
        "sync finished: {} stream(s), {} record(s)",
        summary.streams.len(),
        summary.total_records()
    );
    Ok(summary)
}
