//! Bookmark store: owns the run's replication state and commits it.
//!
//! Every mutation goes through [`StateManager`]; each mutation ends in a
//! [`StateManager::commit`], which emits the full state to the sink and,
//! when a checkpoint file is configured, rewrites that file atomically.

use std::path::PathBuf;

use dynamics_core::{state as state_file, ReplicationState, Watermark};

use crate::error::SyncError;
use crate::sink::{Message, Sink};

#[derive(Debug, Clone, Default)]
pub struct StateManager {
    state: ReplicationState,
    checkpoint: Option<PathBuf>,
}

impl StateManager {
    pub fn new(state: ReplicationState) -> Self {
        Self {
            state,
            checkpoint: None,
        }
    }

    /// Also persist every commit to `path`.
    pub fn with_checkpoint(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint = Some(path.into());
        self
    }

    pub fn state(&self) -> &ReplicationState {
        &self.state
    }

    pub fn into_state(self) -> ReplicationState {
        self.state
    }

    /// Stored watermark for `stream`, or `default`. No side effects.
    pub fn get_bookmark(&self, stream: &str, default: &Watermark) -> Watermark {
        let bookmark = self
            .state
            .bookmark(stream)
            .cloned()
            .unwrap_or_else(|| default.clone());
        tracing::debug!("bookmark for {stream}: {bookmark} (default {default})");
        bookmark
    }

    /// Insert or overwrite the watermark for `stream`, then commit.
    pub fn set_bookmark(
        &mut self,
        stream: &str,
        value: Watermark,
        sink: &mut dyn Sink,
    ) -> Result<(), SyncError> {
        self.state.bookmarks.insert(stream.to_string(), value);
        self.commit(sink)
    }

    /// Mark `stream` as mid-flight (or clear the marker with `None`), then commit.
    pub fn set_currently_syncing(
        &mut self,
        stream: Option<&str>,
        sink: &mut dyn Sink,
    ) -> Result<(), SyncError> {
        self.state.currently_syncing = stream.map(str::to_string);
        self.commit(sink)
    }

    /// Persist the entire state.
    pub fn commit(&self, sink: &mut dyn Sink) -> Result<(), SyncError> {
        sink.write_message(&Message::State {
            value: self.state.clone(),
        })?;
        if let Some(path) = &self.checkpoint {
            state_file::save_at(path, &self.state)?;
        }
        Ok(())
    }
}
