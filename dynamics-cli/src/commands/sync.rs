//! Default mode: sync selected streams to stdout.

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use dynamics_client::Service;
use dynamics_core::{state as state_file, Catalog, Config, ReplicationState};
use dynamics_sync::{JsonLinesSink, StateManager};

/// Arguments for a sync run.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Catalog selecting streams and fields. Without one, every stream is synced.
    #[arg(long, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    /// Legacy name for `--catalog`.
    #[arg(long, value_name = "FILE", conflicts_with = "catalog")]
    pub properties: Option<PathBuf>,

    /// State from a previous run.
    #[arg(long, value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Also write every state checkpoint to this file.
    #[arg(long, value_name = "FILE")]
    pub state_output: Option<PathBuf>,
}

impl SyncArgs {
    pub fn run(self, config: &Config, service: &dyn Service) -> Result<()> {
        let catalog = match self.catalog.as_ref().or(self.properties.as_ref()) {
            Some(path) => Some(
                Catalog::load_at(path)
                    .with_context(|| format!("failed to load catalog {}", path.display()))?,
            ),
            None => None,
        };

        let initial = match &self.state {
            Some(path) => state_file::load_at(path)
                .with_context(|| format!("failed to load state {}", path.display()))?,
            None => ReplicationState::default(),
        };
        let mut state = StateManager::new(initial);
        if let Some(path) = self.state_output {
            state = state.with_checkpoint(path);
        }

        let mut sink = JsonLinesSink::new(BufWriter::new(io::stdout().lock()));
        let summary = dynamics_sync::sync(
            service,
            catalog.as_ref(),
            &mut state,
            &mut sink,
            &config.start_watermark(),
        )
        .context("sync failed")?;
        sink.into_inner()
            .flush()
            .context("failed to flush stdout")?;

        for stream in &summary.streams {
            tracing::info!(
                stream = %stream.stream,
                mode = %stream.mode,
                records = stream.records,
                missing_labels = stream.missing_labels,
                watermark = %stream.watermark,
                "stream complete"
            );
        }
        Ok(())
    }
}
