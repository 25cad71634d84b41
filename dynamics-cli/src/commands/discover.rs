//! `tap-dynamics --discover`: print the catalog.

use std::io::{self, Write};

use anyhow::{Context, Result};
use dynamics_client::Service;

pub fn run(service: &dyn Service) -> Result<()> {
    let catalog = dynamics_sync::discover(service).context("discovery failed")?;

    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, &catalog).context("failed to write catalog")?;
    writeln!(out).context("failed to write catalog")?;
    out.flush().context("failed to write catalog")?;
    Ok(())
}
