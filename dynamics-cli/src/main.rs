//! tap-dynamics: Singer tap for Dynamics 365 / Dataverse.
//!
//! # Usage
//!
//! ```text
//! tap-dynamics --config <FILE> --discover
//! tap-dynamics --config <FILE> [--catalog <FILE> | --properties <FILE>]
//!              [--state <FILE>] [--state-output <FILE>]
//! ```
//!
//! Singer messages go to stdout; logs go to stderr, filtered by `RUST_LOG`.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use commands::sync::SyncArgs;
use dynamics_client::WebApiService;
use dynamics_core::Config;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "tap-dynamics",
    version,
    about = "Extract Dynamics 365 entity sets as Singer messages",
    long_about = None,
)]
struct Cli {
    /// Tap configuration (JSON, or YAML by extension).
    #[arg(long, value_name = "FILE")]
    config: PathBuf,

    /// Print the discovered catalog and exit.
    #[arg(long)]
    discover: bool,

    #[command(flatten)]
    sync: SyncArgs,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    let service = WebApiService::new(&config).context("failed to set up the Web API client")?;

    if cli.discover {
        commands::discover::run(&service)
    } else {
        cli.sync.run(&config, &service)
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
