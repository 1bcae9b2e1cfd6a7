//! `holmes`: administer a Holmes review store from the command line.
//!
//! Reads `holmes.toml` (or the path given with `--config`), opens the SQLite
//! store and runs one boundary operation. Results are printed to stdout as
//! JSON; logs go to stderr.
//!
//! # Usage
//!
//! ```text
//! holmes page add example.com http://example.com/
//! holmes review submit <page-uuid> '{"facts": [], "violations": []}'
//! holmes review last --limit 5
//! RUST_LOG=debug holmes limiter list
//! ```

mod commands;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use holmes_core::limiter::MemoryCounter;
use holmes_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{commands::Command, settings::Settings};

#[derive(Parser)]
#[command(name = "holmes", author, version, about = "Holmes review store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "holmes.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;
  let counter: MemoryCounter = settings.usage.clone().into_iter().collect();

  commands::run(cli.command, &store, &counter, &settings).await
}
