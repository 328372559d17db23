pub mod inventory;
pub mod run;
pub mod validator_ranges;

use std::path::{Path, PathBuf};

use anyhow::Context;
use carto_common::config::Config;
use carto_common::network::DiscoveryResult;
use carto_common::storage::ObjectStore;
use carto_common::warn;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "carto")]
#[command(about = "Maps Ethereum test networks, their validators and their clients.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover networks and publish the snapshot
    #[command(alias = "r")]
    Run {
        /// YAML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
        /// Overrides `logging.level`
        #[arg(long)]
        log_level: Option<String>,
    },
    /// Publish validator ranges for every active network
    #[command(alias = "vr")]
    ValidatorRanges {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Publish the client inventory of every active network
    #[command(alias = "inv")]
    Inventory {
        #[arg(short, long)]
        config: PathBuf,
    },
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Loads the configuration, falling back to defaults without a path.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => {
            Config::load(path).with_context(|| format!("failed to load {}", path.display()))
        }
        None => Ok(Config::default()),
    }
}

/// Cancels `cancel` on the first Ctrl-C.
pub fn cancel_on_interrupt(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, shutting down");
            cancel.cancel();
        }
    });
}

/// Downloads and decodes the network snapshot stored under `key`.
pub async fn fetch_snapshot(store: &dyn ObjectStore, key: &str) -> anyhow::Result<DiscoveryResult> {
    let raw = store
        .download(key)
        .await
        .context("failed to download network snapshot")?;
    serde_json::from_slice(&raw).context("failed to parse network snapshot")
}
