//! CLI interface for feed-sim
//!
//! Provides subcommands for:
//! - `dex`: Run the DEX feed
//! - `oracle`: Run the Oracle feed
//! - `all`: Run both feeds in one process
//! - `tap`: Print messages from a running feed and check sequence continuity
//! - `snapshot`: Fetch a snapshot endpoint
//! - `config`: Show resolved configuration

mod serve;
mod snapshot;
mod tap;

pub use serve::{shutdown_signal, AllArgs, FeedArgs};
pub use snapshot::SnapshotArgs;
pub use tap::TapArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "feed-sim")]
#[command(about = "Deterministic DEX and Oracle price feed simulator")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the DEX trade feed
    Dex(FeedArgs),
    /// Run the deviation/heartbeat gated Oracle feed
    Oracle(FeedArgs),
    /// Run both feeds on their configured binds
    All(AllArgs),
    /// Subscribe to a running feed and print what arrives
    Tap(TapArgs),
    /// Fetch a snapshot endpoint
    Snapshot(SnapshotArgs),
    /// Show configuration
    Config,
}
