//! Simulated price feeds
//!
//! Tick generation, the Oracle publish gate, fault injection and the
//! per-feed scheduler, plus a client for consuming a running feed.

mod fault;
mod gate;
mod remote;
mod scheduler;
mod service;
mod types;

pub use fault::{FaultDecision, FaultInjector};
pub use gate::{GateDecision, GateState, PublishGate, PublishTrigger};
pub use remote::{RemoteFeed, SequenceObservation, SequenceTracker};
pub use scheduler::{BurstMode, SchedulerSettings, TickOutcome, TickScheduler};
pub use service::FeedService;
pub use types::{current_time_ms, PriceSnapshot, SourceKind, Tick, WireMessage};

use crate::rng;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// The two independent simulated channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedKind {
    /// High-frequency DEX trade feed
    Dex,
    /// Deviation/heartbeat gated Oracle feed
    Oracle,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Dex => "dex",
            FeedKind::Oracle => "oracle",
        }
    }

    /// Source stamped on every tick
    pub fn source(&self) -> SourceKind {
        match self {
            FeedKind::Dex => SourceKind::Dex,
            FeedKind::Oracle => SourceKind::Chainlink,
        }
    }

    /// Channel id sent in the subscription acknowledgement
    pub fn channel_name(&self) -> &'static str {
        match self {
            FeedKind::Dex => "dex_ticks",
            FeedKind::Oracle => "oracle_prices",
        }
    }

    pub fn ws_path(&self) -> &'static str {
        match self {
            FeedKind::Dex => "/ws/ticks",
            FeedKind::Oracle => "/ws/prices",
        }
    }

    pub fn snapshot_path(&self) -> &'static str {
        match self {
            FeedKind::Dex => "/prices/snapshot",
            FeedKind::Oracle => "/oracle/snapshot",
        }
    }

    /// `Server` header value
    pub fn server_name(&self) -> &'static str {
        match self {
            FeedKind::Dex => "dex-sim",
            FeedKind::Oracle => "oracle-sim",
        }
    }

    /// Label of the scheduler's random stream
    pub fn ticker_label(&self) -> &'static str {
        match self {
            FeedKind::Dex => rng::DEX_TICKER,
            FeedKind::Oracle => rng::ORACLE_TICKER,
        }
    }

    /// Label of the price process's random stream
    pub fn process_label(&self) -> &'static str {
        match self {
            FeedKind::Dex => rng::DEX_PROCESS,
            FeedKind::Oracle => rng::ORACLE_PROCESS,
        }
    }
}

impl std::fmt::Display for FeedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for consumers of a published feed
#[async_trait]
pub trait TickStream: Send + Sync {
    /// Subscribe to feed messages
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<WireMessage>>;
}
