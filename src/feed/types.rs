//! Tick and wire message types

use serde::{Deserialize, Serialize};

/// Origin of a tick, serialized as `"dex"` or `"chainlink"`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Dex,
    Chainlink,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Dex => "dex",
            SourceKind::Chainlink => "chainlink",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated price observation.
///
/// Field order and names are the wire contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Wall-clock timestamp (ms since epoch)
    #[serde(rename = "ts")]
    pub timestamp_ms: u64,
    /// Trading pair, e.g. "ETH/USD"
    pub pair: String,
    pub price: f64,
    pub source: SourceKind,
    /// Per-feed sequence number; gaps mean dropped or suppressed ticks
    #[serde(rename = "src_seq")]
    pub sequence: u64,
    /// Simulated delivery delay
    #[serde(rename = "delay_ms")]
    pub injected_delay_ms: u32,
    pub stale: bool,
}

/// Messages pushed to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireMessage {
    /// A price tick
    Price(Tick),
    /// Subscription acknowledgement, sent once before any tick
    Subscription { id: String, status: String },
}

impl WireMessage {
    /// Acknowledgement for a freshly registered subscriber
    pub fn subscribed(channel: &str) -> Self {
        WireMessage::Subscription {
            id: channel.to_string(),
            status: "subscribed".to_string(),
        }
    }

    /// Serialize to the JSON text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Body of the snapshot endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub prices: Vec<Tick>,
    pub server_time: u64,
}

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn current_time_ms() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
