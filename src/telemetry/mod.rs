//! Telemetry module
//!
//! Structured logging and per-feed counters

mod counters;
mod logging;

pub use counters::{CounterSnapshot, FeedCounters};
pub use logging::init_logging;

use crate::config::TelemetryConfig;

/// Initialize all telemetry subsystems
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    init_logging(&config.log_level, config.log_format)
}
