//! Deterministic random streams
//!
//! Every subsystem draws from its own stream derived from the global seed
//! and a fixed label, so two runs with the same seed replay identically.

mod labeled;

pub use labeled::{label_hash, LabeledRng};

/// Stream label for the DEX scheduler (interval, delay, fault draws)
pub const DEX_TICKER: &str = "DEX_TICKER";
/// Stream label for the Oracle scheduler
pub const ORACLE_TICKER: &str = "ORACLE_TICKER";
/// Stream label for the DEX price process
pub const DEX_PROCESS: &str = "DEX";
/// Stream label for the Oracle price process
pub const ORACLE_PROCESS: &str = "ORACLE";
