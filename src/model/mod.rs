//! Stochastic price processes
//!
//! The scheduler only sees the [`PriceProcess`] capability; GBM and a
//! Merton-style jump diffusion are the current variants.

mod gbm;
mod jump;

pub use gbm::GbmProcess;
pub use jump::JumpDiffusionProcess;

use crate::config::{PriceModel, ServerConfig};
use crate::feed::{SourceKind, Tick};
use crate::rng::LabeledRng;
use thiserror::Error;

/// Hard lower bound on simulated prices
pub const PRICE_FLOOR: f64 = 0.01;

/// Milliseconds in a trading year (365.25 days of 86 400 s).
///
/// Drift and volatility are annualized against this day count; changing
/// it changes the simulated volatility per tick.
pub const MS_PER_YEAR: f64 = 1000.0 * 86_400.0 * 365.25;

/// Tick interval expressed as a fraction of a trading year
pub fn year_fraction(tick_interval_ms: u64) -> f64 {
    tick_interval_ms as f64 / 1000.0 / 86_400.0 / 365.25
}

/// Invalid process parameters
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    #[error("initial price must be positive and finite, got {0}")]
    InvalidPrice(f64),
    #[error("invalid {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

/// Generator of successive ticks for one pair.
///
/// `next_tick` is the only mutator of the current price and advances the
/// process's own random stream, so repeated calls diverge.
pub trait PriceProcess: Send {
    /// Step the process by one tick interval and stamp the result
    fn next_tick(
        &mut self,
        ts: u64,
        seq: u64,
        source: SourceKind,
        delay_ms: u32,
        stale: bool,
    ) -> Tick;

    /// Price after the most recent step
    fn current_price(&self) -> f64;

    /// Simulated trading pair
    fn pair(&self) -> &str;

    /// Model name for logs
    fn name(&self) -> &'static str;
}

fn check_finite(name: &'static str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::InvalidParameter { name, value })
    }
}

fn check_non_negative(name: &'static str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ModelError::InvalidParameter { name, value })
    }
}

/// Build the configured process for one feed.
///
/// `tick_interval_ms` is the feed's minimum tick interval; `rng` is the
/// feed's process stream.
pub fn build_process(
    server: &ServerConfig,
    pair: &str,
    tick_interval_ms: u64,
    rng: LabeledRng,
) -> Result<Box<dyn PriceProcess>, ModelError> {
    match server.price_model {
        PriceModel::Gbm => Ok(Box::new(GbmProcess::new(
            pair,
            server.price_start,
            server.gbm_mu,
            server.gbm_sigma,
            tick_interval_ms,
            rng,
        )?)),
        PriceModel::JumpDiffusion => Ok(Box::new(JumpDiffusionProcess::new(
            GbmProcess::new(
                pair,
                server.price_start,
                server.gbm_mu,
                server.gbm_sigma,
                tick_interval_ms,
                rng,
            )?,
            server.jump_lambda,
            server.jump_mu,
            server.jump_sigma,
        )?)),
    }
}
