//! Geometric Brownian Motion price process
//!
//! Per tick:
//! dt = tick_interval_ms / 1000 / 86400 / 365.25
//! S' = max(S * exp(mu*dt + sigma*z*sqrt(dt)), 0.01), z ~ N(0, 1)

use super::{check_finite, check_non_negative, year_fraction, ModelError, PriceProcess, PRICE_FLOOR};
use crate::feed::{SourceKind, Tick};
use crate::rng::LabeledRng;

/// GBM generator owning its own random stream
#[derive(Debug)]
pub struct GbmProcess {
    pair: String,
    price: f64,
    drift: f64,
    volatility: f64,
    tick_interval_ms: u64,
    rng: LabeledRng,
}

impl GbmProcess {
    /// Create a new process starting at `initial_price`
    pub fn new(
        pair: impl Into<String>,
        initial_price: f64,
        drift: f64,
        volatility: f64,
        tick_interval_ms: u64,
        rng: LabeledRng,
    ) -> Result<Self, ModelError> {
        if !(initial_price.is_finite() && initial_price > 0.0) {
            return Err(ModelError::InvalidPrice(initial_price));
        }
        check_finite("gbm_mu", drift)?;
        check_non_negative("gbm_sigma", volatility)?;

        Ok(Self {
            pair: pair.into(),
            price: initial_price,
            drift,
            volatility,
            tick_interval_ms,
            rng,
        })
    }

    /// Year fraction of one step
    pub fn dt(&self) -> f64 {
        year_fraction(self.tick_interval_ms)
    }

    /// Drift plus diffusion log-return for one step; consumes one normal draw
    pub(crate) fn diffusion_return(&mut self) -> f64 {
        let dt = self.dt();
        let dw = self.rng.sample_normal() * dt.sqrt();
        self.drift * dt + self.volatility * dw
    }

    /// Apply a log-return and the price floor
    pub(crate) fn apply_return(&mut self, relative_change: f64) -> f64 {
        self.price = (self.price * relative_change.exp()).max(PRICE_FLOOR);
        self.price
    }

    pub(crate) fn rng_mut(&mut self) -> &mut LabeledRng {
        &mut self.rng
    }

    pub(crate) fn stamp(
        &self,
        ts: u64,
        seq: u64,
        source: SourceKind,
        delay_ms: u32,
        stale: bool,
    ) -> Tick {
        Tick {
            timestamp_ms: ts,
            pair: self.pair.clone(),
            price: self.price,
            source,
            sequence: seq,
            injected_delay_ms: delay_ms,
            stale,
        }
    }
}

impl PriceProcess for GbmProcess {
    fn next_tick(
        &mut self,
        ts: u64,
        seq: u64,
        source: SourceKind,
        delay_ms: u32,
        stale: bool,
    ) -> Tick {
        let relative_change = self.diffusion_return();
        self.apply_return(relative_change);
        self.stamp(ts, seq, source, delay_ms, stale)
    }

    fn current_price(&self) -> f64 {
        self.price
    }

    fn pair(&self) -> &str {
        &self.pair
    }

    fn name(&self) -> &'static str {
        "gbm"
    }
}
