//! Merton-style jump diffusion
//!
//! GBM step plus `N ~ Poisson(lambda * dt)` jumps, each adding a
//! `Normal(jump_mu, jump_sigma)` term to the log-return. No drift
//! compensator is applied.

use super::{check_finite, check_non_negative, GbmProcess, ModelError, PriceProcess};
use crate::feed::{SourceKind, Tick};
use rand_distr::{Distribution, Poisson};

/// GBM with compound Poisson log-jumps
#[derive(Debug)]
pub struct JumpDiffusionProcess {
    base: GbmProcess,
    jump_lambda: f64,
    jump_mu: f64,
    jump_sigma: f64,
    /// Per-step jump count distribution, absent when the rate is zero
    jumps: Option<Poisson<f64>>,
}

impl JumpDiffusionProcess {
    /// Wrap a GBM process with a jump component (`jump_lambda` per year)
    pub fn new(
        base: GbmProcess,
        jump_lambda: f64,
        jump_mu: f64,
        jump_sigma: f64,
    ) -> Result<Self, ModelError> {
        check_non_negative("jump_lambda", jump_lambda)?;
        check_finite("jump_mu", jump_mu)?;
        check_non_negative("jump_sigma", jump_sigma)?;

        let rate = jump_lambda * base.dt();
        let jumps = if rate > 0.0 {
            Some(Poisson::new(rate).map_err(|_| ModelError::InvalidParameter {
                name: "jump_lambda",
                value: jump_lambda,
            })?)
        } else {
            None
        };

        Ok(Self {
            base,
            jump_lambda,
            jump_mu,
            jump_sigma,
            jumps,
        })
    }

    /// Expected jumps per year
    pub fn jump_lambda(&self) -> f64 {
        self.jump_lambda
    }
}

impl PriceProcess for JumpDiffusionProcess {
    fn next_tick(
        &mut self,
        ts: u64,
        seq: u64,
        source: SourceKind,
        delay_ms: u32,
        stale: bool,
    ) -> Tick {
        let mut relative_change = self.base.diffusion_return();

        if let Some(jumps) = &self.jumps {
            let rng = self.base.rng_mut();
            let count = jumps.sample(rng) as u64;
            for _ in 0..count {
                relative_change += rng.sample_normal_with(self.jump_mu, self.jump_sigma);
            }
        }

        self.base.apply_return(relative_change);
        self.base.stamp(ts, seq, source, delay_ms, stale)
    }

    fn current_price(&self) -> f64 {
        self.base.current_price()
    }

    fn pair(&self) -> &str {
        self.base.pair()
    }

    fn name(&self) -> &'static str {
        "jump_diffusion"
    }
}
