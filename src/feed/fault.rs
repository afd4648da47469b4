//! Fault injection
//!
//! Two Bernoulli trials on the scheduler's stream: drop first, then
//! duplicate only if the tick survived. The order is part of the
//! reproducibility contract.

use crate::rng::LabeledRng;

/// What happens to one publishable tick on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultDecision {
    Drop,
    Deliver { duplicate: bool },
}

/// Drop/duplicate probabilities for one feed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaultInjector {
    p_drop: f64,
    p_dup: f64,
}

impl FaultInjector {
    pub fn new(p_drop: f64, p_dup: f64) -> Self {
        Self { p_drop, p_dup }
    }

    /// No faults
    pub fn none() -> Self {
        Self::new(0.0, 0.0)
    }

    pub fn p_drop(&self) -> f64 {
        self.p_drop
    }

    pub fn p_dup(&self) -> f64 {
        self.p_dup
    }

    /// Draw the decision for one tick; a drop skips the duplicate draw
    pub fn decide(&self, rng: &mut LabeledRng) -> FaultDecision {
        if rng.happens(self.p_drop) {
            return FaultDecision::Drop;
        }
        FaultDecision::Deliver {
            duplicate: rng.happens(self.p_dup),
        }
    }
}
