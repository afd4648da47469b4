//! Oracle publish gate
//!
//! A candidate tick is published when it deviates from the last published
//! price by at least the threshold, or when the heartbeat interval has
//! elapsed since the last publish. The first candidate always publishes.
//!
//! The baseline resets on the publish *decision*, not on delivery: a tick
//! the fault injector later drops still counts as published. This models
//! the oracle committing to an update independently of transport loss.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Why a candidate was published
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishTrigger {
    /// Nothing published yet
    Initial,
    /// Price moved at least the threshold
    Deviation { bps: u64 },
    /// Heartbeat interval elapsed
    Heartbeat { elapsed_ms: u64 },
}

/// Outcome of evaluating one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Publish(PublishTrigger),
    Suppress { deviation_bps: u64 },
}

impl GateDecision {
    pub fn is_publish(&self) -> bool {
        matches!(self, GateDecision::Publish(_))
    }
}

/// Baseline of the last publish decision; price and time move together
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GateState {
    pub last_published_price: Option<f64>,
    pub last_publish_time: Option<Instant>,
}

/// Deviation/heartbeat publish gate
#[derive(Debug)]
pub struct PublishGate {
    threshold_bps: u32,
    heartbeat: Duration,
    state: Mutex<GateState>,
}

impl PublishGate {
    pub fn new(threshold_bps: u32, heartbeat: Duration) -> Self {
        Self {
            threshold_bps,
            heartbeat,
            state: Mutex::new(GateState::default()),
        }
    }

    pub fn threshold_bps(&self) -> u32 {
        self.threshold_bps
    }

    pub fn heartbeat(&self) -> Duration {
        self.heartbeat
    }

    /// `|current - last| / last * 10000`, truncated
    pub fn deviation_bps(current: f64, last: f64) -> u64 {
        ((current - last).abs() / last * 10_000.0) as u64
    }

    fn decide(&self, state: &GateState, price: f64, now: Instant) -> GateDecision {
        let Some(last_price) = state.last_published_price else {
            return GateDecision::Publish(PublishTrigger::Initial);
        };

        let deviation_bps = Self::deviation_bps(price, last_price);
        if deviation_bps >= u64::from(self.threshold_bps) {
            return GateDecision::Publish(PublishTrigger::Deviation { bps: deviation_bps });
        }

        if let Some(last_time) = state.last_publish_time {
            let elapsed = now.saturating_duration_since(last_time);
            if elapsed >= self.heartbeat {
                return GateDecision::Publish(PublishTrigger::Heartbeat {
                    elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                });
            }
        }

        GateDecision::Suppress { deviation_bps }
    }

    /// Evaluate without touching the baseline
    pub fn evaluate(&self, price: f64, now: Instant) -> GateDecision {
        let state = self.state.lock();
        self.decide(&state, price, now)
    }

    /// Reset the baseline to `price` at `now`
    pub fn mark_published(&self, price: f64, now: Instant) {
        let mut state = self.state.lock();
        state.last_published_price = Some(price);
        state.last_publish_time = Some(now);
    }

    /// Evaluate and, on publish, reset the baseline under the same lock
    pub fn try_publish(&self, price: f64, now: Instant) -> GateDecision {
        let mut state = self.state.lock();
        let decision = self.decide(&state, price, now);
        if decision.is_publish() {
            state.last_published_price = Some(price);
            state.last_publish_time = Some(now);
        }
        decision
    }

    pub fn state(&self) -> GateState {
        *self.state.lock()
    }
}
