//! Per-feed tick scheduler
//!
//! Each iteration, in order:
//! 1. sample the interval (DEX burst mode clamps it), then sleep
//! 2. stamp timestamp, injected delay and staleness
//! 3. step the price process
//! 4. Oracle only: consult the publish gate; suppressed ticks stop here
//! 5. fault injection: drop, or deliver and maybe duplicate
//! 6. advance `seq` and the last-tick instant, whatever happened above
//!
//! All draws in 1, 2 and 5 come from the scheduler's own stream.

use super::{FaultDecision, FaultInjector, FeedKind, FeedService, GateDecision, PublishTrigger};
use crate::config::{Config, RangeMs};
use crate::rng::LabeledRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// DEX burst timing: fast intervals clamped to at most `on_ms`, slow ones
/// to at least `off_ms`, chosen by a fair coin each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstMode {
    pub on_ms: u64,
    pub off_ms: u64,
}

/// Timing and fault parameters of one scheduler
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerSettings {
    pub tick_ms: RangeMs,
    pub delay_ms: RangeMs,
    pub stale_after_ms: u64,
    pub faults: FaultInjector,
    pub burst: Option<BurstMode>,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config, kind: FeedKind) -> Self {
        match kind {
            FeedKind::Dex => {
                let dex = &config.dex;
                Self {
                    tick_ms: dex.tick_ms,
                    delay_ms: dex.delay_ms,
                    stale_after_ms: dex.stale_after_ms,
                    faults: FaultInjector::new(dex.p_drop, dex.p_dup),
                    burst: dex.burst_mode.then_some(BurstMode {
                        on_ms: dex.burst_on_ms,
                        off_ms: dex.burst_off_ms,
                    }),
                }
            }
            FeedKind::Oracle => {
                let oracle = &config.oracle;
                Self {
                    tick_ms: oracle.tick_ms,
                    delay_ms: oracle.delay_ms,
                    stale_after_ms: oracle.stale_after_ms,
                    faults: FaultInjector::new(oracle.p_drop, oracle.p_dup),
                    burst: None,
                }
            }
        }
    }
}

/// What one iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Gate declined to publish (Oracle)
    Suppressed { seq: u64 },
    /// Fault injector dropped the frame
    Dropped { seq: u64 },
    /// Broadcast once, or twice when duplicated
    Sent {
        seq: u64,
        duplicated: bool,
        delivered: usize,
    },
}

impl TickOutcome {
    pub fn seq(&self) -> u64 {
        match self {
            TickOutcome::Suppressed { seq }
            | TickOutcome::Dropped { seq }
            | TickOutcome::Sent { seq, .. } => *seq,
        }
    }
}

/// Drives one feed forever
pub struct TickScheduler {
    feed: Arc<FeedService>,
    settings: SchedulerSettings,
    rng: LabeledRng,
    seq: u64,
    last_tick_at: Instant,
}

impl TickScheduler {
    /// Scheduler with the feed's ticker stream derived from `seed`
    pub fn new(feed: Arc<FeedService>, settings: SchedulerSettings, seed: u64) -> Self {
        let rng = LabeledRng::derive(seed, feed.kind().ticker_label());
        Self {
            feed,
            settings,
            rng,
            seq: 0,
            last_tick_at: Instant::now(),
        }
    }

    /// Next sequence number to be stamped
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn feed(&self) -> &Arc<FeedService> {
        &self.feed
    }

    /// Sample the sleep before the next tick
    pub fn next_interval(&mut self) -> Duration {
        let mut tick_ms = self
            .rng
            .sample_range(self.settings.tick_ms.min, self.settings.tick_ms.max);

        if let Some(burst) = self.settings.burst {
            if self.rng.happens(0.5) {
                tick_ms = tick_ms.min(burst.on_ms);
            } else {
                tick_ms = tick_ms.max(burst.off_ms);
            }
        }

        Duration::from_millis(tick_ms)
    }

    /// Everything after the sleep: generate, gate, inject faults, broadcast
    pub fn on_wake(&mut self, now: Instant, ts: u64) -> TickOutcome {
        let delay = self
            .rng
            .sample_range(self.settings.delay_ms.min, self.settings.delay_ms.max);
        let delay_ms = u32::try_from(delay).unwrap_or(u32::MAX);

        let elapsed = now.saturating_duration_since(self.last_tick_at);
        let stale = elapsed > Duration::from_millis(self.settings.stale_after_ms);

        let seq = self.seq;
        let tick = self.feed.generate_tick(ts, seq, delay_ms, stale);
        let counters = self.feed.counters();

        let outcome = 'iteration: {
            if let Some(gate) = self.feed.gate() {
                match gate.try_publish(tick.price, now) {
                    GateDecision::Publish(trigger) => match trigger {
                        PublishTrigger::Initial => {
                            tracing::info!(price = tick.price, "Initial oracle publish");
                        }
                        PublishTrigger::Deviation { bps } => {
                            tracing::info!(
                                deviation_bps = bps,
                                threshold = gate.threshold_bps(),
                                "Deviation trigger"
                            );
                        }
                        PublishTrigger::Heartbeat { elapsed_ms } => {
                            tracing::info!(
                                elapsed_ms,
                                threshold = gate.heartbeat().as_millis() as u64,
                                "Heartbeat trigger"
                            );
                        }
                    },
                    GateDecision::Suppress { deviation_bps } => {
                        tracing::debug!(
                            price = tick.price,
                            deviation_bps,
                            threshold = gate.threshold_bps(),
                            seq,
                            "Oracle update suppressed"
                        );
                        counters.record_suppressed();
                        break 'iteration TickOutcome::Suppressed { seq };
                    }
                }
            }

            counters.record_generated();

            match self.settings.faults.decide(&mut self.rng) {
                FaultDecision::Drop => {
                    counters.record_dropped();
                    tracing::debug!(feed = %self.feed.kind(), seq, "Frame dropped");
                    TickOutcome::Dropped { seq }
                }
                FaultDecision::Deliver { duplicate } => {
                    let report = self.feed.publish(&tick);
                    counters.record_sent();
                    let mut delivered = report.delivered;

                    if duplicate {
                        delivered += self.feed.publish(&tick).delivered;
                        counters.record_duplicated();
                        tracing::debug!(feed = %self.feed.kind(), seq, "Frame duplicated");
                    }

                    TickOutcome::Sent {
                        seq,
                        duplicated: duplicate,
                        delivered,
                    }
                }
            }
        };

        self.seq += 1;
        self.last_tick_at = now;
        outcome
    }

    /// Run until the task is dropped or aborted
    pub async fn run(mut self) {
        tracing::info!(
            feed = %self.feed.kind(),
            pair = %self.feed.pair(),
            model = self.feed.model_name(),
            "Tick scheduler started"
        );

        loop {
            let interval = self.next_interval();
            tokio::time::sleep(interval).await;
            self.on_wake(Instant::now(), super::current_time_ms());
        }
    }
}
