//! Per-feed service composition
//!
//! Owns the price process, the last-tick cache, the optional publish gate,
//! the subscriber registry and the injected counters. Each piece has its
//! own lock so snapshot readers never hold up the scheduler for long.

use super::{current_time_ms, FeedKind, PriceSnapshot, PublishGate, Tick, WireMessage};
use crate::config::Config;
use crate::model::{build_process, ModelError, PriceProcess};
use crate::rng::LabeledRng;
use crate::telemetry::FeedCounters;
use crate::ws::{BroadcastReport, DeliveryError, SubscriberId, SubscriberRegistry, TickSink};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Duration;

/// One running feed (DEX or Oracle)
pub struct FeedService {
    kind: FeedKind,
    process: Mutex<Box<dyn PriceProcess>>,
    last_tick: RwLock<Option<Tick>>,
    gate: Option<PublishGate>,
    registry: SubscriberRegistry,
    counters: Arc<FeedCounters>,
}

impl FeedService {
    pub fn new(kind: FeedKind, process: Box<dyn PriceProcess>, counters: Arc<FeedCounters>) -> Self {
        Self {
            kind,
            process: Mutex::new(process),
            last_tick: RwLock::new(None),
            gate: None,
            registry: SubscriberRegistry::new(),
            counters,
        }
    }

    /// Attach a publish gate (Oracle)
    pub fn with_gate(mut self, gate: PublishGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Build the feed described by `config`
    pub fn from_config(
        config: &Config,
        kind: FeedKind,
        counters: Arc<FeedCounters>,
    ) -> Result<Self, ModelError> {
        let rng = LabeledRng::derive(config.server.seed, kind.process_label());
        let tick_interval_ms = match kind {
            FeedKind::Dex => config.dex.tick_ms.min,
            FeedKind::Oracle => config.oracle.tick_ms.min,
        };
        let process = build_process(&config.server, config.pair(), tick_interval_ms, rng)?;
        let service = Self::new(kind, process, counters);

        Ok(match kind {
            FeedKind::Dex => service,
            FeedKind::Oracle => service.with_gate(PublishGate::new(
                config.oracle.deviation_bps,
                Duration::from_millis(config.oracle.heartbeat_ms),
            )),
        })
    }

    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    pub fn gate(&self) -> Option<&PublishGate> {
        self.gate.as_ref()
    }

    pub fn counters(&self) -> &FeedCounters {
        &self.counters
    }

    pub fn pair(&self) -> String {
        self.process.lock().pair().to_string()
    }

    pub fn current_price(&self) -> f64 {
        self.process.lock().current_price()
    }

    pub fn model_name(&self) -> &'static str {
        self.process.lock().name()
    }

    /// Step the price process under its lock
    pub fn generate_tick(&self, ts: u64, seq: u64, delay_ms: u32, stale: bool) -> Tick {
        self.process
            .lock()
            .next_tick(ts, seq, self.kind.source(), delay_ms, stale)
    }

    /// Cache `tick` as the latest and fan it out to every subscriber
    pub fn publish(&self, tick: &Tick) -> BroadcastReport {
        *self.last_tick.write() = Some(tick.clone());

        tracing::info!(
            source = %tick.source,
            pair = %tick.pair,
            price = format_args!("{:.4}", tick.price),
            seq = tick.sequence,
            delay_ms = tick.injected_delay_ms,
            stale = tick.stale,
            "price_tick"
        );

        match WireMessage::Price(tick.clone()).to_json() {
            Ok(frame) => self.registry.broadcast(&frame),
            Err(e) => {
                tracing::error!(error = %e, seq = tick.sequence, "Failed to serialize tick");
                BroadcastReport::default()
            }
        }
    }

    /// Last tick handed to the broadcaster
    pub fn get_last_tick(&self) -> Option<Tick> {
        self.last_tick.read().clone()
    }

    /// Body for the snapshot endpoint
    pub fn snapshot(&self) -> PriceSnapshot {
        PriceSnapshot {
            prices: self.get_last_tick().into_iter().collect(),
            server_time: current_time_ms(),
        }
    }

    /// Acknowledge and register a subscriber.
    ///
    /// The acknowledgement is delivered before the sink joins the
    /// registry, so it always precedes the first tick.
    pub fn register_subscriber(
        &self,
        sink: Arc<dyn TickSink>,
    ) -> Result<SubscriberId, DeliveryError> {
        let ack = WireMessage::subscribed(self.kind.channel_name())
            .to_json()
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        sink.deliver(&ack)?;

        let id = self.registry.add(sink);
        tracing::debug!(feed = %self.kind, subscriber = %id, total = self.registry.len(), "Subscriber registered");
        Ok(id)
    }

    pub fn unregister_subscriber(&self, id: &SubscriberId) -> bool {
        self.registry.remove(id)
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.len()
    }
}

impl std::fmt::Debug for FeedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedService")
            .field("kind", &self.kind)
            .field("gate", &self.gate)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
