//! Pipeline semantics: scheduler, gate, faults and fan-out wired together

use feed_sim::config::Config;
use feed_sim::feed::{
    FeedKind, FeedService, SchedulerSettings, SequenceObservation, SequenceTracker, Tick,
    TickOutcome, TickScheduler, WireMessage,
};
use feed_sim::telemetry::FeedCounters;
use feed_sim::ws::{ChannelSink, DeliveryError, TickSink};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

fn base_config() -> Config {
    Config::from_toml_str(include_str!("../../config.toml.example")).unwrap()
}

fn build(config: &Config, kind: FeedKind) -> (Arc<FeedService>, TickScheduler) {
    let feed = Arc::new(
        FeedService::from_config(config, kind, Arc::new(FeedCounters::new())).unwrap(),
    );
    let scheduler = TickScheduler::new(
        feed.clone(),
        SchedulerSettings::from_config(config, kind),
        config.server.seed,
    );
    (feed, scheduler)
}

fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<WireMessage> {
    let mut out = Vec::new();
    while let Ok(frame) = rx.try_recv() {
        out.push(serde_json::from_str(&frame).unwrap());
    }
    out
}

fn prices(messages: &[WireMessage]) -> Vec<Tick> {
    messages
        .iter()
        .filter_map(|m| match m {
            WireMessage::Price(tick) => Some(tick.clone()),
            WireMessage::Subscription { .. } => None,
        })
        .collect()
}

/// Run `n` iterations with fixed timestamps and 100ms spacing
fn run(scheduler: &mut TickScheduler, n: u64) -> Vec<TickOutcome> {
    let t0 = Instant::now();
    (0..n)
        .map(|i| {
            scheduler.next_interval();
            scheduler.on_wake(t0 + Duration::from_millis(100 * (i + 1)), 1_700_000_000_000 + i)
        })
        .collect()
}

fn subscribe(feed: &FeedService, capacity: usize) -> mpsc::Receiver<String> {
    let (sink, rx) = ChannelSink::new(capacity);
    feed.register_subscriber(Arc::new(sink)).unwrap();
    rx
}

#[test]
fn test_same_seed_same_stream() {
    let config = base_config();

    let (feed_a, mut sched_a) = build(&config, FeedKind::Dex);
    let (feed_b, mut sched_b) = build(&config, FeedKind::Dex);
    let mut rx_a = subscribe(&feed_a, 4096);
    let mut rx_b = subscribe(&feed_b, 4096);

    assert_eq!(run(&mut sched_a, 500), run(&mut sched_b, 500));
    assert_eq!(drain(&mut rx_a), drain(&mut rx_b));
    assert_eq!(feed_a.counters().snapshot(), feed_b.counters().snapshot());
}

#[test]
fn test_different_seed_different_prices() {
    let config = base_config();
    let mut other = base_config();
    other.server.seed += 1;

    let (feed_a, mut sched_a) = build(&config, FeedKind::Dex);
    let (feed_b, mut sched_b) = build(&other, FeedKind::Dex);
    run(&mut sched_a, 20);
    run(&mut sched_b, 20);

    assert_ne!(feed_a.current_price(), feed_b.current_price());
}

#[test]
fn test_dex_and_oracle_streams_independent() {
    // Oracle activity must not shift the DEX stream
    let config = base_config();

    let (dex_alone, mut sched_alone) = build(&config, FeedKind::Dex);
    run(&mut sched_alone, 100);

    let (dex, mut sched_dex) = build(&config, FeedKind::Dex);
    let (_oracle, mut sched_oracle) = build(&config, FeedKind::Oracle);
    run(&mut sched_oracle, 37);
    run(&mut sched_dex, 100);

    assert_eq!(dex_alone.current_price(), dex.current_price());
}

#[test]
fn test_drop_takes_precedence_over_duplicate() {
    let mut config = base_config();
    config.dex.p_drop = 1.0;
    config.dex.p_dup = 1.0;

    let (feed, mut scheduler) = build(&config, FeedKind::Dex);
    let mut rx = subscribe(&feed, 64);

    let outcomes = run(&mut scheduler, 20);
    assert!(outcomes.iter().all(|o| matches!(o, TickOutcome::Dropped { .. })));

    let messages = drain(&mut rx);
    assert_eq!(messages, vec![WireMessage::subscribed("dex_ticks")]);

    let c = feed.counters().snapshot();
    assert_eq!(c.ticks_generated, 20);
    assert_eq!(c.frames_dropped, 20);
    assert_eq!(c.frames_sent, 0);
    assert_eq!(c.frames_duplicated, 0);
}

#[test]
fn test_sequence_gaps_match_drops() {
    let mut config = base_config();
    config.dex.p_drop = 0.3;
    config.dex.p_dup = 0.0;

    let (feed, mut scheduler) = build(&config, FeedKind::Dex);
    let mut rx = subscribe(&feed, 4096);
    run(&mut scheduler, 1000);

    let ticks = prices(&drain(&mut rx));
    let mut tracker = SequenceTracker::new();
    let mut missing = 0;
    for tick in &ticks {
        match tracker.observe(tick.sequence) {
            SequenceObservation::InOrder => {}
            SequenceObservation::Gap { missing: m } => missing += m,
            other => panic!("unexpected {other:?} at seq {}", tick.sequence),
        }
    }

    let c = feed.counters().snapshot();
    assert_eq!(c.ticks_generated, 1000);
    assert_eq!(c.frames_sent + c.frames_dropped, 1000);
    assert_eq!(ticks.len() as u64, c.frames_sent);

    // Leading drops are invisible to the tracker, trailing drops too
    let first = ticks.first().unwrap().sequence;
    let last = ticks.last().unwrap().sequence;
    assert_eq!(first + missing + (999 - last), c.frames_dropped);
    assert!(c.frames_dropped > 200 && c.frames_dropped < 400);
}

#[test]
fn test_duplicates_repeat_sequence() {
    let mut config = base_config();
    config.dex.p_drop = 0.0;
    config.dex.p_dup = 1.0;

    let (feed, mut scheduler) = build(&config, FeedKind::Dex);
    let mut rx = subscribe(&feed, 256);
    run(&mut scheduler, 10);

    let ticks = prices(&drain(&mut rx));
    assert_eq!(ticks.len(), 20);
    for (i, pair) in ticks.chunks(2).enumerate() {
        assert_eq!(pair[0], pair[1]);
        assert_eq!(pair[0].sequence, i as u64);
    }

    let c = feed.counters().snapshot();
    assert_eq!(c.frames_sent, 10);
    assert_eq!(c.frames_duplicated, 10);
}

/// Accepts the acknowledgement, then fails every frame
struct BrokenSink {
    calls: AtomicUsize,
}

impl TickSink for BrokenSink {
    fn deliver(&self, _frame: &str) -> Result<(), DeliveryError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            Ok(())
        } else {
            Err(DeliveryError::Transport("connection reset".into()))
        }
    }
}

#[test]
fn test_failing_subscribers_do_not_affect_others() {
    let mut config = base_config();
    config.dex.p_drop = 0.0;
    config.dex.p_dup = 0.0;

    let (feed, mut scheduler) = build(&config, FeedKind::Dex);
    feed.register_subscriber(Arc::new(BrokenSink {
        calls: AtomicUsize::new(0),
    }))
    .unwrap();
    // Room for the ack and one tick only
    let mut slow = subscribe(&feed, 2);
    let mut healthy = subscribe(&feed, 256);

    let outcomes = run(&mut scheduler, 50);

    assert_eq!(prices(&drain(&mut healthy)).len(), 50);
    assert_eq!(prices(&drain(&mut slow)).len(), 1);

    // Failed deliveries never unsubscribe anyone
    assert_eq!(feed.subscriber_count(), 3);
    assert_eq!(
        outcomes[10],
        TickOutcome::Sent {
            seq: 10,
            duplicated: false,
            delivered: 1
        }
    );
}

#[test]
fn test_gate_baseline_resets_on_dropped_publish() {
    let mut config = base_config();
    config.server.gbm_mu = 0.0;
    config.server.gbm_sigma = 0.0;
    config.oracle.p_drop = 1.0;

    let (feed, mut scheduler) = build(&config, FeedKind::Oracle);
    let t0 = Instant::now();

    assert_eq!(scheduler.on_wake(t0, 0), TickOutcome::Dropped { seq: 0 });
    let gate = feed.gate().unwrap().state();
    assert_eq!(gate.last_published_price, Some(config.server.price_start));
    assert_eq!(gate.last_publish_time, Some(t0));

    // Flat price inside the heartbeat window: everything suppressed
    for i in 1..=5u64 {
        assert_eq!(
            scheduler.on_wake(t0 + Duration::from_secs(i), i),
            TickOutcome::Suppressed { seq: i }
        );
    }

    let c = feed.counters().snapshot();
    assert_eq!(c.ticks_generated, 1);
    assert_eq!(c.frames_dropped, 1);
    assert_eq!(c.ticks_suppressed, 5);
    assert!(feed.get_last_tick().is_none());
}

#[test]
fn test_oracle_publishes_only_on_triggers() {
    let mut config = base_config();
    config.oracle.p_drop = 0.0;
    config.oracle.p_dup = 0.0;

    let (feed, mut scheduler) = build(&config, FeedKind::Oracle);
    let mut rx = subscribe(&feed, 4096);
    let outcomes = run(&mut scheduler, 2000);

    let published = prices(&drain(&mut rx));
    let suppressed = outcomes
        .iter()
        .filter(|o| matches!(o, TickOutcome::Suppressed { .. }))
        .count();
    assert_eq!(published.len() + suppressed, 2000);

    // Consecutive publishes either moved 50bps or waited out the heartbeat
    for pair in published.windows(2) {
        let bps = ((pair[1].price - pair[0].price).abs() / pair[0].price * 10_000.0) as u64;
        let elapsed_ms = (pair[1].sequence - pair[0].sequence) * 100;
        assert!(
            bps >= 50 || elapsed_ms >= 60_000,
            "publish at seq {} without trigger",
            pair[1].sequence
        );
    }
    assert!(published.iter().all(|t| t.source.as_str() == "chainlink"));
}
