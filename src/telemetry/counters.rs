//! Per-feed counters exported in the Prometheus text format
//!
//! Each `FeedCounters` owns its own `PrometheusRecorder`, built but never
//! installed as the global recorder, so two feeds (or two tests) never
//! share a value.

use metrics::{Counter, Key, KeyName, Level, Metadata, Recorder, SharedString};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

pub const TICKS_GENERATED: &str = "price_ticks_generated";
pub const TICKS_SUPPRESSED: &str = "price_ticks_suppressed";
pub const FRAMES_SENT: &str = "ws_frames_sent";
pub const FRAMES_DROPPED: &str = "ws_frames_dropped";
pub const FRAMES_DUPLICATED: &str = "ws_frames_duplicated";

const METADATA: Metadata<'static> = Metadata::new(module_path!(), Level::INFO, Some(module_path!()));

/// One counter registered on the feed's recorder, mirrored locally for
/// cheap reads
struct TrackedCounter {
    exported: Counter,
    value: AtomicU64,
}

impl TrackedCounter {
    fn register(recorder: &PrometheusRecorder, name: &'static str, help: &'static str) -> Self {
        recorder.describe_counter(
            KeyName::from_const_str(name),
            None,
            SharedString::const_str(help),
        );
        Self {
            exported: recorder.register_counter(&Key::from_static_name(name), &METADATA),
            value: AtomicU64::new(0),
        }
    }

    fn increment(&self) {
        self.exported.increment(1);
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Monotonic counters updated by the scheduler
pub struct FeedCounters {
    handle: PrometheusHandle,
    ticks_generated: TrackedCounter,
    ticks_suppressed: TrackedCounter,
    frames_sent: TrackedCounter,
    frames_dropped: TrackedCounter,
    frames_duplicated: TrackedCounter,
}

/// Point-in-time copy of [`FeedCounters`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub ticks_generated: u64,
    pub ticks_suppressed: u64,
    pub frames_sent: u64,
    pub frames_dropped: u64,
    pub frames_duplicated: u64,
}

impl FeedCounters {
    pub fn new() -> Self {
        let recorder = PrometheusBuilder::new().build_recorder();

        Self {
            ticks_generated: TrackedCounter::register(
                &recorder,
                TICKS_GENERATED,
                "Price ticks that reached fault injection",
            ),
            ticks_suppressed: TrackedCounter::register(
                &recorder,
                TICKS_SUPPRESSED,
                "Oracle ticks suppressed by the publish gate",
            ),
            frames_sent: TrackedCounter::register(
                &recorder,
                FRAMES_SENT,
                "Broadcasts that were not dropped",
            ),
            frames_dropped: TrackedCounter::register(
                &recorder,
                FRAMES_DROPPED,
                "Ticks dropped by fault injection",
            ),
            frames_duplicated: TrackedCounter::register(
                &recorder,
                FRAMES_DUPLICATED,
                "Ticks broadcast a second time by fault injection",
            ),
            handle: recorder.handle(),
        }
    }

    pub fn record_generated(&self) {
        self.ticks_generated.increment();
    }

    pub fn record_suppressed(&self) {
        self.ticks_suppressed.increment();
    }

    pub fn record_sent(&self) {
        self.frames_sent.increment();
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.increment();
    }

    pub fn record_duplicated(&self) {
        self.frames_duplicated.increment();
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            ticks_generated: self.ticks_generated.get(),
            ticks_suppressed: self.ticks_suppressed.get(),
            frames_sent: self.frames_sent.get(),
            frames_dropped: self.frames_dropped.get(),
            frames_duplicated: self.frames_duplicated.get(),
        }
    }

    /// Body of the `/metrics` endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl Default for FeedCounters {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FeedCounters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FeedCounters").field(&self.snapshot()).finish()
    }
}
