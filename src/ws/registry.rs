//! Subscriber registry and fan-out
//!
//! Membership changes and broadcast snapshots share one lock, so a
//! broadcast never observes a half-registered subscriber. Delivery is
//! best effort: a failing subscriber is logged and skipped, never removed
//! here. Removal belongs to the subscriber's own session.

use super::types::DeliveryError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Identity of one registered subscriber
pub type SubscriberId = Uuid;

/// Outbound transport of one subscriber.
///
/// `deliver` must not block: the scheduler calls it inline.
pub trait TickSink: Send + Sync {
    fn deliver(&self, frame: &str) -> Result<(), DeliveryError>;
}

/// Sink backed by a bounded channel drained by the session's writer task
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    /// Create a sink and the receiver its writer task drains
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl TickSink for ChannelSink {
    fn deliver(&self, frame: &str) -> Result<(), DeliveryError> {
        self.tx.try_send(frame.to_string()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }
}

/// Result of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

/// Concurrency-safe set of live subscribers
#[derive(Default)]
pub struct SubscriberRegistry {
    members: Mutex<HashMap<SubscriberId, Arc<dyn TickSink>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a subscriber and return its identity
    pub fn add(&self, sink: Arc<dyn TickSink>) -> SubscriberId {
        let id = Uuid::new_v4();
        self.members.lock().insert(id, sink);
        id
    }

    /// Remove a subscriber; false if it was not registered
    pub fn remove(&self, id: &SubscriberId) -> bool {
        self.members.lock().remove(id).is_some()
    }

    pub fn contains(&self, id: &SubscriberId) -> bool {
        self.members.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// Write `frame` to every current member independently
    pub fn broadcast(&self, frame: &str) -> BroadcastReport {
        let snapshot: Vec<(SubscriberId, Arc<dyn TickSink>)> = self
            .members
            .lock()
            .iter()
            .map(|(id, sink)| (*id, Arc::clone(sink)))
            .collect();

        let mut report = BroadcastReport::default();
        for (id, sink) in snapshot {
            match sink.deliver(frame) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(subscriber = %id, error = %e, "Failed to broadcast to subscriber");
                }
            }
        }
        report
    }
}

impl std::fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("members", &self.len())
            .finish()
    }
}
