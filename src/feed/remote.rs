//! Consumer side of a running feed
//!
//! `RemoteFeed` keeps one subscription alive across server restarts: every
//! new connection is answered with a fresh subscription acknowledgement,
//! which `SequenceTracker::observe_message` treats as the start of a new
//! sequence.

use super::{TickStream, WireMessage};
use crate::ws::WsError;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// WebSocket subscription to a feed server, e.g. `ws://127.0.0.1:8080/ws/ticks`
#[derive(Debug, Clone)]
pub struct RemoteFeed {
    url: String,
    max_failures: u32,
    initial_delay: Duration,
    max_delay: Duration,
}

/// How one connection ended
enum SessionEnd {
    Closed,
    Lost(String),
    ReceiverDropped,
}

impl RemoteFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_failures: 10,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }

    /// Consecutive failed connection attempts before giving up; 0 retries forever
    pub fn max_reconnects(mut self, n: u32) -> Self {
        self.max_failures = n;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Wait before reconnecting after `failures` consecutive failed attempts
    pub fn retry_delay(&self, failures: u32) -> Duration {
        let factor = 1u32
            .checked_shl(failures.saturating_sub(1))
            .unwrap_or(u32::MAX);
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Parse a text frame; anything that is not a feed message is ignored
    pub fn parse_message(msg: &str) -> Option<WireMessage> {
        match serde_json::from_str(msg) {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring unrecognised frame");
                None
            }
        }
    }

    async fn stream_once(&self, tx: &mpsc::Sender<WireMessage>) -> Result<SessionEnd, WsError> {
        let (mut socket, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| WsError::ConnectionFailed(e.to_string()))?;
        tracing::info!(url = %self.url, "Feed connected");

        while let Some(frame) = socket.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    let Some(message) = Self::parse_message(&text) else {
                        continue;
                    };
                    if tx.send(message).await.is_err() {
                        let _ = socket.close(None).await;
                        return Ok(SessionEnd::ReceiverDropped);
                    }
                }
                Ok(Message::Close(_)) => return Ok(SessionEnd::Closed),
                Ok(_) => {}
                Err(e) => return Ok(SessionEnd::Lost(e.to_string())),
            }
        }

        Ok(SessionEnd::Closed)
    }

    async fn run(&self, tx: mpsc::Sender<WireMessage>) -> Result<(), WsError> {
        let mut failures = 0u32;

        loop {
            match self.stream_once(&tx).await {
                Ok(SessionEnd::ReceiverDropped) => return Ok(()),
                Ok(SessionEnd::Closed) => {
                    tracing::info!(url = %self.url, "Feed closed the connection");
                    failures = 0;
                }
                Ok(SessionEnd::Lost(reason)) => {
                    tracing::warn!(url = %self.url, reason = %reason, "Feed connection lost");
                    failures = 0;
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(url = %self.url, error = %e, attempt = failures, "Feed unreachable");
                    if self.max_failures > 0 && failures >= self.max_failures {
                        return Err(WsError::RetriesExhausted(failures));
                    }
                }
            }

            if tx.is_closed() {
                return Ok(());
            }
            tokio::time::sleep(self.retry_delay(failures.max(1))).await;
        }
    }
}

#[async_trait]
impl TickStream for RemoteFeed {
    async fn subscribe(&self) -> anyhow::Result<mpsc::Receiver<WireMessage>> {
        let (tx, rx) = mpsc::channel(1024);
        let feed = self.clone();

        tracing::info!(url = %self.url, "Subscribing to feed");

        tokio::spawn(async move {
            if let Err(e) = feed.run(tx).await {
                tracing::error!(url = %feed.url, error = %e, "Feed subscription ended");
            }
        });

        Ok(rx)
    }
}

/// Where a received sequence number sits relative to the ones before it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceObservation {
    /// First message of a session, or exactly one past the last
    InOrder,
    /// Same number as the last message
    Duplicate,
    /// Numbers were skipped (dropped or suppressed ticks)
    Gap { missing: u64 },
    /// Older than the last message
    Stale,
}

/// Tracks `src_seq` continuity of one subscription.
///
/// Totals accumulate across sessions; continuity restarts with each
/// subscription acknowledgement.
#[derive(Debug, Default, Clone)]
pub struct SequenceTracker {
    last: Option<u64>,
    sessions: u64,
    received: u64,
    duplicates: u64,
    missing: u64,
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track one wire message; an acknowledgement starts a new session
    pub fn observe_message(&mut self, message: &WireMessage) -> Option<SequenceObservation> {
        match message {
            WireMessage::Subscription { .. } => {
                self.reset();
                None
            }
            WireMessage::Price(tick) => Some(self.observe(tick.sequence)),
        }
    }

    pub fn observe(&mut self, seq: u64) -> SequenceObservation {
        self.received += 1;

        let observation = match self.last {
            None => SequenceObservation::InOrder,
            Some(last) if seq == last => SequenceObservation::Duplicate,
            Some(last) if seq < last => SequenceObservation::Stale,
            Some(last) if seq == last + 1 => SequenceObservation::InOrder,
            Some(last) => SequenceObservation::Gap {
                missing: seq - last - 1,
            },
        };

        match observation {
            SequenceObservation::Duplicate => self.duplicates += 1,
            SequenceObservation::Gap { missing } => self.missing += missing,
            _ => {}
        }
        if observation != SequenceObservation::Stale {
            self.last = Some(seq);
        }

        observation
    }

    /// Forget the last sequence number (new connection)
    pub fn reset(&mut self) {
        self.last = None;
        self.sessions += 1;
    }

    pub fn last_seq(&self) -> Option<u64> {
        self.last
    }

    /// Acknowledged connections seen so far
    pub fn sessions(&self) -> u64 {
        self.sessions
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    /// Total sequence numbers skipped so far
    pub fn missing(&self) -> u64 {
        self.missing
    }
}
