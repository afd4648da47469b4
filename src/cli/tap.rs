//! Tap command implementation

use crate::feed::{RemoteFeed, SequenceObservation, SequenceTracker, TickStream, WireMessage};
use clap::Args;

#[derive(Args, Debug)]
pub struct TapArgs {
    /// Feed WebSocket URL, e.g. ws://127.0.0.1:8080/ws/ticks
    #[arg(short, long)]
    pub url: String,

    /// Stop after this many price messages
    #[arg(short = 'n', long)]
    pub count: Option<u64>,
}

impl TapArgs {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let feed = RemoteFeed::new(self.url.as_str());
        let mut rx = feed.subscribe().await?;
        let mut tracker = SequenceTracker::new();

        while let Some(message) = rx.recv().await {
            let observation = tracker.observe_message(&message);

            match &message {
                WireMessage::Subscription { id, status } => {
                    println!("subscription {id}: {status} (session {})", tracker.sessions());
                }
                WireMessage::Price(tick) => {
                    println!(
                        "{} {} {} {:.4} seq={} delay_ms={}{}",
                        tick.timestamp_ms,
                        tick.source,
                        tick.pair,
                        tick.price,
                        tick.sequence,
                        tick.injected_delay_ms,
                        if tick.stale { " STALE" } else { "" }
                    );

                    match observation {
                        Some(SequenceObservation::Duplicate) => {
                            tracing::warn!(seq = tick.sequence, "Duplicate frame");
                        }
                        Some(SequenceObservation::Gap { missing }) => {
                            tracing::warn!(seq = tick.sequence, missing, "Sequence gap");
                        }
                        Some(SequenceObservation::Stale) => {
                            tracing::warn!(seq = tick.sequence, "Out-of-order frame");
                        }
                        Some(SequenceObservation::InOrder) | None => {}
                    }
                }
            }

            if self.count.is_some_and(|n| tracker.received() >= n) {
                break;
            }
        }

        println!(
            "sessions={} received={} duplicates={} missing={} last_seq={:?}",
            tracker.sessions(),
            tracker.received(),
            tracker.duplicates(),
            tracker.missing(),
            tracker.last_seq()
        );
        Ok(())
    }
}
