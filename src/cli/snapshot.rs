//! Snapshot command implementation

use crate::feed::PriceSnapshot;
use clap::Args;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// Snapshot endpoint, e.g. http://127.0.0.1:8080/prices/snapshot
    #[arg(short, long)]
    pub url: String,
}

impl SnapshotArgs {
    pub async fn execute(&self) -> anyhow::Result<()> {
        let snapshot = fetch_snapshot(&self.url).await?;

        println!("server_time: {}", snapshot.server_time);
        if snapshot.prices.is_empty() {
            println!("  (no ticks published yet)");
        }
        for tick in &snapshot.prices {
            println!(
                "  {} {} {:.4} seq={} delay_ms={} stale={}",
                tick.source, tick.pair, tick.price, tick.sequence, tick.injected_delay_ms, tick.stale
            );
        }
        Ok(())
    }
}

/// GET and decode a snapshot endpoint
pub async fn fetch_snapshot(url: &str) -> anyhow::Result<PriceSnapshot> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let snapshot = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<PriceSnapshot>()
        .await?;

    Ok(snapshot)
}
