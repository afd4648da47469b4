//! Feed server commands

use crate::config::{parse_bind, Config};
use crate::feed::FeedKind;
use crate::server::FeedServer;
use clap::Args;
use tokio::sync::watch;

#[derive(Args, Debug)]
pub struct FeedArgs {
    /// Override the configured bind address (host:port)
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Override the configured seed
    #[arg(short, long)]
    pub seed: Option<u64>,
}

impl FeedArgs {
    pub async fn execute(&self, config: &Config, kind: FeedKind) -> anyhow::Result<()> {
        let mut config = config.clone();
        if let Some(seed) = self.seed {
            config.server.seed = seed;
        }

        let configured = match kind {
            FeedKind::Dex => config.dex.http_bind.as_str(),
            FeedKind::Oracle => config.oracle.http_bind.as_str(),
        };
        let addr = parse_bind("--bind", self.bind.as_deref().unwrap_or(configured))?;

        let server = FeedServer::bind(&config, kind, addr).await?;
        tracing::info!(
            feed = %kind,
            seed = config.server.seed,
            pair = config.pair(),
            "Starting feed"
        );

        server.serve(shutdown_signal()).await
    }
}

#[derive(Args, Debug)]
pub struct AllArgs {
    /// Override the configured seed
    #[arg(short, long)]
    pub seed: Option<u64>,
}

impl AllArgs {
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut config = config.clone();
        if let Some(seed) = self.seed {
            config.server.seed = seed;
        }

        let dex = FeedServer::bind(
            &config,
            FeedKind::Dex,
            parse_bind("dex.http_bind", &config.dex.http_bind)?,
        )
        .await?;
        let oracle = FeedServer::bind(
            &config,
            FeedKind::Oracle,
            parse_bind("oracle.http_bind", &config.oracle.http_bind)?,
        )
        .await?;

        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            shutdown_signal().await;
            let _ = stop_tx.send(true);
        });

        let (dex_result, oracle_result) = tokio::join!(
            dex.serve(wait_for_stop(stop_rx.clone())),
            oracle.serve(wait_for_stop(stop_rx)),
        );
        dex_result?;
        oracle_result?;
        Ok(())
    }
}

async fn wait_for_stop(mut rx: watch::Receiver<bool>) {
    // A dropped sender also means stop
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Resolves on Ctrl-C
pub async fn shutdown_signal() {
    wait_for_signal(tokio::signal::ctrl_c()).await
}

/// Resolves when `signal` fires. If no handler could be installed the
/// feeds keep running until the process is killed.
async fn wait_for_signal<F>(signal: F)
where
    F: std::future::Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
