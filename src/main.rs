use clap::Parser;
use feed_sim::cli::{Cli, Commands};
use feed_sim::config::{Config, ConfigError};
use feed_sim::feed::FeedKind;

const BUNDLED_CONFIG: &str = include_str!("../config.toml.example");

fn load_config(path: &str) -> anyhow::Result<Config> {
    match Config::load(path) {
        Ok(config) => Ok(config),
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            eprintln!("Warning: config file {path} not found, using bundled defaults");
            Ok(Config::from_toml_str(BUNDLED_CONFIG)?)
        }
        Err(e) => Err(anyhow::anyhow!("Invalid config {path}: {e}")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;

    // Initialize telemetry
    feed_sim::telemetry::init_telemetry(&config.telemetry)?;

    match cli.command {
        Commands::Dex(args) => {
            args.execute(&config, FeedKind::Dex).await?;
        }
        Commands::Oracle(args) => {
            args.execute(&config, FeedKind::Oracle).await?;
        }
        Commands::All(args) => {
            args.execute(&config).await?;
        }
        Commands::Tap(args) => {
            args.execute().await?;
        }
        Commands::Snapshot(args) => {
            args.execute().await?;
        }
        Commands::Config => {
            let server = &config.server;
            println!("Current configuration:");
            println!(
                "  Server: pair={} model={:?} start={} mu={} sigma={} seed={}",
                config.pair(),
                server.price_model,
                server.price_start,
                server.gbm_mu,
                server.gbm_sigma,
                server.seed
            );
            println!(
                "  DEX: bind={} tick={}..{}ms delay={}..{}ms p_drop={} p_dup={} burst={}",
                config.dex.http_bind,
                config.dex.tick_ms.min,
                config.dex.tick_ms.max,
                config.dex.delay_ms.min,
                config.dex.delay_ms.max,
                config.dex.p_drop,
                config.dex.p_dup,
                config.dex.burst_mode
            );
            println!(
                "  Oracle: bind={} tick={}..{}ms deviation={}bps heartbeat={}ms p_drop={} p_dup={}",
                config.oracle.http_bind,
                config.oracle.tick_ms.min,
                config.oracle.tick_ms.max,
                config.oracle.deviation_bps,
                config.oracle.heartbeat_ms,
                config.oracle.p_drop,
                config.oracle.p_dup
            );
            println!(
                "  Telemetry: level={} format={:?}",
                config.telemetry.log_level, config.telemetry.log_format
            );
        }
    }

    Ok(())
}
