//! Configuration types for feed-sim

use serde::Deserialize;
use std::net::SocketAddr;
use thiserror::Error;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub dex: DexConfig,
    pub oracle: OracleConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Settings shared by both feeds
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Simulated pairs; the first entry is used
    pub pairs: Vec<String>,
    #[serde(default)]
    pub price_model: PriceModel,
    pub price_start: f64,
    /// Annualized drift
    pub gbm_mu: f64,
    /// Annualized volatility
    pub gbm_sigma: f64,
    /// Expected jumps per year (jump_diffusion only)
    #[serde(default)]
    pub jump_lambda: f64,
    #[serde(default)]
    pub jump_mu: f64,
    #[serde(default)]
    pub jump_sigma: f64,
    /// Global seed every random stream is derived from
    pub seed: u64,
    #[serde(default = "default_cors_origins")]
    pub cors_allow_origins: Vec<String>,
}

/// Price process variant
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PriceModel {
    #[default]
    Gbm,
    JumpDiffusion,
}

/// Inclusive millisecond range
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct RangeMs {
    pub min: u64,
    pub max: u64,
}

impl RangeMs {
    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }
}

/// DEX feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DexConfig {
    pub http_bind: String,
    pub tick_ms: RangeMs,
    /// Injected delivery delay stamped on each tick
    pub delay_ms: RangeMs,
    pub p_drop: f64,
    pub p_dup: f64,
    #[serde(default)]
    pub burst_mode: bool,
    #[serde(default)]
    pub burst_on_ms: u64,
    #[serde(default)]
    pub burst_off_ms: u64,
    pub stale_after_ms: u64,
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

/// Oracle feed configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    pub http_bind: String,
    pub tick_ms: RangeMs,
    /// Publish when the price moved at least this many basis points
    pub deviation_bps: u32,
    /// Publish at least this often regardless of movement
    pub heartbeat_ms: u64,
    pub delay_ms: RangeMs,
    pub p_drop: f64,
    pub p_dup: f64,
    pub stale_after_ms: u64,
    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,
    /// JSON format for log aggregation
    Json,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Pretty,
        }
    }
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_subscriber_buffer() -> usize {
    256
}
fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration errors, all fatal at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("No trading pairs configured")]
    NoPairs,
    #[error("Invalid {field}: {value}")]
    InvalidValue { field: &'static str, value: f64 },
    #[error("Invalid probability {field}: {value} (expected 0..=1)")]
    InvalidProbability { field: &'static str, value: f64 },
    #[error("Invalid bind address for {field}: {addr}")]
    InvalidBind { field: &'static str, addr: String },
    #[error("subscriber_buffer for {0} must be at least 1")]
    EmptyBuffer(&'static str),
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the simulator cannot start with.
    ///
    /// Degenerate ranges (`min >= max`) and boundary probabilities are
    /// accepted; they have well-defined sampling behavior.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let server = &self.server;
        if server.pairs.is_empty() {
            return Err(ConfigError::NoPairs);
        }
        if !(server.price_start.is_finite() && server.price_start > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "price_start",
                value: server.price_start,
            });
        }
        check_finite("gbm_mu", server.gbm_mu)?;
        check_non_negative("gbm_sigma", server.gbm_sigma)?;
        check_non_negative("jump_lambda", server.jump_lambda)?;
        check_finite("jump_mu", server.jump_mu)?;
        check_non_negative("jump_sigma", server.jump_sigma)?;

        check_probability("dex.p_drop", self.dex.p_drop)?;
        check_probability("dex.p_dup", self.dex.p_dup)?;
        check_probability("oracle.p_drop", self.oracle.p_drop)?;
        check_probability("oracle.p_dup", self.oracle.p_dup)?;

        parse_bind("dex.http_bind", &self.dex.http_bind)?;
        parse_bind("oracle.http_bind", &self.oracle.http_bind)?;

        if self.dex.subscriber_buffer == 0 {
            return Err(ConfigError::EmptyBuffer("dex"));
        }
        if self.oracle.subscriber_buffer == 0 {
            return Err(ConfigError::EmptyBuffer("oracle"));
        }

        Ok(())
    }

    /// Pair simulated by both feeds
    pub fn pair(&self) -> &str {
        self.server.pairs.first().map(String::as_str).unwrap_or_default()
    }
}

impl ServerConfig {
    /// Origin echoed in `Access-Control-Allow-Origin`
    pub fn cors_origin(&self) -> &str {
        self.cors_allow_origins
            .first()
            .map(String::as_str)
            .unwrap_or("*")
    }
}

/// Parse a `host:port` bind address
pub fn parse_bind(field: &'static str, addr: &str) -> Result<SocketAddr, ConfigError> {
    addr.parse().map_err(|_| ConfigError::InvalidBind {
        field,
        addr: addr.to_string(),
    })
}

fn check_finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field, value })
    }
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue { field, value })
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidProbability { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        [server]
        pairs = ["ETH/USD"]
        price_model = "gbm"
        price_start = 3500.0
        gbm_mu = 0.0
        gbm_sigma = 0.8
        seed = 42

        [dex]
        http_bind = "127.0.0.1:8080"
        tick_ms = { min = 50, max = 250 }
        delay_ms = { min = 0, max = 25 }
        p_drop = 0.01
        p_dup = 0.005
        burst_mode = true
        burst_on_ms = 60
        burst_off_ms = 200
        stale_after_ms = 2000

        [oracle]
        http_bind = "127.0.0.1:8081"
        tick_ms = { min = 500, max = 1500 }
        deviation_bps = 50
        heartbeat_ms = 60000
        delay_ms = { min = 50, max = 400 }
        p_drop = 0.02
        p_dup = 0.0
        stale_after_ms = 90000

        [telemetry]
        log_level = "debug"
        log_format = "json"
    "#;

    #[test]
    fn test_config_deserialize() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.pair(), "ETH/USD");
        assert_eq!(config.server.price_model, PriceModel::Gbm);
        assert_eq!(config.dex.tick_ms, RangeMs::new(50, 250));
        assert!(config.dex.burst_mode);
        assert_eq!(config.oracle.deviation_bps, 50);
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.server.cors_origin(), "*");
        assert_eq!(config.dex.subscriber_buffer, 256);
        assert_eq!(config.oracle.subscriber_buffer, 256);
        assert_eq!(config.server.jump_lambda, 0.0);
    }

    #[test]
    fn test_jump_diffusion_model() {
        let toml = SAMPLE.replace(r#"price_model = "gbm""#, r#"price_model = "jump_diffusion""#);
        let config = Config::from_toml_str(&toml).unwrap();
        assert_eq!(config.server.price_model, PriceModel::JumpDiffusion);
    }

    #[test]
    fn test_missing_section_is_error() {
        let toml = SAMPLE.split("[oracle]").next().unwrap();
        assert!(matches!(
            Config::from_toml_str(toml),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_pairs_rejected() {
        let toml = SAMPLE.replace(r#"pairs = ["ETH/USD"]"#, "pairs = []");
        assert!(matches!(
            Config::from_toml_str(&toml),
            Err(ConfigError::NoPairs)
        ));
    }

    #[test]
    fn test_invalid_probability_rejected() {
        let toml = SAMPLE.replace("p_drop = 0.01", "p_drop = 1.5");
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidProbability {
                field: "dex.p_drop",
                ..
            }
        ));
    }

    #[test]
    fn test_boundary_probabilities_accepted() {
        let toml = SAMPLE
            .replace("p_drop = 0.01", "p_drop = 1.0")
            .replace("p_dup = 0.005", "p_dup = 0.0");
        assert!(Config::from_toml_str(&toml).is_ok());
    }

    #[test]
    fn test_degenerate_range_accepted() {
        let toml = SAMPLE.replace("tick_ms = { min = 50, max = 250 }", "tick_ms = { min = 100, max = 100 }");
        let config = Config::from_toml_str(&toml).unwrap();
        assert_eq!(config.dex.tick_ms, RangeMs::new(100, 100));
    }

    #[test]
    fn test_bad_bind_rejected() {
        let toml = SAMPLE.replace("127.0.0.1:8081", "localhost");
        let err = Config::from_toml_str(&toml).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid bind address for oracle.http_bind: localhost"
        );
    }

    #[test]
    fn test_non_positive_start_price_rejected() {
        let toml = SAMPLE.replace("price_start = 3500.0", "price_start = 0.0");
        assert!(matches!(
            Config::from_toml_str(&toml),
            Err(ConfigError::InvalidValue {
                field: "price_start",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_buffer_rejected() {
        let toml = SAMPLE.replace("stale_after_ms = 2000", "stale_after_ms = 2000\nsubscriber_buffer = 0");
        assert!(matches!(
            Config::from_toml_str(&toml),
            Err(ConfigError::EmptyBuffer("dex"))
        ));
    }

    #[test]
    fn test_config_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.seed, 42);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/config.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_bundled_example_is_valid() {
        let config = Config::from_toml_str(include_str!("../config.toml.example")).unwrap();
        assert!(!config.server.pairs.is_empty());
    }
}
