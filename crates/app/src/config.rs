//! Process configuration loaded from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use domain::Money;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Node configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `pretty` or `json` (default: `pretty`)
/// - `METRICS_ADDR`: Prometheus listener address (default: none, no listener)
/// - `CARD_REPLY_TIMEOUT_MS`: how long a card charge waits for its reply (default: `3000`)
/// - `CARD_APPROVAL_LIMIT`: highest amount the card gateway approves (default: `1000000`)
/// - `FOREIGN_APPROVAL_LIMIT`: highest amount foreign settlement approves (default: `1000`)
/// - `SAGA_SETTLE_TIMEOUT_MS`: how long callers wait for a saga to finish (default: `5000`)
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub metrics_addr: Option<SocketAddr>,
    pub card_reply_timeout: Duration,
    pub card_approval_limit: Money,
    pub foreign_approval_limit: Money,
    pub saga_settle_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |name: &str| lookup(name).and_then(|v| v.trim().parse::<i64>().ok());
        let millis = |name: &str| {
            lookup(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
        };

        Self {
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .and_then(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.log_format),
            metrics_addr: lookup("METRICS_ADDR").and_then(|v| v.trim().parse().ok()),
            card_reply_timeout: millis("CARD_REPLY_TIMEOUT_MS")
                .unwrap_or(defaults.card_reply_timeout),
            card_approval_limit: parsed("CARD_APPROVAL_LIMIT")
                .map(Money::new)
                .unwrap_or(defaults.card_approval_limit),
            foreign_approval_limit: parsed("FOREIGN_APPROVAL_LIMIT")
                .map(Money::new)
                .unwrap_or(defaults.foreign_approval_limit),
            saga_settle_timeout: millis("SAGA_SETTLE_TIMEOUT_MS")
                .unwrap_or(defaults.saga_settle_timeout),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_addr: None,
            card_reply_timeout: Duration::from_millis(3000),
            card_approval_limit: Money::new(1_000_000),
            foreign_approval_limit: saga::ports::foreign::DEFAULT_FOREIGN_APPROVAL_LIMIT,
            saga_settle_timeout: Duration::from_millis(5000),
        }
    }
}
