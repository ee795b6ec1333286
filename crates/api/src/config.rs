//! Application configuration loaded from environment variables.

use std::time::Duration;

use thiserror::Error;

use tradeflow_infra::RetryPolicy;
use tradeflow_observability::{LogConfig, LogFormat};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("{0} is required when GATEWAY_MODE=http")]
    Missing(&'static str),
}

/// How finalized orders reach the stock and accounting ledgers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayMode {
    /// Call the ledgers hosted by this process.
    InProcess,
    /// POST to remote instances exposing the ledger endpoints.
    Http {
        inventory_url: String,
        accounting_url: String,
    },
}

/// Server configuration.
///
/// Reads from environment variables:
/// - `HOST`, `PORT` (default `0.0.0.0:8080`)
/// - `RUST_LOG` (default `info`), `LOG_FORMAT` (`json` | `pretty`)
/// - `GATEWAY_MODE` (`in_process` | `http`), `INVENTORY_URL`, `ACCOUNTING_URL`
/// - `GATEWAY_TIMEOUT_MS` (5000)
/// - `RELAY_MAX_ATTEMPTS` (5), `RELAY_BASE_DELAY_MS` (200),
///   `RELAY_MAX_DELAY_MS` (30000), `RELAY_POLL_INTERVAL_MS` (500)
/// - `SUPPLIERS`, `CUSTOMERS`: directory seed, `id:name` comma-separated
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log: LogConfig,
    pub gateway: GatewayMode,
    pub gateway_timeout: Duration,
    pub retry: RetryPolicy,
    pub poll_interval: Duration,
    pub suppliers: Vec<(u64, String)>,
    pub customers: Vec<(u64, String)>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log: LogConfig::default(),
            gateway: GatewayMode::InProcess,
            gateway_timeout: Duration::from_millis(5000),
            retry: RetryPolicy::default(),
            poll_interval: Duration::from_millis(500),
            suppliers: vec![(1, "Proveedor General".to_string())],
            customers: vec![(1, "Cliente General".to_string())],
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let log = LogConfig {
            filter: get("RUST_LOG").unwrap_or(defaults.log.filter),
            format: match get("LOG_FORMAT") {
                Some(v) => v
                    .parse::<LogFormat>()
                    .map_err(|_| ConfigError::Invalid { key: "LOG_FORMAT", value: v })?,
                None => defaults.log.format,
            },
        };

        let gateway = match get("GATEWAY_MODE").as_deref().map(str::to_ascii_lowercase) {
            None => GatewayMode::InProcess,
            Some(mode) if mode == "in_process" || mode == "in-process" => GatewayMode::InProcess,
            Some(mode) if mode == "http" => GatewayMode::Http {
                inventory_url: get("INVENTORY_URL").ok_or(ConfigError::Missing("INVENTORY_URL"))?,
                accounting_url: get("ACCOUNTING_URL").ok_or(ConfigError::Missing("ACCOUNTING_URL"))?,
            },
            Some(mode) => {
                return Err(ConfigError::Invalid {
                    key: "GATEWAY_MODE",
                    value: mode,
                });
            }
        };

        let retry = RetryPolicy::new(
            parse_or(&get, "RELAY_MAX_ATTEMPTS", defaults.retry.max_attempts)?,
            millis_or(&get, "RELAY_BASE_DELAY_MS", defaults.retry.base_delay)?,
            millis_or(&get, "RELAY_MAX_DELAY_MS", defaults.retry.max_delay)?,
        );

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(&get, "PORT", defaults.port)?,
            log,
            gateway,
            gateway_timeout: millis_or(&get, "GATEWAY_TIMEOUT_MS", defaults.gateway_timeout)?,
            retry,
            poll_interval: millis_or(&get, "RELAY_POLL_INTERVAL_MS", defaults.poll_interval)?,
            suppliers: match get("SUPPLIERS") {
                Some(v) => parse_directory("SUPPLIERS", &v)?,
                None => defaults.suppliers,
            },
            customers: match get("CUSTOMERS") {
                Some(v) => parse_directory("CUSTOMERS", &v)?,
                None => defaults.customers,
            },
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { key, value: v }),
        None => Ok(default),
    }
}

fn millis_or<G>(get: &G, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(v) => v
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::Invalid { key, value: v }),
        None => Ok(default),
    }
}

/// `1:Distribuidora Lima,2:Mayorista Norte`
fn parse_directory(key: &'static str, raw: &str) -> Result<Vec<(u64, String)>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let invalid = || ConfigError::Invalid {
                key,
                value: part.to_string(),
            };
            let (id, name) = part.split_once(':').ok_or_else(invalid)?;
            let id = id.trim().parse::<u64>().map_err(|_| invalid())?;
            let name = name.trim();
            if name.is_empty() {
                return Err(invalid());
            }
            Ok((id, name.to_string()))
        })
        .collect()
}
