//! Configuration for the DefiLlama MCP server
//!
//! Values come from three layers, later layers winning:
//! 1. Built-in defaults
//! 2. An optional JSON file (`--config`)
//! 3. `DEFILLAMA_*` environment variables (see [`env`])
//!
//! Invalid values are rejected when the config is loaded so the server
//! never starts with a half-understood setup.

pub mod env;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

pub use env::{
    API_BASE_ENV, CACHE_TTL_ENV, COINS_BASE_ENV, REQUEST_DELAY_ENV, REQUEST_TIMEOUT_ENV,
    STABLECOINS_BASE_ENV, YIELDS_BASE_ENV,
};

pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_REQUEST_DELAY_SECS: f64 = 0.1;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: f64 = 30.0;
pub const MAX_REQUEST_DELAY_SECS: f64 = 60.0;
pub const MAX_REQUEST_TIMEOUT_SECS: f64 = 600.0;

/// DefiLlama serves its data from several hosts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Host {
    /// TVL, chains, DEX volumes
    Api,
    /// Token prices and block lookup
    Coins,
    /// Yield pools
    Yields,
    Stablecoins,
}

impl Host {
    pub fn name(&self) -> &'static str {
        match self {
            Host::Api => "api",
            Host::Coins => "coins",
            Host::Yields => "yields",
            Host::Stablecoins => "stablecoins",
        }
    }
}

/// Base URL per upstream host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamEndpoints {
    pub api: String,
    pub coins: String,
    pub yields: String,
    pub stablecoins: String,
}

impl UpstreamEndpoints {
    pub fn base(&self, host: Host) -> &str {
        match host {
            Host::Api => &self.api,
            Host::Coins => &self.coins,
            Host::Yields => &self.yields,
            Host::Stablecoins => &self.stablecoins,
        }
    }

    /// Point every host at the same base URL (local mirrors, tests)
    pub fn uniform(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            api: base.clone(),
            coins: base.clone(),
            yields: base.clone(),
            stablecoins: base,
        }
    }

    fn validate(&self) -> Result<()> {
        for host in [Host::Api, Host::Coins, Host::Yields, Host::Stablecoins] {
            let raw = self.base(host);
            let url = Url::parse(raw).map_err(|e| {
                Error::Config(format!("Invalid {} base URL '{}': {}", host.name(), raw, e))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::Config(format!(
                    "{} base URL must be http or https, got '{}'",
                    host.name(),
                    raw
                )));
            }
        }
        Ok(())
    }
}

impl Default for UpstreamEndpoints {
    fn default() -> Self {
        Self {
            api: "https://api.llama.fi".to_string(),
            coins: "https://coins.llama.fi".to_string(),
            yields: "https://yields.llama.fi".to_string(),
            stablecoins: "https://stablecoins.llama.fi".to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lifetime of a cached upstream response (seconds)
    pub cache_ttl_secs: u64,
    /// Minimum spacing between outbound requests (seconds)
    pub request_delay_secs: f64,
    /// Per-request timeout (seconds)
    pub request_timeout_secs: f64,
    /// Upstream base URLs
    pub endpoints: UpstreamEndpoints,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            request_delay_secs: DEFAULT_REQUEST_DELAY_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            endpoints: UpstreamEndpoints::default(),
        }
    }
}

impl Config {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Load an optional JSON file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let base = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        base.with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Cannot parse config file {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `DEFILLAMA_*` overrides read through `lookup` and validate the result
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(raw) = lookup(CACHE_TTL_ENV) {
            self.cache_ttl_secs = env::parse_u64(CACHE_TTL_ENV, &raw)?;
        }
        if let Some(raw) = lookup(REQUEST_DELAY_ENV) {
            self.request_delay_secs = env::parse_seconds(REQUEST_DELAY_ENV, &raw)?;
        }
        if let Some(raw) = lookup(REQUEST_TIMEOUT_ENV) {
            self.request_timeout_secs = env::parse_seconds(REQUEST_TIMEOUT_ENV, &raw)?;
        }
        if let Some(url) = lookup(API_BASE_ENV) {
            self.endpoints.api = url;
        }
        if let Some(url) = lookup(COINS_BASE_ENV) {
            self.endpoints.coins = url;
        }
        if let Some(url) = lookup(YIELDS_BASE_ENV) {
            self.endpoints.yields = url;
        }
        if let Some(url) = lookup(STABLECOINS_BASE_ENV) {
            self.endpoints.stablecoins = url;
        }

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.request_delay_secs < 0.0 {
            return Err(Error::Config(format!(
                "request delay must be a non-negative number of seconds, got {}",
                self.request_delay_secs
            )));
        }
        if self.request_timeout_secs <= 0.0 {
            return Err(Error::Config(format!(
                "request timeout must be a positive number of seconds, got {}",
                self.request_timeout_secs
            )));
        }
        bounded_seconds(
            "request delay",
            self.request_delay_secs,
            MAX_REQUEST_DELAY_SECS,
        )?;
        bounded_seconds(
            "request timeout",
            self.request_timeout_secs,
            MAX_REQUEST_TIMEOUT_SECS,
        )?;
        self.endpoints.validate()
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_delay_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_REQUEST_DELAY_SECS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.request_timeout_secs)
            .unwrap_or_else(|_| Duration::from_secs_f64(DEFAULT_REQUEST_TIMEOUT_SECS))
    }
}

/// `secs` must convert to a [`Duration`] no longer than `max`
fn bounded_seconds(what: &str, secs: f64, max: f64) -> Result<()> {
    Duration::try_from_secs_f64(secs)
        .map_err(|e| Error::Config(format!("{} of {} seconds is not usable: {}", what, secs, e)))?;
    if secs > max {
        return Err(Error::Config(format!(
            "{} must be at most {} seconds, got {}",
            what, max, secs
        )));
    }
    Ok(())
}
