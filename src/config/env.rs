//! Environment variable names and value parsing
//!
//! ```bash
//! export DEFILLAMA_CACHE_TTL=600          # seconds, default 300
//! export DEFILLAMA_REQUEST_DELAY=0.25     # seconds between requests, default 0.1
//! export DEFILLAMA_REQUEST_TIMEOUT=15     # seconds, default 30
//! export DEFILLAMA_API_BASE=http://localhost:8080   # optional host overrides
//! ```

use crate::{Error, Result};

pub const CACHE_TTL_ENV: &str = "DEFILLAMA_CACHE_TTL";
pub const REQUEST_DELAY_ENV: &str = "DEFILLAMA_REQUEST_DELAY";
pub const REQUEST_TIMEOUT_ENV: &str = "DEFILLAMA_REQUEST_TIMEOUT";

pub const API_BASE_ENV: &str = "DEFILLAMA_API_BASE";
pub const COINS_BASE_ENV: &str = "DEFILLAMA_COINS_BASE";
pub const YIELDS_BASE_ENV: &str = "DEFILLAMA_YIELDS_BASE";
pub const STABLECOINS_BASE_ENV: &str = "DEFILLAMA_STABLECOINS_BASE";

pub(crate) fn parse_u64(key: &str, raw: &str) -> Result<u64> {
    raw.parse::<u64>().map_err(|e| {
        Error::Config(format!(
            "{} must be a non-negative integer, got '{}': {}",
            key, raw, e
        ))
    })
}

/// Fractional seconds; range checks happen in `Config::validate`
pub(crate) fn parse_seconds(key: &str, raw: &str) -> Result<f64> {
    let value = raw
        .parse::<f64>()
        .map_err(|e| Error::Config(format!("{} must be a number, got '{}': {}", key, raw, e)))?;
    if !value.is_finite() {
        return Err(Error::Config(format!(
            "{} must be a finite number, got '{}'",
            key, raw
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_seconds() {
        assert_eq!(parse_seconds(REQUEST_DELAY_ENV, "0.1").unwrap(), 0.1);
        assert_eq!(parse_seconds(REQUEST_TIMEOUT_ENV, "30").unwrap(), 30.0);
        assert!(parse_seconds(REQUEST_TIMEOUT_ENV, "inf").is_err());
        assert!(parse_seconds(REQUEST_TIMEOUT_ENV, "thirty").is_err());
    }

    #[test]
    fn parses_integers() {
        assert_eq!(parse_u64(CACHE_TTL_ENV, "300").unwrap(), 300);
        assert!(parse_u64(CACHE_TTL_ENV, "3.5").is_err());
    }
}
