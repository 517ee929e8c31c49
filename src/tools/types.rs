//! Tool trait and shared argument handling

use crate::filter::{FilterSpec, SortOrder};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Results shown when the caller does not pass `limit`
pub const DEFAULT_LIMIT: usize = 20;

/// Data points shown by the history tools when `points` is not passed
pub const DEFAULT_POINTS: usize = 10;

/// A named operation callable from the MCP host.
///
/// `execute` always yields text; the registry turns errors into text too.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the arguments object
    fn input_schema(&self) -> Value;

    async fn execute(&self, args: Value) -> Result<String>;
}

/// What a tool call hands back to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(text: String) -> Self {
        Self {
            text,
            is_error: false,
        }
    }

    pub fn error(text: String) -> Self {
        Self {
            text,
            is_error: true,
        }
    }
}

pub fn schema_of<T: JsonSchema>() -> Value {
    schemars::schema_for!(T).to_value()
}

/// Deserialize tool arguments; `null` counts as an empty object
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| Error::validation(e.to_string()))
}

/// Unix seconds, or a `YYYY-MM-DD` date (midnight UTC)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum TimestampArg {
    Unix(i64),
    Text(String),
}

impl TimestampArg {
    pub fn to_unix(&self) -> Result<i64> {
        let secs = match self {
            TimestampArg::Unix(secs) => *secs,
            TimestampArg::Text(raw) => {
                let raw = raw.trim();
                if raw.contains('-') {
                    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                        .ok()
                        .and_then(|d| d.and_hms_opt(0, 0, 0))
                        .map(|dt| dt.and_utc().timestamp())
                        .ok_or_else(|| {
                            Error::validation(format!(
                                "Invalid date '{}'. Use a Unix timestamp or YYYY-MM-DD",
                                raw
                            ))
                        })?
                } else {
                    raw.parse::<i64>().map_err(|_| {
                        Error::validation(format!(
                            "Invalid timestamp '{}'. Use a Unix timestamp or YYYY-MM-DD",
                            raw
                        ))
                    })?
                }
            }
        };
        if secs < 0 {
            return Err(Error::validation(format!(
                "Timestamp must not be negative, got {}",
                secs
            )));
        }
        Ok(secs)
    }
}

/// Trimmed identifier made of ASCII alphanumerics plus `extra`
pub fn identifier(what: &str, raw: &str, extra: &[char]) -> Result<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("'{}' must not be empty", what)));
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && !extra.contains(c))
    {
        return Err(Error::validation(format!(
            "'{}' contains an invalid character '{}': {}",
            what, bad, value
        )));
    }
    Ok(value.to_string())
}

/// Normalize a comma-separated coin list: trimmed, deduplicated, sorted.
///
/// Coins look like `ethereum:0xabc...`, `coingecko:bitcoin` or a bare
/// symbol understood by DefiLlama.
pub fn coin_list(raw: &str) -> Result<String> {
    let mut coins = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        coins.push(identifier("coins", part, &[':', '-', '_', '.'])?);
    }
    if coins.is_empty() {
        return Err(Error::validation(
            "'coins' must list at least one coin, e.g. coingecko:bitcoin",
        ));
    }
    coins.sort();
    coins.dedup();
    Ok(coins.join(","))
}

/// At least one point, defaulting to [`DEFAULT_POINTS`]
pub fn points(requested: Option<usize>) -> Result<usize> {
    match requested {
        Some(0) => Err(Error::validation("'points' must be at least 1")),
        Some(n) => Ok(n),
        None => Ok(DEFAULT_POINTS),
    }
}

/// Sort and limit part of a [`FilterSpec`].
///
/// `aliases` maps friendly names (`tvl`) onto upstream field names
/// (`tvlUsd`); unknown names pass through untouched.
pub fn listing(
    sort_by: Option<&str>,
    default_sort: &str,
    aliases: &[(&str, &str)],
    order: Option<&str>,
    limit: Option<usize>,
) -> Result<FilterSpec> {
    let field = match sort_by.map(str::trim) {
        None | Some("") => default_sort.to_string(),
        Some(name) => aliases
            .iter()
            .find(|(alias, _)| alias.eq_ignore_ascii_case(name))
            .map(|(_, field)| field.to_string())
            .unwrap_or_else(|| name.to_string()),
    };
    let order = match order {
        Some(raw) => raw.parse::<SortOrder>()?,
        None => SortOrder::default(),
    };
    Ok(FilterSpec::new()
        .sort_by(&field, order)
        .limit(Some(limit.unwrap_or(DEFAULT_LIMIT))))
}

/// "Found N x" plus "(showing M)" when the limit cut the list
pub fn found_line(total: usize, shown: usize, noun: &str) -> String {
    if shown < total {
        format!("Found {} {} (showing {})", total, noun, shown)
    } else {
        format!("Found {} {}", total, noun)
    }
}
