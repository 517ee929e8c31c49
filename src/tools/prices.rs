//! Token price tools and block lookup (`coins` host)

use crate::client::ApiRequest;
use crate::config::Host;
use crate::filter::{self, FilterSpec, SortOrder};
use crate::format::{self, CellKind, Column};
use crate::llama::DefiLlama;
use crate::record::RawRecord;
use crate::tools::types::{coin_list, identifier, parse_args, schema_of, TimestampArg, Tool};
use crate::tools::{
    TOOL_GET_BLOCK, TOOL_GET_CURRENT_PRICES, TOOL_GET_HISTORICAL_PRICES, TOOL_GET_PRICE_CHANGES,
};
use crate::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

const PRICE_COLUMNS: &[Column] = &[
    Column::new("Coin", "id", CellKind::Text),
    Column::new("Symbol", "symbol", CellKind::Text),
    Column::new("Price", "price", CellKind::Price),
    Column::new("Confidence", "confidence", CellKind::Number),
    Column::new("Decimals", "decimals", CellKind::Text),
    Column::new("As of", "timestamp", CellKind::Timestamp),
];

/// Flatten `{"coins": {id: {...}}}` into records carrying their `id`
fn coin_records<F>(payload: &Value, fields_of: F) -> Result<Vec<RawRecord>>
where
    F: Fn(&Value) -> Option<Map<String, Value>>,
{
    let coins = payload
        .get("coins")
        .and_then(Value::as_object)
        .ok_or_else(|| Error::upstream_format("response is missing 'coins'"))?;

    Ok(coins
        .iter()
        .filter_map(|(id, value)| {
            let fields = fields_of(value)?;
            let mut map = Map::with_capacity(fields.len() + 1);
            map.insert("id".to_string(), json!(id));
            map.extend(fields);
            Some(RawRecord::new(map))
        })
        .collect())
}

fn price_records(payload: &Value) -> Result<Vec<RawRecord>> {
    let records = coin_records(payload, |value| value.as_object().cloned())?;
    Ok(filter::apply(
        &records,
        &FilterSpec::new().sort_by("id", SortOrder::Asc),
    ))
}

fn price_request(segments: Vec<String>, search_width: Option<&str>) -> Result<ApiRequest> {
    let mut request = ApiRequest::new(Host::Coins, segments);
    if let Some(width) = search_width.map(str::trim).filter(|w| !w.is_empty()) {
        request = request.param("searchWidth", identifier("search_width", width, &[])?);
    }
    Ok(request)
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CurrentPricesInput {
    /// Comma-separated coins: "chain:address" (ethereum:0x...), "coingecko:id" or a symbol
    pub coins: String,
    /// How far back to look for a price, e.g. "4h" or "600" (seconds)
    pub search_width: Option<String>,
}

/// Current USD prices
pub struct CurrentPricesTool {
    llama: DefiLlama,
}

impl CurrentPricesTool {
    pub fn new(llama: DefiLlama) -> Self {
        Self { llama }
    }
}

#[async_trait]
impl Tool for CurrentPricesTool {
    fn name(&self) -> &'static str {
        TOOL_GET_CURRENT_PRICES
    }

    fn description(&self) -> &'static str {
        "Gets current USD prices for tokens. Coins are comma-separated, e.g. \
         \"coingecko:bitcoin,ethereum:0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2\"."
    }

    fn input_schema(&self) -> Value {
        schema_of::<CurrentPricesInput>()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let input: CurrentPricesInput = parse_args(args)?;
        let coins = coin_list(&input.coins)?;
        let request = price_request(
            vec!["prices".into(), "current".into(), coins],
            input.search_width.as_deref(),
        )?;

        let payload = self.llama.fetch(&request).await?;
        let records = price_records(&payload)?;

        Ok(format::table("Current Token Prices", &[], PRICE_COLUMNS, &records))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HistoricalPricesInput {
    /// Unix timestamp (seconds) or a date as "YYYY-MM-DD"
    pub timestamp: TimestampArg,
    /// Comma-separated coins, same format as get_current_prices
    pub coins: String,
    /// How far around the timestamp to look for a price, e.g. "4h"
    pub search_width: Option<String>,
}

/// USD prices at a point in time
pub struct HistoricalPricesTool {
    llama: DefiLlama,
}

impl HistoricalPricesTool {
    pub fn new(llama: DefiLlama) -> Self {
        Self { llama }
    }
}

#[async_trait]
impl Tool for HistoricalPricesTool {
    fn name(&self) -> &'static str {
        TOOL_GET_HISTORICAL_PRICES
    }

    fn description(&self) -> &'static str {
        "Gets token USD prices at a past moment given as a Unix timestamp or YYYY-MM-DD date."
    }

    fn input_schema(&self) -> Value {
        schema_of::<HistoricalPricesInput>()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let input: HistoricalPricesInput = parse_args(args)?;
        let at = input.timestamp.to_unix()?;
        let coins = coin_list(&input.coins)?;
        let request = price_request(
            vec!["prices".into(), "historical".into(), at.to_string(), coins],
            input.search_width.as_deref(),
        )?;

        let payload = self.llama.fetch(&request).await?;
        let records = price_records(&payload)?;

        let when = format::timestamp(at).unwrap_or_else(|| at.to_string());
        Ok(format::table(
            &format!("Historical Token Prices ({})", when),
            &[],
            PRICE_COLUMNS,
            &records,
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PriceChangesInput {
    /// Comma-separated coins, same format as get_current_prices
    pub coins: String,
    /// Period to measure over, e.g. "24h", "7d", "1w" (default "24h")
    pub period: Option<String>,
    /// Reference point (Unix seconds or YYYY-MM-DD); defaults to now
    pub timestamp: Option<TimestampArg>,
    /// Measure forward from `timestamp` instead of backward
    pub look_forward: Option<bool>,
}

/// Percentage price change over a period
pub struct PriceChangesTool {
    llama: DefiLlama,
}

impl PriceChangesTool {
    pub fn new(llama: DefiLlama) -> Self {
        Self { llama }
    }
}

#[async_trait]
impl Tool for PriceChangesTool {
    fn name(&self) -> &'static str {
        TOOL_GET_PRICE_CHANGES
    }

    fn description(&self) -> &'static str {
        "Gets the percentage price change of tokens over a period (default 24h), \
         largest gain first."
    }

    fn input_schema(&self) -> Value {
        schema_of::<PriceChangesInput>()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let input: PriceChangesInput = parse_args(args)?;
        let coins = coin_list(&input.coins)?;
        let period = match input.period.as_deref().map(str::trim) {
            None | Some("") => "24h".to_string(),
            Some(p) => identifier("period", p, &[])?,
        };

        let mut request = ApiRequest::new(Host::Coins, ["percentage".to_string(), coins])
            .param("period", period.as_str());
        if let Some(ts) = &input.timestamp {
            request = request.param("timestamp", ts.to_unix()?.to_string());
        }
        if let Some(forward) = input.look_forward {
            request = request.param("lookForward", forward.to_string());
        }

        let payload = self.llama.fetch(&request).await?;
        let records = coin_records(&payload, |value| {
            let mut map = Map::new();
            map.insert("change".to_string(), value.clone());
            Some(map)
        })?;
        let sorted = filter::apply(
            &records,
            &FilterSpec::new().sort_by("change", SortOrder::Desc),
        );

        Ok(format::table(
            &format!("Price Change ({})", period),
            &[],
            &[
                Column::new("Coin", "id", CellKind::Text),
                Column::new("Change", "change", CellKind::Percent),
            ],
            &sorted,
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BlockInput {
    /// Chain name, e.g. "ethereum", "arbitrum"
    pub chain: String,
    /// Unix timestamp (seconds) or a date as "YYYY-MM-DD"
    pub timestamp: TimestampArg,
}

/// Block closest to a timestamp
pub struct BlockTool {
    llama: DefiLlama,
}

impl BlockTool {
    pub fn new(llama: DefiLlama) -> Self {
        Self { llama }
    }
}

#[async_trait]
impl Tool for BlockTool {
    fn name(&self) -> &'static str {
        TOOL_GET_BLOCK
    }

    fn description(&self) -> &'static str {
        "Finds the block closest to a timestamp on a chain."
    }

    fn input_schema(&self) -> Value {
        schema_of::<BlockInput>()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let input: BlockInput = parse_args(args)?;
        let chain = identifier("chain", &input.chain, &['-', '_'])?.to_ascii_lowercase();
        let at = input.timestamp.to_unix()?;

        let payload = self
            .llama
            .fetch(&ApiRequest::new(
                Host::Coins,
                ["block".to_string(), chain.clone(), at.to_string()],
            ))
            .await?;
        let block = RawRecord::try_from(payload)?;
        let height = block
            .number("height")
            .ok_or_else(|| Error::upstream_format("block response is missing 'height'"))?;

        let na = || format::NOT_AVAILABLE.to_string();
        Ok(format::key_values(
            "Block Lookup",
            &[
                ("Chain", chain),
                ("Requested", format::timestamp(at).unwrap_or_else(na)),
                ("Height", format!("{}", height as u64)),
                (
                    "Block time",
                    block
                        .number("timestamp")
                        .and_then(|t| format::timestamp(t as i64))
                        .unwrap_or_else(na),
                ),
            ],
        ))
    }
}
