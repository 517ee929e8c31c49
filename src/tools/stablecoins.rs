//! Stablecoin supply (`stablecoins` host)

use crate::client::ApiRequest;
use crate::config::Host;
use crate::filter;
use crate::format::{self, CellKind, Column};
use crate::llama::DefiLlama;
use crate::record::{records_at, RawRecord};
use crate::tools::types::{found_line, identifier, listing, parse_args, schema_of, Tool};
use crate::tools::TOOL_GET_STABLECOINS;
use crate::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Circulating supply in the asset's own peg, added to every record
const CIRCULATING_FIELD: &str = "circulatingAmount";

const STABLECOIN_COLUMNS: &[Column] = &[
    Column::new("Name", "name", CellKind::Text),
    Column::new("Symbol", "symbol", CellKind::Text),
    Column::new("Peg", "pegType", CellKind::Text),
    Column::new("Mechanism", "pegMechanism", CellKind::Text),
    Column::new("Circulating", CIRCULATING_FIELD, CellKind::Compact),
    Column::new("Price", "price", CellKind::Price),
    Column::new("Chains", "chains", CellKind::Labels(3)),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct StablecoinsInput {
    /// Minimum circulating supply, in units of the peg
    pub min_circulating: Option<f64>,
    /// Peg currency, e.g. "usd", "eur" or "peggedUSD"
    pub peg_type: Option<String>,
    /// Only stablecoins issued on this chain (e.g. "Ethereum")
    pub chain: Option<String>,
    /// Field to sort by (default "circulating.peggedUSD"; also "circulating", "price", "name")
    pub sort_by: Option<String>,
    /// "asc" or "desc" (default "desc")
    pub order: Option<String>,
    /// Maximum rows to return (default 20, 0 for all)
    pub limit: Option<usize>,
}

/// `usd` / `USD` / `peggedusd` all become `peggedUSD`
fn normalize_peg(raw: &str) -> Result<String> {
    let peg = identifier("peg_type", raw, &[])?;
    let currency = match peg.get(..6) {
        Some(prefix) if prefix.eq_ignore_ascii_case("pegged") => &peg[6..],
        _ => peg.as_str(),
    };
    if currency.is_empty() {
        return Err(crate::Error::validation(format!(
            "'peg_type' names no currency: {}",
            raw
        )));
    }
    Ok(format!("pegged{}", currency.to_ascii_uppercase()))
}

/// Copy of `asset` with [`CIRCULATING_FIELD`] taken from
/// `circulating[pegType]`
fn with_circulating(asset: &RawRecord) -> RawRecord {
    let amount = asset
        .text("pegType")
        .and_then(|peg| asset.get("circulating").and_then(|c| c.get(peg)))
        .and_then(Value::as_f64);
    let mut map = asset.as_map().clone();
    if let Some(amount) = amount {
        map.insert(CIRCULATING_FIELD.to_string(), json!(amount));
    }
    RawRecord::new(map)
}

/// Stablecoins by circulating supply
pub struct StablecoinsTool {
    llama: DefiLlama,
}

impl StablecoinsTool {
    pub fn new(llama: DefiLlama) -> Self {
        Self { llama }
    }
}

#[async_trait]
impl Tool for StablecoinsTool {
    fn name(&self) -> &'static str {
        TOOL_GET_STABLECOINS
    }

    fn description(&self) -> &'static str {
        "Lists stablecoins with circulating supply, peg and price. Filter by \
         minimum supply, peg currency and chain; sort and limit the result."
    }

    fn input_schema(&self) -> Value {
        schema_of::<StablecoinsInput>()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let input: StablecoinsInput = parse_args(args)?;
        let peg = input.peg_type.as_deref().map(normalize_peg).transpose()?;
        let default_sort = format!("circulating.{}", peg.as_deref().unwrap_or("peggedUSD"));
        let spec = listing(
            input.sort_by.as_deref(),
            &default_sort,
            &[("circulating", CIRCULATING_FIELD)],
            input.order.as_deref(),
            input.limit,
        )?
        .range(CIRCULATING_FIELD, input.min_circulating, None)
        .one_of("pegType", peg.as_deref())
        .one_of("chains", input.chain.as_deref());
        spec.validate()?;

        let payload = self
            .llama
            .fetch(&ApiRequest::new(Host::Stablecoins, ["stablecoins"]).param("includePrices", "true"))
            .await?;
        let assets: Vec<RawRecord> = records_at(&payload, "peggedAssets")?
            .iter()
            .map(with_circulating)
            .collect();
        let (shown, total) = filter::apply_with_total(&assets, &spec);

        Ok(format::table(
            "Stablecoins",
            &[found_line(total, shown.len(), "stablecoins")],
            STABLECOIN_COLUMNS,
            &shown,
        ))
    }
}
