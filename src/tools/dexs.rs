//! DEX trading volume (`api` host)

use crate::client::ApiRequest;
use crate::config::Host;
use crate::filter;
use crate::format::{self, CellKind, Column};
use crate::llama::DefiLlama;
use crate::record::records_at;
use crate::tools::types::{found_line, identifier, listing, parse_args, schema_of, Tool};
use crate::tools::TOOL_GET_DEX_OVERVIEW;
use crate::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEX_COLUMNS: &[Column] = &[
    Column::new("Name", "displayName", CellKind::Text),
    Column::new("Category", "category", CellKind::Text),
    Column::new("24h Volume", "total24h", CellKind::Usd),
    Column::new("7d Volume", "total7d", CellKind::Usd),
    Column::new("1d Change", "change_1d", CellKind::Percent),
    Column::new("Chains", "chains", CellKind::Labels(3)),
];

const DEX_SORT_ALIASES: &[(&str, &str)] = &[
    ("volume", "total24h"),
    ("volume_24h", "total24h"),
    ("volume_7d", "total7d"),
    ("change1d", "change_1d"),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct DexOverviewInput {
    /// Restrict volumes to one chain (e.g. "Ethereum")
    pub chain: Option<String>,
    /// Minimum 24h volume in USD
    pub min_volume: Option<f64>,
    /// Only DEXs of this category (e.g. "Dexs")
    pub category: Option<String>,
    /// Field to sort by (default "total24h"; also "total7d", "change_1d", "name")
    pub sort_by: Option<String>,
    /// "asc" or "desc" (default "desc")
    pub order: Option<String>,
    /// Maximum rows to return (default 20, 0 for all)
    pub limit: Option<usize>,
}

/// DEX volume ranking, optionally for one chain
pub struct DexOverviewTool {
    llama: DefiLlama,
}

impl DexOverviewTool {
    pub fn new(llama: DefiLlama) -> Self {
        Self { llama }
    }
}

#[async_trait]
impl Tool for DexOverviewTool {
    fn name(&self) -> &'static str {
        TOOL_GET_DEX_OVERVIEW
    }

    fn description(&self) -> &'static str {
        "Ranks decentralized exchanges by trading volume, overall or on one chain. \
         Filter by minimum 24h volume and category; sort and limit the result."
    }

    fn input_schema(&self) -> Value {
        schema_of::<DexOverviewInput>()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let input: DexOverviewInput = parse_args(args)?;
        let chain = match input.chain.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(identifier("chain", raw, &['-', '_', ' '])?),
        };
        let spec = listing(
            input.sort_by.as_deref(),
            "total24h",
            DEX_SORT_ALIASES,
            input.order.as_deref(),
            input.limit,
        )?
        .range("total24h", input.min_volume, None)
        .one_of("category", input.category.as_deref());
        spec.validate()?;

        let mut segments = vec!["overview".to_string(), "dexs".to_string()];
        segments.extend(chain.clone());
        let request = ApiRequest::new(Host::Api, segments)
            .param("excludeTotalDataChart", "true")
            .param("excludeTotalDataChartBreakdown", "true");

        let payload = self.llama.fetch(&request).await?;
        let dexs = records_at(&payload, "protocols")?;
        let (shown, total) = filter::apply_with_total(&dexs, &spec);

        let na = || format::NOT_AVAILABLE.to_string();
        let total_volume = payload
            .get("total24h")
            .and_then(Value::as_f64)
            .map(format::usd)
            .unwrap_or_else(na);
        let change = payload
            .get("change_1d")
            .and_then(Value::as_f64)
            .map(format::percent)
            .unwrap_or_else(na);

        let title = match &chain {
            Some(chain) => format!("DEX Volume on {}", chain),
            None => "DEX Volume".to_string(),
        };
        Ok(format::table(
            &title,
            &[
                format!("Total 24h volume: {} (1d change: {})", total_volume, change),
                found_line(total, shown.len(), "DEXs"),
            ],
            DEX_COLUMNS,
            &shown,
        ))
    }
}
