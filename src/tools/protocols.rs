//! TVL tools: protocols, a single protocol, chains and chain history
//!
//! All four read from the `api` host.

use crate::client::ApiRequest;
use crate::config::Host;
use crate::filter::{self, FilterSpec, SortOrder};
use crate::format::{self, CellKind, Column};
use crate::llama::DefiLlama;
use crate::record::{records_at, records_from, RawRecord};
use crate::tools::types::{
    found_line, identifier, listing, parse_args, points, schema_of, Tool,
};
use crate::tools::{TOOL_GET_CHAINS, TOOL_GET_CHAIN_TVL_HISTORY, TOOL_GET_PROTOCOL, TOOL_GET_PROTOCOLS};
use crate::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

const PROTOCOL_COLUMNS: &[Column] = &[
    Column::new("Name", "name", CellKind::Text),
    Column::new("Category", "category", CellKind::Text),
    Column::new("TVL", "tvl", CellKind::Usd),
    Column::new("1d", "change_1d", CellKind::Percent),
    Column::new("7d", "change_7d", CellKind::Percent),
    Column::new("Chains", "chains", CellKind::Labels(3)),
];

const PROTOCOL_SORT_ALIASES: &[(&str, &str)] = &[
    ("change1d", "change_1d"),
    ("change7d", "change_7d"),
    ("marketcap", "mcap"),
];

const CHAIN_COLUMNS: &[Column] = &[
    Column::new("Chain", "name", CellKind::Text),
    Column::new("Token", "tokenSymbol", CellKind::Text),
    Column::new("TVL", "tvl", CellKind::Usd),
    Column::new("Chain ID", "chainId", CellKind::Text),
];

/// Characters DefiLlama uses in protocol slugs and chain names
const SLUG_EXTRA: &[char] = &['-', '_', '.', ' '];

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ProtocolsInput {
    /// Minimum TVL in USD
    pub min_tvl: Option<f64>,
    /// Maximum TVL in USD
    pub max_tvl: Option<f64>,
    /// Only protocols deployed on this chain (e.g. "Ethereum")
    pub chain: Option<String>,
    /// Only protocols in this category (e.g. "Lending", "Dexs")
    pub category: Option<String>,
    /// Field to sort by (default "tvl"; also "change_1d", "change_7d", "mcap", "name")
    pub sort_by: Option<String>,
    /// "asc" or "desc" (default "desc")
    pub order: Option<String>,
    /// Maximum rows to return (default 20, 0 for all)
    pub limit: Option<usize>,
}

/// Lists DeFi protocols with their TVL
pub struct ProtocolsTool {
    llama: DefiLlama,
}

impl ProtocolsTool {
    pub fn new(llama: DefiLlama) -> Self {
        Self { llama }
    }
}

#[async_trait]
impl Tool for ProtocolsTool {
    fn name(&self) -> &'static str {
        TOOL_GET_PROTOCOLS
    }

    fn description(&self) -> &'static str {
        "Lists DeFi protocols tracked by DefiLlama with TVL and 1d/7d change. \
         Filter by TVL range, chain and category; sort and limit the result."
    }

    fn input_schema(&self) -> Value {
        schema_of::<ProtocolsInput>()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let input: ProtocolsInput = parse_args(args)?;
        let spec = listing(
            input.sort_by.as_deref(),
            "tvl",
            PROTOCOL_SORT_ALIASES,
            input.order.as_deref(),
            input.limit,
        )?
        .range("tvl", input.min_tvl, input.max_tvl)
        .one_of("chains", input.chain.as_deref())
        .one_of("category", input.category.as_deref());
        spec.validate()?;

        let payload = self
            .llama
            .fetch(&ApiRequest::new(Host::Api, ["protocols"]))
            .await?;
        let records = records_from(&payload, "protocols")?;
        let (shown, total) = filter::apply_with_total(&records, &spec);

        Ok(format::table(
            "DeFi Protocols",
            &[found_line(total, shown.len(), "protocols")],
            PROTOCOL_COLUMNS,
            &shown,
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProtocolInput {
    /// Protocol slug as used by DefiLlama (e.g. "aave-v3", "lido")
    pub protocol: String,
}

/// Details and per-chain TVL for one protocol
pub struct ProtocolTool {
    llama: DefiLlama,
}

impl ProtocolTool {
    pub fn new(llama: DefiLlama) -> Self {
        Self { llama }
    }

    /// Per-chain TVL rows from `currentChainTvls`, skipping the
    /// `borrowed`/`staking`/`pool2` style breakdown keys
    fn chain_rows(details: &RawRecord) -> Vec<RawRecord> {
        let Some(Value::Object(tvls)) = details.get("currentChainTvls") else {
            return Vec::new();
        };
        tvls.iter()
            .filter(|(chain, _)| !chain.contains('-') && !is_breakdown_key(chain))
            .filter_map(|(chain, tvl)| {
                let mut row = Map::new();
                row.insert("chain".to_string(), json!(chain));
                row.insert("tvl".to_string(), tvl.clone());
                Some(RawRecord::new(row)).filter(|r| r.number("tvl").is_some())
            })
            .collect()
    }

    /// Latest `totalLiquidityUSD` from the TVL history, if present
    fn current_tvl(details: &RawRecord) -> Option<f64> {
        match details.get("tvl")? {
            Value::Array(points) => points
                .last()
                .and_then(|p| p.get("totalLiquidityUSD"))
                .and_then(Value::as_f64),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }
}

fn is_breakdown_key(key: &str) -> bool {
    matches!(
        key.to_ascii_lowercase().as_str(),
        "borrowed" | "staking" | "pool2" | "vesting" | "treasury" | "offers" | "doublecounted" | "liquidstaking" | "dcandlsoverlap"
    )
}

#[async_trait]
impl Tool for ProtocolTool {
    fn name(&self) -> &'static str {
        TOOL_GET_PROTOCOL
    }

    fn description(&self) -> &'static str {
        "Shows details for one DeFi protocol (category, chains, website, \
         current TVL) with its TVL broken down by chain."
    }

    fn input_schema(&self) -> Value {
        schema_of::<ProtocolInput>()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let input: ProtocolInput = parse_args(args)?;
        let slug = identifier("protocol", &input.protocol, SLUG_EXTRA)?.to_ascii_lowercase();

        let payload = self
            .llama
            .fetch(&ApiRequest::new(Host::Api, ["protocol", slug.as_str()]))
            .await?;
        let details = RawRecord::try_from(payload)?;
        let name = details
            .text("name")
            .ok_or_else(|| Error::upstream_format(format!("protocol '{}' has no name", slug)))?;

        let na = || format::NOT_AVAILABLE.to_string();
        let chains = details.labels("chains");
        let summary = format::key_values(
            &format!("{} ({})", name, slug),
            &[
                ("Symbol", details.display("symbol").unwrap_or_else(na)),
                ("Category", details.display("category").unwrap_or_else(na)),
                (
                    "Chains",
                    if chains.is_empty() { na() } else { chains.join(", ") },
                ),
                ("Website", details.display("url").unwrap_or_else(na)),
                (
                    "Current TVL",
                    Self::current_tvl(&details).map(format::usd).unwrap_or_else(na),
                ),
                (
                    "Market cap",
                    details.number("mcap").map(format::usd).unwrap_or_else(na),
                ),
            ],
        );

        let spec = FilterSpec::new().sort_by("tvl", SortOrder::Desc);
        let rows = filter::apply(&Self::chain_rows(&details), &spec);
        let breakdown = format::table(
            "TVL by chain",
            &[],
            &[
                Column::new("Chain", "chain", CellKind::Text),
                Column::new("TVL", "tvl", CellKind::Usd),
            ],
            &rows,
        );

        let mut out = summary;
        if let Some(description) = details.text("description") {
            out.push_str(&format!("\n\n{}", description));
        }
        out.push_str("\n\n");
        out.push_str(&breakdown);
        Ok(out)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ChainsInput {
    /// Minimum TVL in USD
    pub min_tvl: Option<f64>,
    /// Maximum TVL in USD
    pub max_tvl: Option<f64>,
    /// Field to sort by (default "tvl"; also "name")
    pub sort_by: Option<String>,
    /// "asc" or "desc" (default "desc")
    pub order: Option<String>,
    /// Maximum rows to return (default 20, 0 for all)
    pub limit: Option<usize>,
}

/// Current TVL of every chain
pub struct ChainsTool {
    llama: DefiLlama,
}

impl ChainsTool {
    pub fn new(llama: DefiLlama) -> Self {
        Self { llama }
    }
}

#[async_trait]
impl Tool for ChainsTool {
    fn name(&self) -> &'static str {
        TOOL_GET_CHAINS
    }

    fn description(&self) -> &'static str {
        "Lists blockchains with their current total TVL. Filter by TVL range; sort and limit."
    }

    fn input_schema(&self) -> Value {
        schema_of::<ChainsInput>()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let input: ChainsInput = parse_args(args)?;
        let spec = listing(
            input.sort_by.as_deref(),
            "tvl",
            &[],
            input.order.as_deref(),
            input.limit,
        )?
        .range("tvl", input.min_tvl, input.max_tvl);
        spec.validate()?;

        let payload = self
            .llama
            .fetch(&ApiRequest::new(Host::Api, ["v2", "chains"]))
            .await?;
        let records = records_from(&payload, "chains")?;
        let (shown, total) = filter::apply_with_total(&records, &spec);

        Ok(format::table(
            "Chains by TVL",
            &[found_line(total, shown.len(), "chains")],
            CHAIN_COLUMNS,
            &shown,
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChainHistoryInput {
    /// Chain name (e.g. "Ethereum", "Arbitrum")
    pub chain: String,
    /// Number of most recent daily points to show (default 10)
    pub points: Option<usize>,
}

/// Daily TVL history of one chain
pub struct ChainTvlHistoryTool {
    llama: DefiLlama,
}

impl ChainTvlHistoryTool {
    pub fn new(llama: DefiLlama) -> Self {
        Self { llama }
    }
}

#[async_trait]
impl Tool for ChainTvlHistoryTool {
    fn name(&self) -> &'static str {
        TOOL_GET_CHAIN_TVL_HISTORY
    }

    fn description(&self) -> &'static str {
        "Shows the most recent daily TVL values for one chain."
    }

    fn input_schema(&self) -> Value {
        schema_of::<ChainHistoryInput>()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let input: ChainHistoryInput = parse_args(args)?;
        let chain = identifier("chain", &input.chain, SLUG_EXTRA)?;
        let points = points(input.points)?;

        let payload = self
            .llama
            .fetch(&ApiRequest::new(
                Host::Api,
                ["v2", "historicalChainTvl", chain.as_str()],
            ))
            .await?;
        let records = records_at(&payload, "data")?;

        let spec = FilterSpec::new().sort_by("date", SortOrder::Desc).limit(Some(points));
        let mut recent = filter::apply(&records, &spec);
        recent.reverse();

        Ok(format::table(
            &format!("{} TVL History", chain),
            &[format!(
                "{} data points available, showing the last {}",
                records.len(),
                recent.len()
            )],
            &[
                Column::new("Date", "date", CellKind::Date),
                Column::new("TVL", "tvl", CellKind::Usd),
            ],
            &recent,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::testing::StubUpstream;
    use std::sync::Arc;
    use std::time::Duration;

    fn llama(stub: StubUpstream) -> (DefiLlama, Arc<StubUpstream>) {
        let stub = Arc::new(stub);
        (
            DefiLlama::new(stub.clone(), ResponseCache::new(Duration::from_secs(300))),
            stub,
        )
    }

    fn protocols_payload() -> Value {
        json!([
            {"name": "Lido", "category": "Liquid Staking", "chains": ["Ethereum", "Solana"], "tvl": 3.0e10, "change_1d": 1.2, "change_7d": -3.4},
            {"name": "Aave V3", "category": "Lending", "chains": ["Ethereum", "Arbitrum", "Base", "Polygon"], "tvl": 2.0e10, "change_1d": 0.5},
            {"name": "GMX", "category": "Derivatives", "chains": ["Arbitrum", "Avalanche"], "tvl": 5.0e8},
            {"name": "NoTvl", "category": "Dexs", "chains": ["Ethereum"]}
        ])
    }

    #[tokio::test]
    async fn protocols_filter_by_chain_and_tvl() {
        let (llama, stub) = llama(StubUpstream::new().route("api/protocols", protocols_payload()));
        let tool = ProtocolsTool::new(llama);

        let out = tool
            .execute(json!({"chain": "arbitrum", "min_tvl": 1e9}))
            .await
            .unwrap();

        assert!(out.starts_with("**DeFi Protocols**"));
        assert!(out.contains("Found 1 protocols"));
        assert!(out.contains("Aave V3"));
        assert!(out.contains("$20.00B"));
        assert!(out.contains("Ethereum, Arbitrum, Base +1"));
        assert!(!out.contains("GMX"));
        assert!(!out.contains("Lido"));
        assert_eq!(stub.calls(), vec!["api/protocols".to_string()]);
    }

    #[tokio::test]
    async fn protocols_sort_ascending_with_limit() {
        let (llama, _stub) = llama(StubUpstream::new().route("api/protocols", protocols_payload()));
        let tool = ProtocolsTool::new(llama);

        let out = tool
            .execute(json!({"order": "asc", "limit": 2}))
            .await
            .unwrap();

        assert!(out.contains("Found 4 protocols (showing 2)"));
        let no_tvl = out.find("NoTvl").unwrap();
        let gmx = out.find("GMX").unwrap();
        assert!(no_tvl < gmx);
        assert!(!out.contains("Lido"));
    }

    #[tokio::test]
    async fn inverted_range_is_rejected_before_fetching() {
        let (llama, stub) = llama(StubUpstream::new().route("api/protocols", protocols_payload()));
        let tool = ProtocolsTool::new(llama);

        let err = tool
            .execute(json!({"min_tvl": 10.0, "max_tvl": 1.0}))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn protocol_details_break_tvl_down_by_chain() {
        let payload = json!({
            "name": "Aave V3",
            "symbol": "AAVE",
            "category": "Lending",
            "chains": ["Ethereum", "Arbitrum"],
            "url": "https://aave.com",
            "description": "Lending protocol",
            "currentChainTvls": {
                "Arbitrum": 1.0e9,
                "Ethereum": 1.5e10,
                "Ethereum-borrowed": 9.0e9,
                "borrowed": 9.5e9
            },
            "tvl": [
                {"date": 1700000000, "totalLiquidityUSD": 1.4e10},
                {"date": 1700086400, "totalLiquidityUSD": 1.6e10}
            ]
        });
        let (llama, stub) = llama(StubUpstream::new().route("api/protocol/aave-v3", payload));
        let tool = ProtocolTool::new(llama);

        let out = tool.execute(json!({"protocol": " Aave-V3 "})).await.unwrap();

        assert!(out.starts_with("**Aave V3 (aave-v3)**"));
        assert!(out.contains("- Current TVL : $16.00B"));
        assert!(out.contains("Lending protocol"));
        let eth = out.find("| Ethereum").unwrap();
        let arb = out.find("| Arbitrum").unwrap();
        assert!(eth < arb);
        assert!(!out.contains("borrowed"));
        assert_eq!(stub.calls(), vec!["api/protocol/aave-v3".to_string()]);
    }

    #[tokio::test]
    async fn protocol_without_name_is_an_upstream_format_error() {
        let (llama, _stub) = llama(
            StubUpstream::new().route("api/protocol/ghost", json!({"message": "Protocol not found"})),
        );
        let tool = ProtocolTool::new(llama);

        let err = tool.execute(json!({"protocol": "ghost"})).await.unwrap_err();
        assert!(matches!(err, Error::UpstreamFormat(_)));
    }

    #[tokio::test]
    async fn protocol_slug_is_validated() {
        let (llama, stub) = llama(StubUpstream::new());
        let tool = ProtocolTool::new(llama);

        assert!(matches!(
            tool.execute(json!({"protocol": "../admin"})).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            tool.execute(json!({})).await,
            Err(Error::Validation(_))
        ));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn chains_are_sorted_by_tvl() {
        let payload = json!([
            {"name": "Arbitrum", "tokenSymbol": "ARB", "tvl": 2.5e9, "chainId": 42161},
            {"name": "Ethereum", "tokenSymbol": "ETH", "tvl": 6.0e10, "chainId": 1},
            {"name": "Tiny", "tvl": 1000.0}
        ]);
        let (llama, _stub) = llama(StubUpstream::new().route("api/v2/chains", payload));
        let tool = ChainsTool::new(llama);

        let out = tool.execute(json!({"min_tvl": 1e6})).await.unwrap();

        assert!(out.contains("Found 2 chains"));
        assert!(out.find("Ethereum").unwrap() < out.find("Arbitrum").unwrap());
        assert!(out.contains("42161"));
        assert!(!out.contains("Tiny"));
    }

    #[tokio::test]
    async fn chain_history_shows_latest_points_oldest_first() {
        let payload = json!([
            {"date": 1704067200, "tvl": 1.0e9},
            {"date": 1704153600, "tvl": 2.0e9},
            {"date": 1704240000, "tvl": 3.0e9}
        ]);
        let (llama, _stub) = llama(StubUpstream::new().route("api/v2/historicalChainTvl/Ethereum", payload));
        let tool = ChainTvlHistoryTool::new(llama);

        let out = tool
            .execute(json!({"chain": "Ethereum", "points": 2}))
            .await
            .unwrap();

        assert!(out.contains("3 data points available, showing the last 2"));
        assert!(!out.contains("2024-01-01"));
        assert!(out.find("2024-01-02").unwrap() < out.find("2024-01-03").unwrap());
    }
}
