//! Yield pool tools (`yields` host)

use crate::client::ApiRequest;
use crate::config::Host;
use crate::filter;
use crate::format::{self, CellKind, Column};
use crate::llama::DefiLlama;
use crate::record::records_at;
use crate::tools::types::{found_line, identifier, listing, parse_args, points, schema_of, Tool};
use crate::tools::{TOOL_GET_POOL_CHART, TOOL_GET_YIELD_POOLS};
use crate::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const POOL_COLUMNS: &[Column] = &[
    Column::new("Project", "project", CellKind::Text),
    Column::new("Symbol", "symbol", CellKind::Text),
    Column::new("Chain", "chain", CellKind::Text),
    Column::new("APY", "apy", CellKind::Percent),
    Column::new("TVL", "tvlUsd", CellKind::Usd),
    Column::new("Pool ID", "pool", CellKind::Text),
];

const POOL_SORT_ALIASES: &[(&str, &str)] = &[
    ("tvl", "tvlUsd"),
    ("apy_base", "apyBase"),
    ("apy_reward", "apyReward"),
];

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct YieldPoolsInput {
    /// Minimum pool TVL in USD
    pub min_tvl: Option<f64>,
    /// Maximum pool TVL in USD
    pub max_tvl: Option<f64>,
    /// Minimum APY in percent
    pub min_apy: Option<f64>,
    /// Maximum APY in percent
    pub max_apy: Option<f64>,
    /// Only pools on this chain (e.g. "Ethereum")
    pub chain: Option<String>,
    /// Only pools of this project (e.g. "aave-v3", "lido")
    pub project: Option<String>,
    /// Only stablecoin pools
    #[serde(default)]
    pub stablecoin_only: bool,
    /// Field to sort by (default "tvlUsd"; also "apy", "apyBase", "apyReward")
    pub sort_by: Option<String>,
    /// "asc" or "desc" (default "desc")
    pub order: Option<String>,
    /// Maximum rows to return (default 20, 0 for all)
    pub limit: Option<usize>,
}

/// Yield pools with TVL and APY
pub struct YieldPoolsTool {
    llama: DefiLlama,
}

impl YieldPoolsTool {
    pub fn new(llama: DefiLlama) -> Self {
        Self { llama }
    }
}

#[async_trait]
impl Tool for YieldPoolsTool {
    fn name(&self) -> &'static str {
        TOOL_GET_YIELD_POOLS
    }

    fn description(&self) -> &'static str {
        "Lists yield farming pools with APY and TVL. Filter by TVL and APY ranges, \
         chain, project or stablecoin-only; sort and limit the result."
    }

    fn input_schema(&self) -> Value {
        schema_of::<YieldPoolsInput>()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let input: YieldPoolsInput = parse_args(args)?;
        let mut spec = listing(
            input.sort_by.as_deref(),
            "tvlUsd",
            POOL_SORT_ALIASES,
            input.order.as_deref(),
            input.limit,
        )?
        .range("tvlUsd", input.min_tvl, input.max_tvl)
        .range("apy", input.min_apy, input.max_apy)
        .one_of("chain", input.chain.as_deref())
        .one_of("project", input.project.as_deref());
        if input.stablecoin_only {
            spec = spec.flag("stablecoin", true);
        }
        spec.validate()?;

        let payload = self
            .llama
            .fetch(&ApiRequest::new(Host::Yields, ["pools"]))
            .await?;
        let pools = records_at(&payload, "data")?;
        let (shown, total) = filter::apply_with_total(&pools, &spec);

        Ok(format::table(
            "Yield Pools",
            &[found_line(total, shown.len(), "pools")],
            POOL_COLUMNS,
            &shown,
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PoolChartInput {
    /// Pool id from get_yield_pools, e.g. "747c1d2a-c668-4682-b9f9-296708a3dd90"
    pub pool_id: String,
    /// Number of most recent points to show (default 10)
    pub points: Option<usize>,
}

/// APY and TVL history of one pool
pub struct PoolChartTool {
    llama: DefiLlama,
}

impl PoolChartTool {
    pub fn new(llama: DefiLlama) -> Self {
        Self { llama }
    }
}

#[async_trait]
impl Tool for PoolChartTool {
    fn name(&self) -> &'static str {
        TOOL_GET_POOL_CHART
    }

    fn description(&self) -> &'static str {
        "Shows recent APY and TVL history for one yield pool, by pool id."
    }

    fn input_schema(&self) -> Value {
        schema_of::<PoolChartInput>()
    }

    async fn execute(&self, args: Value) -> Result<String> {
        let input: PoolChartInput = parse_args(args)?;
        let pool = identifier("pool_id", &input.pool_id, &['-'])?;
        let points = points(input.points)?;

        let payload = self
            .llama
            .fetch(&ApiRequest::new(Host::Yields, ["chart", pool.as_str()]))
            .await?;
        let history = records_at(&payload, "data")?;
        if history.is_empty() {
            return Ok(format!("No historical data found for pool: {}", pool));
        }

        // upstream order is oldest first
        let recent = &history[history.len().saturating_sub(points)..];
        let status = payload
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        Ok(format::table(
            "Pool History",
            &[
                format!("Pool: {}", pool),
                format!("Status: {}", status),
                format!(
                    "{} data points available, showing the last {}",
                    history.len(),
                    recent.len()
                ),
            ],
            &[
                Column::new("Date", "timestamp", CellKind::Date),
                Column::new("APY", "apy", CellKind::Percent),
                Column::new("TVL", "tvlUsd", CellKind::Usd),
            ],
            recent,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::error::FetchError;
    use crate::testing::StubUpstream;
    use crate::Error;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn llama(stub: StubUpstream) -> (DefiLlama, Arc<StubUpstream>) {
        let stub = Arc::new(stub);
        (
            DefiLlama::new(stub.clone(), ResponseCache::new(Duration::from_secs(300))),
            stub,
        )
    }

    fn pools_payload() -> Value {
        json!({"status": "success", "data": [
            {"pool": "p-1", "project": "lido", "symbol": "STETH", "chain": "Ethereum", "tvlUsd": 2.0e7, "apy": 8.0, "stablecoin": false},
            {"pool": "p-2", "project": "aave-v3", "symbol": "USDC", "chain": "Ethereum", "tvlUsd": 5.0e6, "apy": 4.0, "stablecoin": true},
            {"pool": "p-3", "project": "curve-dex", "symbol": "DAI-USDC", "chain": "Arbitrum", "tvlUsd": 1.5e7, "apy": 6.0, "stablecoin": true}
        ]})
    }

    #[tokio::test]
    async fn pools_filter_by_tvl_and_sort_by_apy() {
        let (llama, _stub) = llama(StubUpstream::new().route("yields/pools", pools_payload()));
        let tool = YieldPoolsTool::new(llama);

        let out = tool
            .execute(json!({"min_tvl": 1.0e7, "sort_by": "apy", "order": "desc"}))
            .await
            .unwrap();

        assert!(out.contains("Found 2 pools"));
        assert!(out.find("p-1").unwrap() < out.find("p-3").unwrap());
        assert!(!out.contains("p-2"));
    }

    #[tokio::test]
    async fn stablecoin_only_and_chain_are_combined() {
        let (llama, _stub) = llama(StubUpstream::new().route("yields/pools", pools_payload()));
        let tool = YieldPoolsTool::new(llama);

        let out = tool
            .execute(json!({"stablecoin_only": true, "chain": "ethereum"}))
            .await
            .unwrap();

        assert!(out.contains("Found 1 pools"));
        assert!(out.contains("aave-v3"));
        assert!(!out.contains("curve-dex"));
    }

    #[tokio::test]
    async fn limit_reports_truncation_and_reuses_cache() {
        let (llama, stub) = llama(StubUpstream::new().route("yields/pools", pools_payload()));
        let tool = YieldPoolsTool::new(llama);

        let first = tool.execute(json!({"limit": 1})).await.unwrap();
        let second = tool.execute(json!({"limit": 1})).await.unwrap();

        assert!(first.contains("Found 3 pools (showing 1)"));
        assert!(first.contains("p-1"));
        assert_eq!(first, second);
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn inverted_apy_range_is_rejected_before_fetching() {
        let (llama, stub) = llama(StubUpstream::new().route("yields/pools", pools_payload()));
        let tool = YieldPoolsTool::new(llama);

        let err = tool
            .execute(json!({"min_apy": 10.0, "max_apy": 5.0}))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn server_error_is_not_cached() {
        let (llama, stub) = llama(StubUpstream::new().route_sequence(
            "yields/pools",
            vec![
                Err(FetchError::Status {
                    endpoint: "yields/pools".to_string(),
                    status: 500,
                    body: "boom".to_string(),
                }),
                Ok(pools_payload()),
            ],
        ));
        let tool = YieldPoolsTool::new(llama);

        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Fetch(FetchError::Status { status: 500, .. })
        ));

        let out = tool.execute(json!({})).await.unwrap();
        assert!(out.contains("Found 3 pools"));
        assert_eq!(stub.call_count(), 2);
    }

    #[tokio::test]
    async fn pool_chart_shows_the_most_recent_points() {
        let (llama, _stub) = llama(StubUpstream::new().route(
            "yields/chart/747c1d2a-c668",
            json!({"status": "success", "data": [
                {"timestamp": "2024-01-01T00:00:00.000Z", "apy": 3.0, "tvlUsd": 1.0e6},
                {"timestamp": "2024-01-02T00:00:00.000Z", "apy": 3.5, "tvlUsd": 1.1e6},
                {"timestamp": "2024-01-03T00:00:00.000Z", "apy": 4.0, "tvlUsd": 1.2e6}
            ]}),
        ));
        let tool = PoolChartTool::new(llama);

        let out = tool
            .execute(json!({"pool_id": " 747c1d2a-c668 ", "points": 2}))
            .await
            .unwrap();

        assert!(out.contains("3 data points available, showing the last 2"));
        assert!(!out.contains("2024-01-01"));
        assert!(out.find("2024-01-02").unwrap() < out.find("2024-01-03").unwrap());
        assert!(out.contains("$1.2M"));
    }

    #[tokio::test]
    async fn pool_chart_without_data_says_so() {
        let (llama, _stub) = llama(
            StubUpstream::new().route("yields/chart/abc", json!({"status": "success", "data": []})),
        );
        let tool = PoolChartTool::new(llama);

        let out = tool.execute(json!({"pool_id": "abc"})).await.unwrap();
        assert_eq!(out, "No historical data found for pool: abc");
    }

    #[tokio::test]
    async fn pool_ids_are_validated() {
        let (llama, stub) = llama(StubUpstream::new());
        let tool = PoolChartTool::new(llama);

        for bad in ["../pools", "abc def", ""] {
            let err = tool.execute(json!({"pool_id": bad})).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{}", bad);
        }
        let err = tool
            .execute(json!({"pool_id": "abc", "points": 0}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(stub.call_count(), 0);
    }
}
