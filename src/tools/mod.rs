//! DefiLlama tools exposed to MCP hosts
//!
//! Every tool implements [`Tool`] and is reachable by name through the
//! [`ToolRegistry`]. Tools never call each other; each one validates its
//! arguments, fetches through [`DefiLlama`] and renders markdown text.

mod dexs;
mod prices;
mod protocols;
mod stablecoins;
mod types;
mod yields;

use crate::llama::DefiLlama;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

pub use dexs::{DexOverviewInput, DexOverviewTool};
pub use prices::{
    BlockInput, BlockTool, CurrentPricesInput, CurrentPricesTool, HistoricalPricesInput,
    HistoricalPricesTool, PriceChangesInput, PriceChangesTool,
};
pub use protocols::{
    ChainHistoryInput, ChainTvlHistoryTool, ChainsInput, ChainsTool, ProtocolInput, ProtocolTool,
    ProtocolsInput, ProtocolsTool,
};
pub use stablecoins::{StablecoinsInput, StablecoinsTool};
pub use types::{TimestampArg, Tool, ToolOutput, DEFAULT_LIMIT, DEFAULT_POINTS};
pub use yields::{PoolChartInput, PoolChartTool, YieldPoolsInput, YieldPoolsTool};

pub const TOOL_GET_PROTOCOLS: &str = "get_protocols";
pub const TOOL_GET_PROTOCOL: &str = "get_protocol";
pub const TOOL_GET_CHAINS: &str = "get_chains";
pub const TOOL_GET_CHAIN_TVL_HISTORY: &str = "get_chain_tvl_history";
pub const TOOL_GET_CURRENT_PRICES: &str = "get_current_prices";
pub const TOOL_GET_HISTORICAL_PRICES: &str = "get_historical_prices";
pub const TOOL_GET_PRICE_CHANGES: &str = "get_price_changes";
pub const TOOL_GET_YIELD_POOLS: &str = "get_yield_pools";
pub const TOOL_GET_POOL_CHART: &str = "get_pool_chart";
pub const TOOL_GET_STABLECOINS: &str = "get_stablecoins";
pub const TOOL_GET_DEX_OVERVIEW: &str = "get_dex_overview";
pub const TOOL_GET_BLOCK: &str = "get_block";

/// Name-indexed set of tools sharing one [`DefiLlama`] data source
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Registry holding every DefiLlama tool
    pub fn new(llama: DefiLlama) -> Self {
        let mut registry = Self::default();
        registry.register(ProtocolsTool::new(llama.clone()));
        registry.register(ProtocolTool::new(llama.clone()));
        registry.register(ChainsTool::new(llama.clone()));
        registry.register(ChainTvlHistoryTool::new(llama.clone()));
        registry.register(CurrentPricesTool::new(llama.clone()));
        registry.register(HistoricalPricesTool::new(llama.clone()));
        registry.register(PriceChangesTool::new(llama.clone()));
        registry.register(YieldPoolsTool::new(llama.clone()));
        registry.register(PoolChartTool::new(llama.clone()));
        registry.register(StablecoinsTool::new(llama.clone()));
        registry.register(DexOverviewTool::new(llama.clone()));
        registry.register(BlockTool::new(llama));
        registry
    }

    /// Add a tool, replacing any tool already registered under its name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let tool: Arc<dyn Tool> = Arc::new(tool);
        match self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name).cloned()
    }

    /// Registered tools in registration order
    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    /// Run `name` with `args`. Failures come back as text with `is_error`.
    pub async fn dispatch(&self, name: &str, args: Value) -> ToolOutput {
        let Some(tool) = self.get(name) else {
            tracing::warn!(tool = name, "Unknown tool requested");
            return ToolOutput::error(format!("Error: Unknown tool '{}'", name));
        };

        let start = Instant::now();
        match tool.execute(args).await {
            Ok(text) => {
                tracing::info!(
                    tool = name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Tool call completed"
                );
                ToolOutput::ok(text)
            }
            Err(e) => {
                tracing::warn!(
                    tool = name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "Tool call failed"
                );
                ToolOutput::error(format!("Error: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::error::FetchError;
    use crate::testing::StubUpstream;
    use serde_json::json;
    use std::time::Duration;

    fn registry(stub: StubUpstream) -> (ToolRegistry, Arc<StubUpstream>) {
        let stub = Arc::new(stub);
        let llama = DefiLlama::new(stub.clone(), ResponseCache::new(Duration::from_secs(300)));
        (ToolRegistry::new(llama), stub)
    }

    #[test]
    fn every_tool_is_registered_once_with_an_object_schema() {
        let (registry, _stub) = registry(StubUpstream::new());
        let names: Vec<&str> = registry.tools().iter().map(|t| t.name()).collect();

        assert_eq!(
            names,
            [
                TOOL_GET_PROTOCOLS,
                TOOL_GET_PROTOCOL,
                TOOL_GET_CHAINS,
                TOOL_GET_CHAIN_TVL_HISTORY,
                TOOL_GET_CURRENT_PRICES,
                TOOL_GET_HISTORICAL_PRICES,
                TOOL_GET_PRICE_CHANGES,
                TOOL_GET_YIELD_POOLS,
                TOOL_GET_POOL_CHART,
                TOOL_GET_STABLECOINS,
                TOOL_GET_DEX_OVERVIEW,
                TOOL_GET_BLOCK,
            ]
        );
        for tool in registry.tools() {
            let schema = tool.input_schema();
            assert_eq!(schema["type"], "object", "{}", tool.name());
            assert!(!tool.description().is_empty());
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_text() {
        let (registry, stub) = registry(StubUpstream::new());

        let out = registry.dispatch("get_everything", json!({})).await;

        assert!(out.is_error);
        assert_eq!(out.text, "Error: Unknown tool 'get_everything'");
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn validation_errors_never_reach_upstream() {
        let (registry, stub) = registry(StubUpstream::new());

        let out = registry
            .dispatch(TOOL_GET_YIELD_POOLS, json!({"min_tvl": 100.0, "max_tvl": 1.0}))
            .await;

        assert!(out.is_error);
        assert!(out.text.starts_with("Error: Invalid argument:"));
        assert_eq!(stub.call_count(), 0);
    }

    #[tokio::test]
    async fn fetch_errors_render_endpoint_and_status() {
        let (registry, _stub) = registry(StubUpstream::new().route_sequence(
            "api/v2/chains",
            vec![Err(FetchError::Status {
                endpoint: "api/v2/chains".to_string(),
                status: 500,
                body: "Internal Server Error".to_string(),
            })],
        ));

        let out = registry.dispatch(TOOL_GET_CHAINS, Value::Null).await;

        assert!(out.is_error);
        assert_eq!(
            out.text,
            "Error: Upstream request failed: api/v2/chains returned HTTP 500: Internal Server Error"
        );
    }

    #[tokio::test]
    async fn successful_calls_return_text() {
        let (registry, _stub) = registry(StubUpstream::new().route(
            "api/v2/chains",
            json!([{"name": "Ethereum", "tvl": 5.0e10, "tokenSymbol": "ETH", "chainId": 1}]),
        ));

        let out = registry.dispatch(TOOL_GET_CHAINS, json!({"limit": 5})).await;

        assert!(!out.is_error);
        assert!(out.text.starts_with("**Chains by TVL**"));
        assert!(out.text.contains("$50.00B"));
    }

    #[tokio::test]
    async fn register_replaces_by_name() {
        struct Echo;

        #[async_trait::async_trait]
        impl Tool for Echo {
            fn name(&self) -> &'static str {
                TOOL_GET_BLOCK
            }
            fn description(&self) -> &'static str {
                "echo"
            }
            fn input_schema(&self) -> Value {
                json!({"type": "object"})
            }
            async fn execute(&self, args: Value) -> crate::Result<String> {
                Ok(args.to_string())
            }
        }

        let (mut registry, _stub) = registry(StubUpstream::new());
        registry.register(Echo);

        assert_eq!(registry.tools().len(), 12);
        let out = registry.dispatch(TOOL_GET_BLOCK, json!({"a": 1})).await;
        assert_eq!(out.text, r#"{"a":1}"#);
    }
}
