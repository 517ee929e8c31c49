//! DefiLlama MCP server
//!
//! Exposes DefiLlama's public APIs (protocol TVL, token prices, yield
//! pools, stablecoins, DEX volumes) as MCP tools:
//! - upstream responses are cached in memory for a configurable TTL
//! - outbound requests are throttled and bounded by a timeout
//! - tool results are filtered, sorted and rendered as markdown text

pub mod cache;
pub mod client;
pub mod config;
pub mod filter;
pub mod format;
pub mod llama;
pub mod record;
pub mod server;
pub mod tools;

mod error;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use cache::ResponseCache;
pub use config::{Config, Host, UpstreamEndpoints};
pub use error::{Error, FetchError, Result};
pub use llama::DefiLlama;
pub use record::RawRecord;
pub use tools::{Tool, ToolOutput, ToolRegistry};
