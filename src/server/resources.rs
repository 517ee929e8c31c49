//! Static reference documents served as MCP resources

use crate::tools::ToolRegistry;
use rmcp::model::{AnnotateAble, RawResource, ReadResourceResult, Resource, ResourceContents};
use rmcp::ErrorData as McpError;
use std::fmt::Write;

pub const RESOURCE_CHAINS: &str = "chains://list";
pub const RESOURCE_ENDPOINTS: &str = "api://endpoints";

/// Chain names accepted by the chain-scoped tools
pub const SUPPORTED_CHAINS: &[&str] = &[
    "Ethereum", "BSC", "Polygon", "Avalanche", "Fantom", "Arbitrum", "Optimism", "Solana",
    "Terra", "Heco", "xDai", "Harmony", "Moonriver", "Cronos", "Aurora", "Fuse", "KCC",
    "OKExChain", "Celo", "Moonbeam", "Metis", "Kava", "Klaytn", "Iotex", "Milkomeda", "DFK",
    "REI", "Astar", "Emerald", "Palm", "Kardia", "TomoChain", "Velas", "Syscoin", "Ubiq",
    "Energi", "Step", "Godwoken", "Callisto", "CSC", "Ergo", "Liquidchain", "Nahmii",
    "ThunderCore", "Telos", "EOS", "WAX", "Hive", "Kujira", "Cosmos",
];

pub fn list() -> Vec<Resource> {
    vec![
        describe(
            RESOURCE_CHAINS,
            "supported_chains",
            "Blockchain networks tracked by DefiLlama",
        ),
        describe(
            RESOURCE_ENDPOINTS,
            "api_endpoints",
            "Available tools and the arguments each accepts",
        ),
    ]
}

fn describe(uri: &str, name: &str, description: &str) -> Resource {
    let mut raw = RawResource::new(uri, name);
    raw.description = Some(description.to_string());
    raw.mime_type = Some("text/markdown".to_string());
    raw.no_annotation()
}

pub fn read(registry: &ToolRegistry, uri: &str) -> Result<ReadResourceResult, McpError> {
    let text = match uri {
        RESOURCE_CHAINS => chains_text(),
        RESOURCE_ENDPOINTS => endpoints_text(registry),
        _ => {
            tracing::warn!(uri, "Unknown resource requested");
            return Err(McpError::resource_not_found(
                format!("Unknown resource '{}'", uri),
                None,
            ));
        }
    };
    Ok(ReadResourceResult {
        contents: vec![ResourceContents::text(text, uri)],
    })
}

fn chains_text() -> String {
    let mut out = format!(
        "**Supported Blockchain Networks ({} total)**\n\n",
        SUPPORTED_CHAINS.len()
    );
    for chain in SUPPORTED_CHAINS {
        let _ = writeln!(out, "- {}", chain);
    }
    out
}

/// One entry per registered tool, arguments read from its input schema
fn endpoints_text(registry: &ToolRegistry) -> String {
    let mut out = String::from("**DefiLlama API Endpoints**\n\n");
    for tool in registry.tools() {
        let schema = tool.input_schema();
        let args: Vec<&str> = schema
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|p| p.keys().map(String::as_str).collect())
            .unwrap_or_default();
        let args = if args.is_empty() {
            "no arguments".to_string()
        } else {
            args.join(", ")
        };
        let _ = writeln!(out, "- `{}` ({}): {}", tool.name(), args, tool.description());
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::server::tests::server;
    use crate::server::{RESOURCE_CHAINS, RESOURCE_ENDPOINTS, SUPPORTED_CHAINS};
    use crate::testing::StubUpstream;
    use rmcp::model::{ErrorCode, ResourceContents};

    fn text(contents: &ResourceContents) -> &str {
        match contents {
            ResourceContents::TextResourceContents { text, .. } => text,
            ResourceContents::BlobResourceContents { .. } => panic!("expected text"),
        }
    }

    #[test]
    fn both_resources_are_listed() {
        let (server, _stub) = server(StubUpstream::new());
        let resources = server.resources();
        let uris: Vec<&str> = resources.iter().map(|r| r.uri.as_str()).collect();
        assert_eq!(uris, [RESOURCE_CHAINS, RESOURCE_ENDPOINTS]);
    }

    #[test]
    fn chain_list_has_a_counted_header() {
        let (server, stub) = server(StubUpstream::new());

        let result = server.read(RESOURCE_CHAINS).unwrap();
        let body = text(&result.contents[0]);

        assert!(body.starts_with(&format!(
            "**Supported Blockchain Networks ({} total)**",
            SUPPORTED_CHAINS.len()
        )));
        assert!(body.contains("- Ethereum\n"));
        assert!(body.contains("- Cosmos\n"));
        assert_eq!(stub.call_count(), 0);
    }

    #[test]
    fn endpoint_list_follows_the_registry() {
        let (server, _stub) = server(StubUpstream::new());

        let result = server.read(RESOURCE_ENDPOINTS).unwrap();
        let body = text(&result.contents[0]);

        let entries = body.lines().filter(|l| l.starts_with("- `")).count();
        assert_eq!(entries, 12);
        let pools = body
            .lines()
            .find(|l| l.starts_with("- `get_yield_pools`"))
            .unwrap();
        assert!(pools.contains("min_tvl"));
        assert!(pools.contains("stablecoin_only"));
    }

    #[test]
    fn unknown_uri_is_not_found() {
        let (server, _stub) = server(StubUpstream::new());
        let err = server.read("chains://everything").unwrap_err();
        assert_eq!(err.code, ErrorCode::RESOURCE_NOT_FOUND);
        assert!(err.message.contains("chains://everything"));
    }
}
