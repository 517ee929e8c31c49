//! DefiLlama MCP server CLI
//!
//! Serves the DefiLlama tools over MCP stdio, or runs one tool from the
//! command line.

use clap::{Parser, Subcommand};
use defillama_mcp::tools::ToolRegistry;
use defillama_mcp::{server, Config, DefiLlama, Error, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "defillama-mcp")]
#[command(about = "MCP server for DefiLlama DeFi data")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to a JSON config file; environment variables override it
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the tools over MCP stdio (default)
    Serve,

    /// List available tools
    Tools {
        /// Print each tool's input schema as well
        #[arg(long)]
        schema: bool,
    },

    /// Run one tool and print its output
    Call {
        /// Tool name, e.g. get_yield_pools
        tool: String,

        /// Arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    });

    // stdout carries the MCP protocol
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            tracing::info!(
                cache_ttl_secs = config.cache_ttl_secs,
                request_delay_secs = config.request_delay_secs,
                request_timeout_secs = config.request_timeout_secs,
                "Starting DefiLlama MCP server"
            );
            let registry = ToolRegistry::new(DefiLlama::from_config(&config)?);
            server::serve_stdio(registry).await?;
        }
        Commands::Tools { schema } => {
            let registry = ToolRegistry::new(DefiLlama::from_config(&config)?);
            for tool in registry.tools() {
                println!("{:<24} {}", tool.name(), tool.description());
                if schema {
                    println!("{}", serde_json::to_string_pretty(&tool.input_schema())?);
                }
            }
        }
        Commands::Call { tool, args } => {
            return run_call(&config, &tool, args.as_deref()).await;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Tool errors go to stderr with a failing exit code
async fn run_call(config: &Config, tool: &str, args: Option<&str>) -> Result<ExitCode> {
    let args: serde_json::Value = match args {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| Error::validation(format!("--args is not valid JSON: {}", e)))?,
        None => serde_json::json!({}),
    };

    let registry = ToolRegistry::new(DefiLlama::from_config(config)?);
    let output = registry.dispatch(tool, args).await;
    if output.is_error {
        eprintln!("{}", output.text);
        return Ok(ExitCode::FAILURE);
    }
    println!("{}", output.text);
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn failed_tool_call_maps_to_failure_exit_code() {
        let code = run_call(&Config::default(), "get_everything", None)
            .await
            .unwrap();
        assert_eq!(code, ExitCode::FAILURE);
    }

    #[tokio::test]
    async fn malformed_args_are_a_validation_error() {
        let result = run_call(&Config::default(), "get_chains", Some("{not json")).await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }
}
