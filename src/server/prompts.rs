//! Canned analysis prompts that steer the host toward the DefiLlama tools

use rmcp::model::{
    GetPromptResult, JsonObject, Prompt, PromptArgument, PromptMessage, PromptMessageRole,
};
use rmcp::ErrorData as McpError;
use serde_json::Value;

pub const PROMPT_ANALYZE_PORTFOLIO: &str = "analyze_defi_portfolio";
pub const PROMPT_FIND_YIELD: &str = "find_yield_opportunities";

const DEFAULT_MIN_APY: f64 = 5.0;
const DEFAULT_MAX_RISK: &str = "medium";
const RISK_LEVELS: [&str; 3] = ["low", "medium", "high"];

fn argument(name: &str, description: &str, required: bool) -> PromptArgument {
    PromptArgument {
        name: name.to_string(),
        title: None,
        description: Some(description.to_string()),
        required: Some(required),
    }
}

pub fn list() -> Vec<Prompt> {
    vec![
        Prompt::new(
            PROMPT_ANALYZE_PORTFOLIO,
            Some("Analyze a set of DeFi tokens using live DefiLlama data"),
            Some(vec![argument(
                "tokens",
                "Tokens to analyze, e.g. coingecko:ethereum,coingecko:aave",
                true,
            )]),
        ),
        Prompt::new(
            PROMPT_FIND_YIELD,
            Some("Find yield pools matching an APY floor and risk ceiling"),
            Some(vec![
                argument("min_apy", "Minimum APY in percent (default 5)", false),
                argument("max_risk", "Highest acceptable risk: low, medium or high", false),
            ]),
        ),
    ]
}

pub fn render(name: &str, arguments: Option<&JsonObject>) -> Result<GetPromptResult, McpError> {
    let (description, text) = match name {
        PROMPT_ANALYZE_PORTFOLIO => {
            let tokens = text_arg(arguments, "tokens")
                .ok_or_else(|| McpError::invalid_params("'tokens' is required", None))?;
            ("DeFi portfolio analysis", portfolio_text(&tokens))
        }
        PROMPT_FIND_YIELD => {
            let min_apy = min_apy_arg(arguments)?;
            let max_risk = match text_arg(arguments, "max_risk") {
                Some(risk) => {
                    let risk = risk.to_lowercase();
                    if !RISK_LEVELS.contains(&risk.as_str()) {
                        return Err(McpError::invalid_params(
                            format!("'max_risk' must be one of low, medium, high; got '{}'", risk),
                            None,
                        ));
                    }
                    risk
                }
                None => DEFAULT_MAX_RISK.to_string(),
            };
            ("Yield opportunity search", yield_text(min_apy, &max_risk))
        }
        _ => {
            return Err(McpError::invalid_params(
                format!("Unknown prompt '{}'", name),
                None,
            ))
        }
    };

    Ok(GetPromptResult {
        description: Some(description.to_string()),
        messages: vec![PromptMessage::new_text(PromptMessageRole::User, text)],
    })
}

/// Trimmed string argument; numbers are accepted in their JSON form
fn text_arg(arguments: Option<&JsonObject>, key: &str) -> Option<String> {
    let value = match arguments?.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(value).filter(|v| !v.is_empty())
}

fn min_apy_arg(arguments: Option<&JsonObject>) -> Result<f64, McpError> {
    let Some(raw) = text_arg(arguments, "min_apy") else {
        return Ok(DEFAULT_MIN_APY);
    };
    match raw.parse::<f64>() {
        Ok(apy) if apy.is_finite() && apy >= 0.0 => Ok(apy),
        _ => Err(McpError::invalid_params(
            format!("'min_apy' must be a non-negative number, got '{}'", raw),
            None,
        )),
    }
}

fn portfolio_text(tokens: &str) -> String {
    format!(
        "Analyze this DeFi portfolio and share your findings.\n\n\
         Tokens: {tokens}\n\n\
         Cover:\n\
         1. Current price and recent price change of each token (get_current_prices, get_price_changes)\n\
         2. Risk: volatility and smart contract exposure of the issuing protocols (get_protocol)\n\
         3. Yield pools where these tokens can be deployed (get_yield_pools)\n\
         4. Diversification recommendations\n\
         5. Market trends affecting these assets (get_chains, get_dex_overview)\n\n\
         Fetch live data with the DefiLlama tools before drawing conclusions."
    )
}

fn yield_text(min_apy: f64, max_risk: &str) -> String {
    format!(
        "Find the best yield opportunities for these criteria:\n\n\
         - Minimum APY: {min_apy}%\n\
         - Maximum risk level: {max_risk}\n\n\
         Steps:\n\
         1. Fetch pools with get_yield_pools using min_apy={min_apy}\n\
         2. Drop pools whose risk exceeds the limit\n\
         3. For the top candidates assess protocol reputation and security, \
         TVL depth and stability (get_pool_chart), token pair composition, \
         and impermanent loss exposure\n\
         4. Recommend specific pools and explain why"
    )
}
