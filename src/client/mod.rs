//! HTTP access to the DefiLlama REST API
//!
//! The [`Upstream`] trait abstracts over how a GET request reaches DefiLlama:
//! - [`HttpUpstream`] issues real requests with a timeout and a fixed
//!   minimum delay between calls
//! - tests substitute an in-memory implementation
//!
//! Failures come back as [`FetchError`] values; nothing here retries.

mod throttle;

pub use throttle::Throttle;

use crate::cache::ResponseCache;
use crate::config::{Config, Host, UpstreamEndpoints};
use crate::error::FetchError;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Instant;
use url::Url;

pub const USER_AGENT: &str = concat!("defillama-mcp/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body kept in a [`FetchError::Status`]
const ERROR_BODY_LIMIT: usize = 200;

/// A GET request against one DefiLlama host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub host: Host,
    /// Path segments, unencoded
    pub segments: Vec<String>,
    /// Query parameters, unencoded
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new<I, S>(host: Host, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            host,
            segments: segments.into_iter().map(Into::into).collect(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Host-relative path, e.g. `/prices/current/coingecko:bitcoin`
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }

    /// Path prefixed with the host name, e.g. `yields/chart/<id>`
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.host.name(), self.path())
    }

    pub fn cache_key(&self) -> String {
        ResponseCache::key_for(
            &self.endpoint(),
            self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
        )
    }

    /// Absolute URL with percent-encoded segments and query
    pub fn url(&self, endpoints: &UpstreamEndpoints) -> std::result::Result<Url, FetchError> {
        let base = endpoints.base(self.host);
        let mut url = Url::parse(base).map_err(|e| FetchError::Network {
            endpoint: self.endpoint(),
            message: format!("invalid base URL '{}': {}", base, e),
        })?;

        url.path_segments_mut()
            .map_err(|_| FetchError::Network {
                endpoint: self.endpoint(),
                message: format!("base URL '{}' cannot carry a path", base),
            })?
            .pop_if_empty()
            .extend(&self.segments);

        if !self.params.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.params);
        }
        Ok(url)
    }
}

/// Trait for anything that can answer a DefiLlama GET with JSON
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get_json(&self, request: &ApiRequest) -> std::result::Result<Value, FetchError>;

    /// Name for logging
    fn name(&self) -> &'static str;
}

/// reqwest-backed upstream with timeout and throttling
pub struct HttpUpstream {
    client: Client,
    endpoints: UpstreamEndpoints,
    throttle: Throttle,
}

impl HttpUpstream {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoints: config.endpoints.clone(),
            throttle: Throttle::new(config.request_delay()),
        })
    }

    fn classify(endpoint: &str, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else {
            FetchError::Network {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get_json(&self, request: &ApiRequest) -> std::result::Result<Value, FetchError> {
        let endpoint = request.endpoint();
        let url = request.url(&self.endpoints)?;

        self.throttle.wait().await;
        let start = Instant::now();

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::classify(&endpoint, e))?;

        let status = response.status();
        tracing::debug!(
            endpoint = %endpoint,
            status = status.as_u16(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Upstream responded"
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                endpoint,
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Self::classify(&endpoint, e))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(FetchError::Decode {
                endpoint,
                message: "empty response".to_string(),
            });
        }

        serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode {
            endpoint,
            message: format!("invalid JSON: {}", e),
        })
    }

    fn name(&self) -> &'static str {
        "HttpUpstream"
    }
}
