//! Cached access to DefiLlama
//!
//! `DefiLlama` is the only place the cache and the upstream meet:
//! lookup, then on a miss fetch and store. A failed fetch stores nothing,
//! so the next call for the same key goes back to the network.

use crate::cache::ResponseCache;
use crate::client::{ApiRequest, HttpUpstream, Upstream};
use crate::config::Config;
use crate::Result;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone)]
pub struct DefiLlama {
    upstream: Arc<dyn Upstream>,
    cache: ResponseCache,
}

impl DefiLlama {
    pub fn new(upstream: Arc<dyn Upstream>, cache: ResponseCache) -> Self {
        Self { upstream, cache }
    }

    /// Real HTTP upstream with a fresh cache, both configured from `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let upstream = HttpUpstream::new(config)?;
        Ok(Self::new(
            Arc::new(upstream),
            ResponseCache::new(config.cache_ttl()),
        ))
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// JSON for `request`, from the cache when fresh
    pub async fn fetch(&self, request: &ApiRequest) -> Result<Value> {
        let key = request.cache_key();

        if let Some(payload) = self.cache.get(&key).await {
            tracing::debug!(cache_key = %key, "Cache hit");
            return Ok(payload);
        }

        let start = Instant::now();
        let payload = match self.upstream.get_json(request).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(
                    upstream = self.upstream.name(),
                    endpoint = %e.endpoint(),
                    error = %e,
                    "Upstream fetch failed"
                );
                return Err(e.into());
            }
        };

        tracing::debug!(
            cache_key = %key,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Cache miss, stored fresh payload"
        );
        self.cache.put(key, payload.clone()).await;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Host;
    use crate::error::FetchError;
    use crate::testing::StubUpstream;
    use crate::Error;
    use serde_json::json;
    use std::time::Duration;

    fn llama(stub: &Arc<StubUpstream>) -> DefiLlama {
        DefiLlama::new(stub.clone(), ResponseCache::new(Duration::from_secs(300)))
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let stub = Arc::new(StubUpstream::new().route("api/protocols", json!([{"name": "Aave"}])));
        let llama = llama(&stub);
        let request = ApiRequest::new(Host::Api, ["protocols"]);

        let first = llama.fetch(&request).await.unwrap();
        let second = llama.fetch(&request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(stub.call_count(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_leaves_cache_empty_and_retries_next_time() {
        let stub = Arc::new(StubUpstream::new().route_sequence(
            "yields/pools",
            vec![
                Err(FetchError::Status {
                    endpoint: "yields/pools".to_string(),
                    status: 500,
                    body: "Internal Server Error".to_string(),
                }),
                Ok(json!({"data": []})),
            ],
        ));
        let llama = llama(&stub);
        let request = ApiRequest::new(Host::Yields, ["pools"]);

        let err = llama.fetch(&request).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Fetch(FetchError::Status { status: 500, .. })
        ));
        assert_eq!(llama.cache().get(&request.cache_key()).await, None);
        assert!(llama.cache().is_empty().await);

        let value = llama.fetch(&request).await.unwrap();
        assert_eq!(value, json!({"data": []}));
        assert_eq!(stub.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entry_is_refetched() {
        let stub = Arc::new(StubUpstream::new().route("api/v2/chains", json!([])));
        let llama = DefiLlama::new(stub.clone(), ResponseCache::new(Duration::from_secs(5)));
        let request = ApiRequest::new(Host::Api, ["v2", "chains"]);

        llama.fetch(&request).await.unwrap();
        tokio::time::advance(Duration::from_secs(6)).await;
        llama.fetch(&request).await.unwrap();

        assert_eq!(stub.call_count(), 2);
    }

    #[tokio::test]
    async fn different_params_use_different_entries() {
        let stub = Arc::new(StubUpstream::new().route("coins/prices/current/coingecko:bitcoin", json!({"coins": {}})));
        let llama = llama(&stub);

        let plain = ApiRequest::new(Host::Coins, ["prices", "current", "coingecko:bitcoin"]);
        let widened = plain.clone().param("searchWidth", "4h");

        llama.fetch(&plain).await.unwrap();
        llama.fetch(&widened).await.unwrap();
        llama.fetch(&widened).await.unwrap();

        assert_eq!(stub.call_count(), 2);
    }
}
