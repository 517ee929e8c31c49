//! In-memory response cache with TTL expiry
//!
//! Keys are derived from the endpoint path plus sorted query parameters, so
//! two requests that differ only in parameter order share an entry. A single
//! TTL applies to every entry. Expired entries read as misses and are swept
//! out on the next `put`.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// A stored upstream payload
#[derive(Debug, Clone)]
struct CacheEntry {
    payload: Value,
    inserted_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) < ttl
    }
}

/// Process-lifetime cache of upstream JSON payloads
///
/// Cloning is cheap and clones share the same map.
#[derive(Debug, Clone)]
pub struct ResponseCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Build a cache key from an endpoint and its query parameters.
    ///
    /// Parameters are sorted so the key does not depend on the order they
    /// were supplied in, and form-encoded so a value containing `&` or `=`
    /// cannot collide with a different parameter list.
    pub fn key_for<I, K, V>(endpoint: &str, params: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut pairs: Vec<(String, String)> = params
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();
        if pairs.is_empty() {
            return endpoint.to_string();
        }
        pairs.sort();

        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(&pairs)
            .finish();
        format!("{}?{}", endpoint, query)
    }

    /// Stored payload for `key`, if it is younger than the TTL
    pub async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.is_fresh(self.ttl, Instant::now()) {
            Some(entry.payload.clone())
        } else {
            None
        }
    }

    /// Store `payload` under `key`, replacing any previous entry
    pub async fn put(&self, key: impl Into<String>, payload: Value) {
        let now = Instant::now();
        let ttl = self.ttl;
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_fresh(ttl, now));
        entries.insert(
            key.into(),
            CacheEntry {
                payload,
                inserted_at: now,
            },
        );
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }

    /// Number of entries held, expired or not
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
