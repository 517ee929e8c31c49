//! In-memory upstream for unit tests

use crate::client::{ApiRequest, Upstream};
use crate::error::FetchError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

type Reply = Result<Value, FetchError>;

/// Answers requests by endpoint (`host/path`, query ignored).
///
/// A route with several replies hands them out in order and then keeps
/// repeating the last one. Unknown endpoints answer 404.
#[derive(Default)]
pub struct StubUpstream {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
}

impl StubUpstream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, endpoint: &str, payload: Value) -> Self {
        self.route_sequence(endpoint, vec![Ok(payload)])
    }

    pub fn route_sequence(self, endpoint: &str, replies: Vec<Reply>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), replies.into());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Cache keys of every request received, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Upstream for StubUpstream {
    async fn get_json(&self, request: &ApiRequest) -> Result<Value, FetchError> {
        self.calls.lock().unwrap().push(request.cache_key());

        let endpoint = request.endpoint();
        let mut routes = self.routes.lock().unwrap();
        let Some(replies) = routes.get_mut(&endpoint) else {
            return Err(FetchError::Status {
                endpoint,
                status: 404,
                body: "not found".to_string(),
            });
        };
        if replies.len() > 1 {
            replies.pop_front().unwrap()
        } else {
            replies.front().cloned().unwrap()
        }
    }

    fn name(&self) -> &'static str {
        "StubUpstream"
    }
}
