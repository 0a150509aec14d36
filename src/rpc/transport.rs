use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::{NetworkError, Result, WatcherError};
use crate::logging::LogContext;

/// Sends one JSON-RPC request and hands back the raw response body
#[async_trait]
pub trait Transport: Send + Sync {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    params: Vec<Value>,
    id: u64,
}

/// JSON-RPC over HTTP POST
pub struct HttpTransport {
    client: Client,
    endpoint: String,
    timeout_seconds: u64,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(endpoint: String) -> Result<Self> {
        Self::new_with_config(endpoint, 30)
    }

    /// Transport with a request timeout and a pooled connection set
    pub fn new_with_config(endpoint: String, timeout_seconds: u64) -> Result<Self> {
        let context = LogContext::new("transport", "initialization")
            .with_metadata("endpoint", serde_json::json!(endpoint))
            .with_metadata("timeout_seconds", serde_json::json!(timeout_seconds));
        context.info("Initializing HTTP transport");

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(NetworkError::Http)?;

        Ok(Self {
            client,
            endpoint,
            timeout_seconds,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn classify_error(&self, error: reqwest::Error) -> WatcherError {
        let network_error = if error.is_timeout() {
            NetworkError::Timeout { seconds: self.timeout_seconds }
        } else if error.is_connect() {
            NetworkError::Connection(error.to_string())
        } else {
            NetworkError::Http(error)
        };
        WatcherError::Network(network_error)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<String> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        LogContext::new("transport", "call")
            .with_metadata("method", serde_json::json!(method))
            .with_metadata("id", serde_json::json!(request.id))
            .trace(&format!("Sending RPC request: {}", method));

        // `.json()` sets Content-Type: application/json
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status { code: status.as_u16() }.into());
        }

        response.text().await.map_err(|e| self.classify_error(e))
    }
}
