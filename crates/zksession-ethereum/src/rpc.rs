//! Minimal JSON-RPC 2.0 client over HTTP
//!
//! Node, bundler and paymaster adapters all speak JSON-RPC; this client owns
//! the envelope and error mapping so each adapter only deals with its own
//! methods and result types.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

use crate::error::RpcError;

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

/// Per-request limit covering connect, send and body read
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC client bound to one endpoint
#[derive(Debug)]
pub struct JsonRpcClient {
    url: reqwest::Url,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: &str) -> Result<Self, RpcError> {
        Self::with_timeout(url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Client whose requests fail with [`RpcError::Transport`] after `timeout`
    pub fn with_timeout(url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let url = reqwest::Url::parse(url)
            .map_err(|e| RpcError::InvalidUrl(format!("{}: {}", redact(url), e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::Transport(format!("HTTP client setup failed: {}", e)))?;
        Ok(Self {
            url,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Endpoint with any query string (API keys) removed, for logs
    pub fn endpoint(&self) -> String {
        redact(self.url.as_str())
    }

    /// Call `method` with positional `params` and decode the result
    ///
    /// A `null` result decodes into `R` as JSON `null`, so `Option<T>` results
    /// map a missing value to `None`.
    pub async fn request<P, R>(&self, method: &str, params: P) -> Result<R, RpcError>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": id,
        });
        debug!(method, id, endpoint = %self.endpoint(), "JSON-RPC request");
        trace!(%body, "JSON-RPC request body");

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Transport(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RpcError::Transport(format!("{} response unreadable: {}", method, e)))?;

        let parsed: RpcResponse = match serde_json::from_str(&text) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => {
                return Err(RpcError::Transport(format!("{} returned HTTP {}", method, status)));
            }
            Err(e) => return Err(RpcError::Decode(format!("{}: {}", method, e))),
        };

        if let Some(error) = parsed.error {
            let message = match error.data {
                Some(data) if !data.is_null() => format!("{} ({})", error.message, data),
                _ => error.message,
            };
            return Err(RpcError::Rpc {
                code: error.code,
                message,
            });
        }

        let result = parsed.result.unwrap_or(serde_json::Value::Null);
        serde_json::from_value(result).map_err(|e| RpcError::Decode(format!("{}: {}", method, e)))
    }
}

fn redact(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{}?<redacted>", base),
        None => url.to_string(),
    }
}
