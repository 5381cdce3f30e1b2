//! JSON-RPC over HTTP
//!
//! One request per HTTP round trip, bounded by the configured timeout.
//! Transport faults are retried with exponential backoff. Answers from the node
//! (including JSON-RPC errors) are never retried here.

use crate::config::RpcConfig;
use crate::error::{ErrorKind, Stage, TxError, WasmPolyxError};
use rand::Rng;
use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

/// Failure of a single JSON-RPC exchange
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// The request failed in transport. `delivered` is false only when the
    /// connection was never established, so the node cannot have seen it.
    #[error("transport error: {message}")]
    Transport { message: String, delivered: bool },
    /// No response within the bound
    #[error("request timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },
    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },
    #[error("malformed response: {0}")]
    Malformed(String),
    /// JSON-RPC error object returned by the node
    #[error("node error {code}: {message}")]
    Node {
        code: i64,
        message: String,
        data: Option<String>,
    },
}

impl RpcError {
    /// Whether the same request may succeed if sent again
    pub fn is_transient(&self) -> bool {
        match self {
            RpcError::Transport { .. } | RpcError::Timeout { .. } => true,
            RpcError::Http { status } => *status == 429 || *status >= 500,
            RpcError::Malformed(_) | RpcError::Node { .. } => false,
        }
    }

    /// Whether the node may have received (and acted on) the request
    pub fn maybe_delivered(&self) -> bool {
        !matches!(
            self,
            RpcError::Transport {
                delivered: false,
                ..
            }
        )
    }
}

impl RpcError {
    /// Translate into the pipeline taxonomy for `stage`
    ///
    /// A node error during submission is a pool rejection and keeps the node's
    /// code, message and data. A timeout is an unknown outcome only where the
    /// request had side effects (submission and watching); for reads it is a
    /// plain network fault.
    pub fn into_tx_error(self, stage: Stage) -> TxError {
        let side_effects = matches!(stage, Stage::Submit | Stage::Watch);
        let kind = match self {
            RpcError::Transport { message, .. } => ErrorKind::Network(message),
            RpcError::Http { status } => ErrorKind::Network(format!("HTTP status {}", status)),
            RpcError::Timeout { after_ms } if side_effects => ErrorKind::Timeout { after_ms },
            e @ RpcError::Timeout { .. } => ErrorKind::Network(e.to_string()),
            RpcError::Malformed(message) => ErrorKind::Protocol(message),
            RpcError::Node {
                code,
                message,
                data,
            } if stage == Stage::Submit => ErrorKind::RejectedByPool {
                code,
                message,
                data,
            },
            e @ RpcError::Node { .. } => ErrorKind::Protocol(e.to_string()),
        };
        TxError::new(stage, kind)
    }
}

/// Block header as returned by `chain_getHeader`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    pub parent_hash: String,
    #[serde(deserialize_with = "deserialize_hex_u32")]
    pub number: u32,
}

/// `chain_getBlock` result
#[derive(Debug, Clone, Deserialize)]
pub struct SignedBlock {
    pub block: Block,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Block {
    pub header: Header,
    /// Hex-encoded extrinsics, each with its length prefix
    pub extrinsics: Vec<String>,
}

/// Block numbers are hex strings (`"0x1a2b"`) in headers
fn deserialize_hex_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum HexOrNumber {
        Number(u32),
        Hex(String),
    }

    match HexOrNumber::deserialize(deserializer)? {
        HexOrNumber::Number(n) => Ok(n),
        HexOrNumber::Hex(s) => {
            u32::from_str_radix(s.trim_start_matches("0x"), 16).map_err(de::Error::custom)
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

impl RpcResponse {
    fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(err) => Err(RpcError::Node {
                code: err.code,
                message: err.message,
                data: err.data.map(|d| match d {
                    Value::String(s) => s,
                    other => other.to_string(),
                }),
            }),
            // `null` results deserialize to `None`
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Exponential backoff with up to 10% jitter
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base).min(max_ms);

    let jitter_range = delay_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(delay_ms + jitter)
}

/// HTTP JSON-RPC client for one node
#[derive(Debug)]
pub struct RpcClient {
    http: reqwest::Client,
    config: RpcConfig,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(config: RpcConfig) -> Result<Self, WasmPolyxError> {
        config.validate()?;
        Ok(RpcClient {
            http: reqwest::Client::new(),
            config,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Call `method`, retrying transport faults, and deserialize the result
    pub async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, RpcError> {
        let value = self
            .with_retry(method, || self.call_once(method, &params))
            .await?;
        serde_json::from_value(value)
            .map_err(|e| RpcError::Malformed(format!("{} result: {}", method, e)))
    }

    /// A single attempt, no retries
    pub async fn call_once(&self, method: &str, params: &Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let response: RpcResponse = serde_json::from_value(self.post(&body).await?)
            .map_err(|e| RpcError::Malformed(format!("{}: {}", method, e)))?;
        response.into_result()
    }

    /// Send several calls in one HTTP round trip. Results come back in call order.
    pub async fn batch(
        &self,
        calls: &[(&str, Value)],
    ) -> Result<Vec<Result<Value, RpcError>>, RpcError> {
        self.with_retry("batch", || self.batch_once(calls)).await
    }

    async fn batch_once(
        &self,
        calls: &[(&str, Value)],
    ) -> Result<Vec<Result<Value, RpcError>>, RpcError> {
        let first_id = self
            .next_id
            .fetch_add(calls.len() as u64, Ordering::Relaxed);
        let body = Value::Array(
            calls
                .iter()
                .enumerate()
                .map(|(i, (method, params))| {
                    json!({
                        "jsonrpc": "2.0",
                        "id": first_id + i as u64,
                        "method": method,
                        "params": params,
                    })
                })
                .collect(),
        );

        let responses = match self.post(&body).await? {
            Value::Array(items) => items,
            // A single object answers the whole batch, e.g. a parse error
            other => {
                let response: RpcResponse = serde_json::from_value(other)
                    .map_err(|e| RpcError::Malformed(format!("batch: {}", e)))?;
                response.into_result()?;
                return Err(RpcError::Malformed(
                    "batch answered with a single result".to_string(),
                ));
            }
        };

        let mut results: Vec<Option<Result<Value, RpcError>>> = vec![None; calls.len()];
        for item in responses {
            let response: RpcResponse = serde_json::from_value(item)
                .map_err(|e| RpcError::Malformed(format!("batch item: {}", e)))?;
            let index = response
                .id
                .as_ref()
                .and_then(Value::as_u64)
                .and_then(|id| id.checked_sub(first_id))
                .map(|i| i as usize)
                .filter(|i| *i < calls.len())
                .ok_or_else(|| RpcError::Malformed("batch item with unknown id".to_string()))?;
            results[index] = Some(response.into_result());
        }

        results
            .into_iter()
            .enumerate()
            .map(|(i, r)| {
                r.ok_or_else(|| {
                    RpcError::Malformed(format!("no answer for batch call {}", calls[i].0))
                })
            })
            .collect()
    }

    async fn with_retry<T, F, Fut>(&self, method: &str, mut op: F) -> Result<T, RpcError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let delay = calculate_backoff(
                        attempt,
                        self.config.retry_backoff_ms,
                        self.config.max_backoff_ms,
                    );
                    tracing::warn!(
                        method,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "RPC request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::debug!(method, attempt, error = %e, "RPC request failed");
                    return Err(e);
                }
                Ok(value) => return Ok(value),
            }
        }
    }

    async fn post(&self, body: &Value) -> Result<Value, RpcError> {
        let request = async {
            let response = self
                .http
                .post(&self.config.endpoint)
                .json(body)
                .send()
                .await
                .map_err(transport_error)?;
            let status = response.status();
            if !status.is_success() {
                return Err(RpcError::Http {
                    status: status.as_u16(),
                });
            }
            response.json::<Value>().await.map_err(|e| {
                if e.is_decode() {
                    RpcError::Malformed(e.to_string())
                } else {
                    transport_error(e)
                }
            })
        };

        match tokio::time::timeout(self.config.request_timeout(), request).await {
            Ok(result) => result,
            Err(_) => Err(RpcError::Timeout {
                after_ms: self.config.request_timeout_ms,
            }),
        }
    }
}

fn transport_error(e: reqwest::Error) -> RpcError {
    RpcError::Transport {
        delivered: !e.is_connect(),
        message: e.to_string(),
    }
}
