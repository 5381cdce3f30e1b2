//! Network configuration
//!
//! Plain serde structs. Every field has a default, so `{}` is a valid config
//! for a local node. Call [`RpcConfig::validate`] / [`WatchConfig::validate`]
//! before use; all problems are reported at once.

use crate::error::WasmPolyxError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// JSON-RPC client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcConfig {
    /// HTTP JSON-RPC endpoint of the node
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Bound on a single request, including reading the response
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Retries after the first attempt, for transport faults only
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Backoff before the first retry; doubles per attempt
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_endpoint() -> String {
    "http://127.0.0.1:9933".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_ms: default_request_timeout_ms(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RpcConfig {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), WasmPolyxError> {
        let mut errors = Vec::new();
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            errors.push(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            ));
        }
        if self.request_timeout_ms == 0 {
            errors.push("requestTimeoutMs must be greater than 0".to_string());
        }
        if self.max_backoff_ms < self.retry_backoff_ms {
            errors.push(format!(
                "maxBackoffMs ({}) must not be below retryBackoffMs ({})",
                self.max_backoff_ms, self.retry_backoff_ms
            ));
        }
        into_result(errors)
    }
}

/// Status watcher settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchConfig {
    /// Delay between polls of the pool and the chain
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Give up (with an unknown outcome) when no terminal status is seen in this bound
    #[serde(default = "default_watch_timeout_secs")]
    pub timeout_secs: u64,
    /// Blocks behind the best block to scan when attaching, so a transaction
    /// included before the watcher started is still found
    #[serde(default = "default_lookback_blocks")]
    pub lookback_blocks: u32,
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_watch_timeout_secs() -> u64 {
    120
}

fn default_lookback_blocks() -> u32 {
    10
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            timeout_secs: default_watch_timeout_secs(),
            lookback_blocks: default_lookback_blocks(),
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), WasmPolyxError> {
        let mut errors = Vec::new();
        if self.poll_interval_ms == 0 {
            errors.push("pollIntervalMs must be greater than 0".to_string());
        }
        if self.timeout_secs == 0 {
            errors.push("timeoutSecs must be greater than 0".to_string());
        }
        if self.poll_interval_ms / 1000 >= self.timeout_secs && self.timeout_secs > 0 {
            errors.push(format!(
                "pollIntervalMs ({}) must be shorter than timeoutSecs ({})",
                self.poll_interval_ms, self.timeout_secs
            ));
        }
        into_result(errors)
    }
}

fn into_result(errors: Vec<String>) -> Result<(), WasmPolyxError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(WasmPolyxError::InvalidInput(errors.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_uses_defaults() {
        let rpc: RpcConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(rpc, RpcConfig::default());
        assert!(rpc.validate().is_ok());

        let watch: WatchConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(watch, WatchConfig::default());
        assert!(watch.validate().is_ok());
    }

    #[test]
    fn test_partial_override() {
        let rpc: RpcConfig = serde_json::from_str(
            r#"{ "endpoint": "https://testnet-rpc.polymesh.live", "maxRetries": 0 }"#,
        )
        .unwrap();
        assert_eq!(rpc.endpoint, "https://testnet-rpc.polymesh.live");
        assert_eq!(rpc.max_retries, 0);
        assert_eq!(rpc.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let rpc = RpcConfig {
            endpoint: "ws://localhost:9944".to_string(),
            request_timeout_ms: 0,
            max_retries: 1,
            retry_backoff_ms: 100,
            max_backoff_ms: 10,
        };
        match rpc.validate() {
            Err(WasmPolyxError::InvalidInput(msg)) => {
                assert!(msg.contains("endpoint"));
                assert!(msg.contains("requestTimeoutMs"));
                assert!(msg.contains("maxBackoffMs"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_watch_validation() {
        let watch = WatchConfig {
            poll_interval_ms: 5_000,
            timeout_secs: 2,
            lookback_blocks: 0,
        };
        assert!(watch.validate().is_err());
        assert!(WatchConfig {
            poll_interval_ms: 0,
            ..WatchConfig::default()
        }
        .validate()
        .is_err());
    }
}
