//! Error types for wasm-polyx
//!
//! Two layers:
//! - [`WasmPolyxError`]: raised by the codec, address, payload and signer code.
//!   These fail fast and carry no pipeline context.
//! - [`TxError`]: the taxonomy surfaced by the assembler, metadata fetcher,
//!   submitter and pipeline. Every value records the stage it came from, the
//!   payload kind and the sender, so a local construction bug can be told apart
//!   from a chain-level rejection.

use crate::address::AccountId;
use core::fmt;
use thiserror::Error;
use wasm_bindgen::JsValue;

/// Main error type for the offline layers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WasmPolyxError {
    /// Invalid SS58 address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    /// Invalid transaction format
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    /// Invalid signature
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),
    /// SCALE codec decode error
    #[error("SCALE decode error: {0}")]
    ScaleDecodeError(String),
    /// Call could not be encoded or decoded against the metadata
    #[error("Call codec error: {0}")]
    CallCodec(String),
    /// Payload was built for a different runtime than the registry describes
    #[error("Stale metadata: registry is for spec version {registry}, payload uses {payload}")]
    StaleMetadata { registry: u32, payload: u32 },
    /// Signing algorithm could not be determined
    #[error("Unknown key type: {0}")]
    UnknownKeyType(String),
    /// No key is held for the address
    #[error("Key not found for address {0}")]
    KeyNotFound(String),
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Generic string error
    #[error("{0}")]
    StringError(String),
}

impl WasmPolyxError {
    /// True for the key-resolution failures (`UnknownKeyType`, `KeyNotFound`)
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            WasmPolyxError::UnknownKeyType(_) | WasmPolyxError::KeyNotFound(_)
        )
    }
}

impl From<&str> for WasmPolyxError {
    fn from(s: &str) -> Self {
        WasmPolyxError::StringError(s.to_string())
    }
}

impl From<String> for WasmPolyxError {
    fn from(s: String) -> Self {
        WasmPolyxError::StringError(s)
    }
}

impl From<parity_scale_codec::Error> for WasmPolyxError {
    fn from(err: parity_scale_codec::Error) -> Self {
        WasmPolyxError::ScaleDecodeError(err.to_string())
    }
}

impl From<hex::FromHexError> for WasmPolyxError {
    fn from(err: hex::FromHexError) -> Self {
        WasmPolyxError::InvalidInput(format!("Invalid hex: {}", err))
    }
}

/// Pipeline stage an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchMetadata,
    BuildRegistry,
    BuildPayload,
    Encode,
    Sign,
    Assemble,
    Submit,
    Watch,
}

impl Stage {
    /// Stages that run offline, before anything reaches the network
    pub fn is_local(self) -> bool {
        matches!(
            self,
            Stage::BuildPayload | Stage::Encode | Stage::Sign | Stage::Assemble
        )
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::FetchMetadata => "fetch-metadata",
            Stage::BuildRegistry => "build-registry",
            Stage::BuildPayload => "build-payload",
            Stage::Encode => "encode",
            Stage::Sign => "sign",
            Stage::Assemble => "assemble",
            Stage::Submit => "submit",
            Stage::Watch => "watch",
        };
        f.write_str(name)
    }
}

/// Which representation was being processed when an error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Structured,
    Raw,
    Extrinsic,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadKind::Structured => f.write_str("structured"),
            PayloadKind::Raw => f.write_str("raw"),
            PayloadKind::Extrinsic => f.write_str("extrinsic"),
        }
    }
}

/// Error taxonomy for the transaction pipeline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    /// Retryable transport fault
    #[error("network error: {0}")]
    Network(String),
    /// Malformed metadata or RPC response
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Cached metadata does not match the chain's runtime
    #[error("stale metadata: expected spec version {expected}, found {actual}")]
    StaleMetadata { expected: u32, actual: u32 },
    /// Missing key or unresolvable algorithm
    #[error("key error: {0}")]
    Key(WasmPolyxError),
    /// Local signature/address/algorithm mismatch, caught before any network call
    #[error("assembly error: {0}")]
    Assembly(String),
    /// The node's transaction pool refused the extrinsic
    #[error("rejected by pool ({code}): {message}{}", detail_suffix(.data))]
    RejectedByPool {
        code: i64,
        message: String,
        data: Option<String>,
    },
    /// No terminal answer within the bound. The outcome is unknown.
    #[error("timed out after {after_ms}ms, outcome unknown")]
    Timeout { after_ms: u64 },
}

fn detail_suffix(data: &Option<String>) -> String {
    data.as_deref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default()
}

/// Transaction pool code for "Transaction Already Imported"
pub const POOL_ALREADY_IMPORTED: i64 = 1013;

/// An error with the context it was raised in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxError {
    pub stage: Stage,
    pub payload: Option<PayloadKind>,
    pub sender: Option<AccountId>,
    pub kind: ErrorKind,
}

impl TxError {
    pub fn new(stage: Stage, kind: ErrorKind) -> Self {
        TxError {
            stage,
            payload: None,
            sender: None,
            kind,
        }
    }

    pub fn with_payload(mut self, payload: PayloadKind) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn with_sender(mut self, sender: AccountId) -> Self {
        self.sender = Some(sender);
        self
    }

    /// Translate a lower-layer error raised while working on `stage`
    pub fn from_local(stage: Stage, err: WasmPolyxError) -> Self {
        let kind = match err {
            WasmPolyxError::StaleMetadata { registry, payload } => ErrorKind::StaleMetadata {
                expected: registry,
                actual: payload,
            },
            e if e.is_key_error() => ErrorKind::Key(e),
            e if stage.is_local() => ErrorKind::Assembly(e.to_string()),
            e => ErrorKind::Protocol(e.to_string()),
        };
        TxError::new(stage, kind)
    }

    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Network(_))
    }

    /// Whether the outcome on chain is unknown and must be resolved by a status query
    pub fn is_unknown_outcome(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout { .. })
    }

    /// Whether the pool reported that it already holds this extrinsic.
    /// A temporary ban (1012) does not count: it also follows invalid or
    /// removed transactions.
    pub fn is_already_known(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::RejectedByPool { code, .. } if code == POOL_ALREADY_IMPORTED
        )
    }
}

impl fmt::Display for TxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed", self.stage)?;
        match (&self.payload, &self.sender) {
            (Some(p), Some(s)) => write!(f, " [{} payload, sender {}]", p, s)?,
            (Some(p), None) => write!(f, " [{} payload]", p)?,
            (None, Some(s)) => write!(f, " [sender {}]", s)?,
            (None, None) => {}
        }
        write!(f, ": {}", self.kind)
    }
}

impl std::error::Error for TxError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<WasmPolyxError> for JsValue {
    fn from(err: WasmPolyxError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}

impl From<TxError> for JsValue {
    fn from(err: TxError) -> Self {
        js_sys::Error::new(&err.to_string()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WasmPolyxError::InvalidAddress("bad address".to_string());
        assert_eq!(err.to_string(), "Invalid address: bad address");
    }

    #[test]
    fn test_from_str() {
        let err: WasmPolyxError = "test error".into();
        assert_eq!(err.to_string(), "test error");
    }

    #[test]
    fn test_tx_error_carries_context() {
        let sender = AccountId([7u8; 32]);
        let err = TxError::new(Stage::Assemble, ErrorKind::Assembly("mismatch".into()))
            .with_payload(PayloadKind::Structured)
            .with_sender(sender);
        let text = err.to_string();
        assert!(text.starts_with("assemble failed [structured payload, sender 0x0707"));
        assert!(text.ends_with("assembly error: mismatch"));
    }

    #[test]
    fn test_from_local_translation() {
        let stale = TxError::from_local(
            Stage::Encode,
            WasmPolyxError::StaleMetadata {
                registry: 7,
                payload: 6,
            },
        );
        assert_eq!(
            stale.kind,
            ErrorKind::StaleMetadata {
                expected: 7,
                actual: 6
            }
        );

        let key = TxError::from_local(Stage::Sign, WasmPolyxError::KeyNotFound("x".into()));
        assert!(matches!(key.kind, ErrorKind::Key(_)));

        let asm = TxError::from_local(
            Stage::Assemble,
            WasmPolyxError::InvalidSignature("bad".into()),
        );
        assert!(matches!(asm.kind, ErrorKind::Assembly(_)));

        let meta = TxError::from_local(
            Stage::BuildRegistry,
            WasmPolyxError::ScaleDecodeError("truncated".into()),
        );
        assert!(matches!(meta.kind, ErrorKind::Protocol(_)));
    }

    #[test]
    fn test_rejected_display_keeps_reason_verbatim() {
        let err = TxError::new(
            Stage::Submit,
            ErrorKind::RejectedByPool {
                code: 1010,
                message: "Invalid Transaction".into(),
                data: Some("Inability to pay some fees (e.g. account balance too low)".into()),
            },
        );
        assert_eq!(
            err.to_string(),
            "submit failed: rejected by pool (1010): Invalid Transaction \
             (Inability to pay some fees (e.g. account balance too low))"
        );
        assert!(!err.is_retryable());
        assert!(!err.is_already_known());
    }

    #[test]
    fn test_classification() {
        let timeout = TxError::new(Stage::Submit, ErrorKind::Timeout { after_ms: 100 });
        assert!(timeout.is_unknown_outcome());
        assert!(!timeout.is_retryable());

        let net = TxError::new(Stage::FetchMetadata, ErrorKind::Network("refused".into()));
        assert!(net.is_retryable());

        let known = TxError::new(
            Stage::Submit,
            ErrorKind::RejectedByPool {
                code: POOL_ALREADY_IMPORTED,
                message: "Transaction Already Imported".into(),
                data: None,
            },
        );
        assert!(known.is_already_known());

        let banned = TxError::new(
            Stage::Submit,
            ErrorKind::RejectedByPool {
                code: 1012,
                message: "Transaction is temporarily banned".into(),
                data: None,
            },
        );
        assert!(!banned.is_already_known());
    }
}
