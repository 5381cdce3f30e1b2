//! wasm-polyx: offline transaction preparation and signing for Polymesh
//!
//! This crate provides:
//! - A metadata-driven call registry (encode and decode runtime calls)
//! - Signable payload construction from intents or wallet payloads
//! - Ed25519, Sr25519 and ECDSA signing and verification
//! - Signed extrinsic assembly
//! - On native targets, JSON-RPC metadata fetching, submission and status
//!   tracking
//!
//! # Architecture
//!
//! The crate follows a two-layer architecture:
//! - **Core layer** (`src/*.rs`): Pure Rust logic, no WASM dependencies
//! - **WASM layer** (`src/wasm/*.rs`): Thin wrappers with `#[wasm_bindgen]`
//!
//! The network-facing modules (`rpc`, `metadata`, `submitter`, `pipeline`)
//! are only compiled for native targets.

pub mod address;
pub mod builder;
pub mod call;
pub mod codec;
pub mod config;
pub mod error;
pub mod extrinsic;
pub mod payload;
pub mod registry;
pub mod signer;
pub mod types;
pub mod wasm;

#[cfg(not(target_arch = "wasm32"))]
pub mod metadata;
#[cfg(not(target_arch = "wasm32"))]
pub mod pipeline;
#[cfg(not(target_arch = "wasm32"))]
pub mod rpc;
#[cfg(not(target_arch = "wasm32"))]
pub mod submitter;

#[cfg(test)]
mod test_utils;

// Re-export main types for convenience
pub use address::{decode_ss58, encode_ss58, validate_address, AccountId, Sender};
pub use builder::{build_payload, build_raw, BuildContext, TransactionIntent};
pub use call::Call;
pub use config::{RpcConfig, WatchConfig};
pub use error::{ErrorKind, PayloadKind, Stage, TxError, WasmPolyxError};
pub use extrinsic::{assemble, SignedExtrinsic};
pub use payload::{RawBytes, SignablePayload, StructuredPayload};
pub use registry::{build_registry, Registry};
pub use signer::{sign, verify, KeyPair, Keyring, Signature};
pub use types::{ChainMetadata, Era, KeyType, Material, RuntimeVersion, Validity};

#[cfg(not(target_arch = "wasm32"))]
pub use pipeline::{Pipeline, TxOptions};
#[cfg(not(target_arch = "wasm32"))]
pub use submitter::{Submitter, TxHash, TxStatus};
