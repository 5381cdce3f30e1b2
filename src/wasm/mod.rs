//! WASM bindings for wasm-polyx
//!
//! Thin `#[wasm_bindgen]` wrappers that delegate to the offline core. Nothing
//! here touches the network; submission lives in the native-only pipeline.

pub mod builder;
pub mod extrinsic;
pub mod payload;
pub mod registry;
pub mod signer;
pub mod try_into_js_value;

pub use builder::BuilderNamespace;
pub use extrinsic::WasmExtrinsic;
pub use payload::WasmPayload;
pub use registry::WasmRegistry;
pub use signer::WasmKeyPair;

use crate::error::WasmPolyxError;
use crate::types::KeyType;
use wasm_bindgen::JsValue;

/// Parse an optional JS key type name ("ed25519", "sr25519", "ecdsa")
pub(crate) fn parse_key_type(key_type: Option<String>) -> Result<Option<KeyType>, JsValue> {
    key_type
        .map(|name| name.parse::<KeyType>())
        .transpose()
        .map_err(JsValue::from)
}

pub(crate) fn from_js<T: serde::de::DeserializeOwned>(
    value: JsValue,
    what: &str,
) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| WasmPolyxError::InvalidInput(format!("Invalid {}: {}", what, e)).into())
}
