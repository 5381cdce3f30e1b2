//! WASM bindings for key pairs

use crate::error::WasmPolyxError;
use crate::signer::{sign, KeyPair};
use crate::types::{AddressFormat, KeyType};
use crate::wasm::payload::WasmPayload;
use wasm_bindgen::prelude::*;

/// A signing key held in WASM memory
#[wasm_bindgen]
pub struct WasmKeyPair {
    inner: KeyPair,
}

#[wasm_bindgen]
impl WasmKeyPair {
    /// Derive a key from a 32-byte seed
    ///
    /// # Arguments
    /// * `key_type` - "ed25519", "sr25519" or "ecdsa"
    /// * `seed` - 32-byte secret seed
    #[wasm_bindgen(js_name = fromSeed)]
    pub fn from_seed(key_type: &str, seed: &[u8]) -> Result<WasmKeyPair, JsValue> {
        let key_type: KeyType = key_type.parse()?;
        let seed: &[u8; 32] = seed.try_into().map_err(|_| {
            WasmPolyxError::InvalidInput(format!("Seed must be 32 bytes, got {}", seed.len()))
        })?;
        Ok(WasmKeyPair {
            inner: KeyPair::from_seed(key_type, seed)?,
        })
    }

    #[wasm_bindgen]
    pub fn generate(key_type: &str) -> Result<WasmKeyPair, JsValue> {
        Ok(WasmKeyPair {
            inner: KeyPair::generate(key_type.parse()?)?,
        })
    }

    #[wasm_bindgen(getter, js_name = keyType)]
    pub fn key_type(&self) -> String {
        self.inner.key_type().to_string()
    }

    /// Public key: 32 bytes, or 33 compressed bytes for ECDSA
    #[wasm_bindgen(getter, js_name = publicKey)]
    pub fn public_key(&self) -> Vec<u8> {
        self.inner.public_key()
    }

    /// SS58 address of the account this key signs for
    #[wasm_bindgen]
    pub fn address(&self, prefix: Option<u16>) -> String {
        self.inner
            .account_id()
            .to_ss58(prefix.unwrap_or(AddressFormat::Polymesh.prefix()))
    }

    /// Sign a payload; returns the wire signature (discriminator byte first)
    #[wasm_bindgen]
    pub fn sign(&self, payload: &WasmPayload) -> Result<Vec<u8>, JsValue> {
        Ok(sign(payload.inner(), &self.inner)?.to_wire())
    }
}
