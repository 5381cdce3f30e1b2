//! WASM bindings for signable payloads

use crate::codec::to_hex;
use crate::payload::SignablePayload;
use crate::signer::{verify, Signature};
use crate::types::AddressFormat;
use wasm_bindgen::prelude::*;

/// A payload ready to be signed: either a structured transaction payload or
/// raw message bytes
#[wasm_bindgen]
pub struct WasmPayload {
    inner: SignablePayload,
}

impl WasmPayload {
    pub(crate) fn from_inner(inner: SignablePayload) -> Self {
        WasmPayload { inner }
    }

    pub(crate) fn inner(&self) -> &SignablePayload {
        &self.inner
    }
}

#[wasm_bindgen]
impl WasmPayload {
    /// "structured" or "raw"
    #[wasm_bindgen(getter)]
    pub fn kind(&self) -> String {
        self.inner.kind().to_string()
    }

    /// SS58 address of the sender
    ///
    /// # Arguments
    /// * `prefix` - SS58 prefix, defaults to 12 (Polymesh)
    #[wasm_bindgen]
    pub fn sender(&self, prefix: Option<u16>) -> String {
        self.inner
            .sender()
            .account_id
            .to_ss58(prefix.unwrap_or(AddressFormat::Polymesh.prefix()))
    }

    /// The exact bytes a signer must sign. Structured payloads longer than
    /// 256 bytes are already hashed.
    #[wasm_bindgen(js_name = signingBytes)]
    pub fn signing_bytes(&self) -> Vec<u8> {
        self.inner.signing_bytes()
    }

    #[wasm_bindgen(js_name = signingBytesHex)]
    pub fn signing_bytes_hex(&self) -> String {
        to_hex(&self.inner.signing_bytes())
    }

    /// Canonical encoding of a structured payload; `undefined` for raw bytes
    #[wasm_bindgen(js_name = encodedHex)]
    pub fn encoded_hex(&self) -> Option<String> {
        match &self.inner {
            SignablePayload::Structured(payload) => Some(to_hex(&payload.encode())),
            SignablePayload::Raw(_) => None,
        }
    }

    /// Check a wire signature (discriminator byte plus raw signature)
    #[wasm_bindgen]
    pub fn verify(&self, signature: &[u8]) -> Result<bool, JsValue> {
        let signature = Signature::from_wire(signature)?;
        Ok(verify(&self.inner, &signature))
    }
}
