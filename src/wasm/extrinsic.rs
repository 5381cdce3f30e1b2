//! WASM bindings for signed extrinsics

use crate::codec::to_hex;
use crate::extrinsic::SignedExtrinsic;
use crate::types::AddressFormat;
use crate::wasm::registry::WasmRegistry;
use wasm_bindgen::prelude::*;

/// A signed extrinsic, ready for `author_submitExtrinsic`
#[wasm_bindgen]
pub struct WasmExtrinsic {
    inner: SignedExtrinsic,
}

impl WasmExtrinsic {
    pub(crate) fn from_inner(inner: SignedExtrinsic) -> Self {
        WasmExtrinsic { inner }
    }
}

#[wasm_bindgen]
impl WasmExtrinsic {
    /// Decode a signed extrinsic from its length-prefixed hex form
    #[wasm_bindgen(js_name = fromHex)]
    pub fn from_hex(hex: &str) -> Result<WasmExtrinsic, JsValue> {
        Ok(WasmExtrinsic {
            inner: SignedExtrinsic::from_hex(hex)?,
        })
    }

    #[wasm_bindgen(js_name = fromBytes)]
    pub fn from_bytes(bytes: &[u8]) -> Result<WasmExtrinsic, JsValue> {
        Ok(WasmExtrinsic {
            inner: SignedExtrinsic::decode(bytes)?,
        })
    }

    #[wasm_bindgen(js_name = toBytes)]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.inner.encode()
    }

    #[wasm_bindgen(js_name = toHex)]
    pub fn to_hex(&self) -> String {
        self.inner.to_hex()
    }

    /// Blake2-256 of the encoded extrinsic, as the node reports it
    #[wasm_bindgen(getter)]
    pub fn hash(&self) -> String {
        to_hex(&self.inner.hash())
    }

    #[wasm_bindgen]
    pub fn sender(&self, prefix: Option<u16>) -> String {
        self.inner
            .sender
            .to_ss58(prefix.unwrap_or(AddressFormat::Polymesh.prefix()))
    }

    #[wasm_bindgen(getter)]
    pub fn nonce(&self) -> u32 {
        self.inner.nonce
    }

    #[wasm_bindgen(getter)]
    pub fn tip(&self) -> js_sys::BigInt {
        js_sys::BigInt::from(self.inner.tip)
    }

    /// Wire signature (discriminator byte first)
    #[wasm_bindgen(getter)]
    pub fn signature(&self) -> Vec<u8> {
        self.inner.signature.to_wire()
    }

    #[wasm_bindgen(getter, js_name = callData)]
    pub fn call_data(&self) -> Vec<u8> {
        self.inner.call.clone()
    }

    /// Summary object with the call left as bytes
    #[wasm_bindgen(js_name = toJSON)]
    pub fn to_json(&self) -> Result<JsValue, JsValue> {
        self.summary(None)
    }

    /// Summary object with the call decoded against `registry`
    #[wasm_bindgen]
    pub fn decode(&self, registry: &WasmRegistry) -> Result<JsValue, JsValue> {
        let call = registry.decode_call(&self.inner.call)?;
        self.summary(Some(call))
    }
}

impl WasmExtrinsic {
    fn summary(&self, call: Option<JsValue>) -> Result<JsValue, JsValue> {
        let obj = crate::js_obj!(
            "hash" => self.hash(),
            "sender" => self.sender(None),
            "keyType" => self.inner.signature.algorithm.to_string(),
            "signature" => self.inner.signature.to_wire(),
            "era" => self.inner.era,
            "nonce" => self.inner.nonce,
            "tip" => self.inner.tip,
            "callData" => self.inner.call.clone(),
            "call" => call,
        )?;
        Ok(obj)
    }
}
