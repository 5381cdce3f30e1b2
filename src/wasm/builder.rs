//! WASM bindings for payload construction and assembly
//!
//! BuilderNamespace provides static methods that turn intents and wallet
//! payloads into [`WasmPayload`]s, and signed payloads into extrinsics.

use crate::builder::{self, BuildContext, TransactionIntent};
use crate::extrinsic::assemble;
use crate::payload::{SignablePayload, SignerPayloadJson, SignerPayloadRaw};
use crate::signer::Signature;
use crate::wasm::extrinsic::WasmExtrinsic;
use crate::wasm::payload::WasmPayload;
use crate::wasm::registry::WasmRegistry;
use crate::wasm::{from_js, parse_key_type};
use crate::WasmPolyxError;
use wasm_bindgen::prelude::*;

/// Namespace for building operations
#[wasm_bindgen]
pub struct BuilderNamespace;

#[wasm_bindgen]
impl BuilderNamespace {
    /// Build a signable payload from a business-level intent
    ///
    /// # Arguments
    /// * `intent` - `{ type: "transfer", to, amount, memo? }`, `{ type: "remark", message }`
    ///   or `{ type: "batch", calls: [...] }`
    /// * `context` - Sender, nonce, tip, chain material, validity and reference block
    /// * `registry` - Registry for the runtime named by `context.material`
    #[wasm_bindgen(js_name = buildPayload)]
    pub fn build_payload(
        intent: JsValue,
        context: JsValue,
        registry: &WasmRegistry,
    ) -> Result<WasmPayload, JsValue> {
        let intent: TransactionIntent = from_js(intent, "intent")?;
        let context: BuildContext = from_js(context, "context")?;
        let payload = builder::build_payload(&intent, &context, registry.inner())?;
        Ok(WasmPayload::from_inner(payload.into()))
    }

    /// Wrap arbitrary message bytes for signing
    #[wasm_bindgen(js_name = buildRaw)]
    pub fn build_raw(context: JsValue, data: &[u8]) -> Result<WasmPayload, JsValue> {
        let context: BuildContext = from_js(context, "context")?;
        let raw = builder::build_raw(&context, data)?;
        Ok(WasmPayload::from_inner(raw.into()))
    }

    /// Import a polkadot.js `SignerPayloadJSON`
    ///
    /// The payload is checked against `registry` before it is accepted.
    #[wasm_bindgen(js_name = fromSignerPayload)]
    pub fn from_signer_payload(
        payload: JsValue,
        key_type: Option<String>,
        registry: &WasmRegistry,
    ) -> Result<WasmPayload, JsValue> {
        let json: SignerPayloadJson = from_js(payload, "signer payload")?;
        let structured = json.to_structured(parse_key_type(key_type)?)?;
        registry.inner().encode_payload(&structured)?;
        Ok(WasmPayload::from_inner(structured.into()))
    }

    /// Import a polkadot.js `SignerPayloadRaw`
    #[wasm_bindgen(js_name = fromSignerPayloadRaw)]
    pub fn from_signer_payload_raw(
        payload: JsValue,
        key_type: Option<String>,
        registry: &WasmRegistry,
    ) -> Result<WasmPayload, JsValue> {
        let raw: SignerPayloadRaw = from_js(payload, "raw signer payload")?;
        let payload = registry
            .inner()
            .parse_raw_payload(&raw, parse_key_type(key_type)?)?;
        Ok(WasmPayload::from_inner(payload))
    }

    /// Combine a structured payload and its wire signature into an extrinsic
    ///
    /// The signature is verified against the payload sender before assembly.
    #[wasm_bindgen]
    pub fn assemble(
        payload: &WasmPayload,
        signature: &[u8],
        registry: &WasmRegistry,
    ) -> Result<WasmExtrinsic, JsValue> {
        let SignablePayload::Structured(structured) = payload.inner() else {
            return Err(WasmPolyxError::InvalidInput(
                "Raw payloads cannot be assembled into an extrinsic".to_string(),
            )
            .into());
        };
        let signature = Signature::from_wire(signature)?;
        let extrinsic = assemble(structured, &signature, registry.inner())?;
        Ok(WasmExtrinsic::from_inner(extrinsic))
    }
}
