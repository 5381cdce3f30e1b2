//! WASM bindings for the metadata registry

use crate::registry::Registry;
use crate::types::ChainMetadata;
use subxt_core::ext::scale_value::{Value, ValueDef};
use wasm_bindgen::prelude::*;

/// Call schema for one runtime version, built from its metadata
#[wasm_bindgen]
pub struct WasmRegistry {
    inner: Registry,
}

impl WasmRegistry {
    pub(crate) fn inner(&self) -> &Registry {
        &self.inner
    }
}

#[wasm_bindgen]
impl WasmRegistry {
    /// Build a registry from `state_getMetadata` output
    ///
    /// # Arguments
    /// * `metadata_hex` - Hex-encoded metadata blob (with the "meta" magic)
    /// * `spec_version` - Runtime spec version the metadata belongs to
    #[wasm_bindgen(constructor)]
    pub fn new(metadata_hex: &str, spec_version: u32) -> Result<WasmRegistry, JsValue> {
        let metadata = ChainMetadata::from_hex(metadata_hex, spec_version)?;
        Ok(WasmRegistry {
            inner: Registry::new(&metadata)?,
        })
    }

    #[wasm_bindgen(getter, js_name = specVersion)]
    pub fn spec_version(&self) -> u32 {
        self.inner.spec_version()
    }

    /// Pallet and call index as a two-byte array
    #[wasm_bindgen(js_name = callIndex)]
    pub fn call_index(&self, pallet: &str, call: &str) -> Result<Vec<u8>, JsValue> {
        let (pallet_index, call_index) = self.inner.call_index(pallet, call)?;
        Ok(vec![pallet_index, call_index])
    }

    /// Decode call bytes into `{ pallet, call, args }`
    #[wasm_bindgen(js_name = decodeCall)]
    pub fn decode_call(&self, call_data: &[u8]) -> Result<JsValue, JsValue> {
        let call = self.inner.decode_call(call_data)?;
        let args = Value {
            value: ValueDef::Composite(call.fields),
            context: (),
        }
        .to_string();
        let obj = crate::js_obj!(
            "pallet" => call.pallet,
            "call" => call.name,
            "args" => args,
        )?;
        Ok(obj)
    }
}
