//! Rust to JavaScript value conversion
//!
//! Balances are u128, so wide integers become `BigInt` rather than lossy
//! numbers. Byte strings become 0x-prefixed hex.

use wasm_bindgen::prelude::*;

/// A value could not be represented in JavaScript
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ToJsError(String);

impl ToJsError {
    pub fn new(msg: impl Into<String>) -> Self {
        ToJsError(msg.into())
    }
}

impl From<ToJsError> for JsValue {
    fn from(err: ToJsError) -> Self {
        js_sys::Error::new(&err.0).into()
    }
}

pub trait TryIntoJsValue {
    fn try_to_js_value(&self) -> Result<JsValue, ToJsError>;
}

impl TryIntoJsValue for String {
    fn try_to_js_value(&self) -> Result<JsValue, ToJsError> {
        Ok(JsValue::from_str(self))
    }
}

impl TryIntoJsValue for bool {
    fn try_to_js_value(&self) -> Result<JsValue, ToJsError> {
        Ok(JsValue::from_bool(*self))
    }
}

impl TryIntoJsValue for u32 {
    fn try_to_js_value(&self) -> Result<JsValue, ToJsError> {
        Ok(JsValue::from_f64(f64::from(*self)))
    }
}

impl TryIntoJsValue for u128 {
    fn try_to_js_value(&self) -> Result<JsValue, ToJsError> {
        Ok(js_sys::BigInt::from(*self).into())
    }
}

impl TryIntoJsValue for Vec<u8> {
    fn try_to_js_value(&self) -> Result<JsValue, ToJsError> {
        Ok(JsValue::from_str(&crate::codec::to_hex(self)))
    }
}

impl TryIntoJsValue for JsValue {
    fn try_to_js_value(&self) -> Result<JsValue, ToJsError> {
        Ok(self.clone())
    }
}

impl<T: TryIntoJsValue> TryIntoJsValue for Option<T> {
    fn try_to_js_value(&self) -> Result<JsValue, ToJsError> {
        match self {
            Some(v) => v.try_to_js_value(),
            None => Ok(JsValue::undefined()),
        }
    }
}

impl TryIntoJsValue for crate::types::Era {
    fn try_to_js_value(&self) -> Result<JsValue, ToJsError> {
        serde_wasm_bindgen::to_value(self)
            .map_err(|e| ToJsError::new(format!("Era conversion error: {}", e)))
    }
}

/// Build a plain JavaScript object from `key => value` pairs
#[macro_export]
macro_rules! js_obj {
    ( $( $key:expr => $value:expr ),* $(,)? ) => {{
        use $crate::wasm::try_into_js_value::{TryIntoJsValue, ToJsError};
        let obj = js_sys::Object::new();
        $(
            js_sys::Reflect::set(
                &obj,
                &wasm_bindgen::JsValue::from_str($key),
                &TryIntoJsValue::try_to_js_value(&$value)?
            ).map_err(|_| ToJsError::new(format!("Failed to set property: {}", $key)))?;
        )*
        Ok::<wasm_bindgen::JsValue, ToJsError>(obj.into())
    }};
}
