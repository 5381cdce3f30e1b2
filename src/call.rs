//! Runtime calls as dynamic values
//!
//! A [`Call`] names a pallet and a call and carries its arguments as
//! `scale_value` values. The registry encodes it against the chain metadata and
//! decodes call bytes back into the same shape, so a call built here compares
//! equal to the result of decoding its own encoding.

use crate::address::AccountId;
use crate::error::WasmPolyxError;
use subxt_core::ext::scale_value::{Composite, Value};

/// Maximum memo length accepted by `Balances::transfer_with_memo`
pub const MEMO_LEN: usize = 32;

/// A runtime call: pallet, call name and arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub pallet: String,
    pub name: String,
    pub fields: Composite<()>,
}

impl Call {
    pub fn new(pallet: impl Into<String>, name: impl Into<String>, fields: Composite<()>) -> Self {
        Call {
            pallet: pallet.into(),
            name: name.into(),
            fields,
        }
    }

    /// `Balances::transfer(dest, value)`
    pub fn transfer(dest: &AccountId, value: u128) -> Self {
        Call::new(
            "Balances",
            "transfer",
            named([("dest", multi_address(dest)), ("value", Value::u128(value))]),
        )
    }

    /// `Balances::transfer_with_memo(dest, value, memo)`
    pub fn transfer_with_memo(
        dest: &AccountId,
        value: u128,
        memo: Option<&str>,
    ) -> Result<Self, WasmPolyxError> {
        let memo_value = match memo {
            Some(text) => Value::unnamed_variant("Some", [memo_bytes(text)?]),
            None => Value::unnamed_variant("None", []),
        };
        Ok(Call::new(
            "Balances",
            "transfer_with_memo",
            named([
                ("dest", multi_address(dest)),
                ("value", Value::u128(value)),
                ("memo", memo_value),
            ]),
        ))
    }

    /// `System::remark(remark)`
    pub fn remark(message: &[u8]) -> Self {
        Call::new("System", "remark", named([("remark", Value::from_bytes(message))]))
    }

    /// Look up a named argument
    pub fn field(&self, name: &str) -> Option<&Value<()>> {
        match &self.fields {
            Composite::Named(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            Composite::Unnamed(_) => None,
        }
    }
}

/// Build a named composite from key-value pairs
pub fn named<const N: usize>(fields: [(&str, Value<()>); N]) -> Composite<()> {
    Composite::Named(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

/// `MultiAddress::Id(account)`
pub fn multi_address(account: &AccountId) -> Value<()> {
    Value::unnamed_variant("Id", [account_id(account)])
}

/// `AccountId32([u8; 32])`, shaped the way it decodes from metadata
pub fn account_id(account: &AccountId) -> Value<()> {
    Value::unnamed_composite([Value::from_bytes(account.as_bytes())])
}

/// `Memo([u8; 32])`, zero padded
fn memo_bytes(text: &str) -> Result<Value<()>, WasmPolyxError> {
    let bytes = text.as_bytes();
    if bytes.len() > MEMO_LEN {
        return Err(WasmPolyxError::InvalidInput(format!(
            "Memo must be at most {} bytes, got {}",
            MEMO_LEN,
            bytes.len()
        )));
    }
    let mut padded = [0u8; MEMO_LEN];
    padded[..bytes.len()].copy_from_slice(bytes);
    Ok(Value::unnamed_composite([Value::from_bytes(padded)]))
}
