//! Intent types for payload building
//!
//! buildPayload(intent, context)
//! - intent: what to do (transfer, remark, batch)
//! - context: how to build it (sender, nonce, material, validity)

use crate::address::{AccountId, Sender};
use crate::error::WasmPolyxError;
use crate::types::{KeyType, Material, Validity};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Balances arrive from JS as numbers or decimal strings; u128 does not fit
/// in a JSON number
#[derive(Deserialize)]
#[serde(untagged)]
enum BalanceRepr {
    Number(u64),
    Text(String),
    Missing,
}

impl BalanceRepr {
    fn into_u128<E: de::Error>(self, empty_is_zero: bool) -> Result<u128, E> {
        match self {
            BalanceRepr::Number(n) => Ok(u128::from(n)),
            BalanceRepr::Text(s) if s.is_empty() && empty_is_zero => Ok(0),
            BalanceRepr::Text(s) => s
                .parse()
                .map_err(|e| E::custom(format!("invalid balance {:?}: {}", s, e))),
            BalanceRepr::Missing if empty_is_zero => Ok(0),
            BalanceRepr::Missing => Err(E::custom("balance is required")),
        }
    }
}

fn deserialize_u128<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: Deserializer<'de>,
{
    BalanceRepr::deserialize(deserializer)?.into_u128(false)
}

fn deserialize_u128_optional<'de, D>(deserializer: D) -> Result<u128, D::Error>
where
    D: Deserializer<'de>,
{
    BalanceRepr::deserialize(deserializer)?.into_u128(true)
}

/// Transaction intent - what to do
///
/// Single operation. For multiple operations use `Batch`, which is built as
/// `Utility::batch_all` and executes atomically.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TransactionIntent {
    /// Transfer POLYX to a recipient
    Transfer {
        /// Recipient address (SS58)
        to: String,
        /// Amount in the chain's smallest unit
        #[serde(deserialize_with = "deserialize_u128")]
        amount: u128,
        /// Optional memo, up to 32 bytes. Selects `transfer_with_memo`.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        memo: Option<String>,
    },
    /// Put a message on chain with `System::remark`
    Remark {
        message: String,
    },
    /// Batch multiple intents atomically
    Batch {
        calls: Vec<TransactionIntent>,
    },
}

/// Build context - how to build the payload
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildContext {
    /// Sender address (SS58 or 0x-prefixed account id)
    pub sender: String,
    /// Declared key type of the sender, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_type: Option<KeyType>,
    /// Account nonce, assigned by the caller
    pub nonce: u32,
    /// Optional tip amount
    #[serde(default, deserialize_with = "deserialize_u128_optional")]
    pub tip: u128,
    /// Chain material
    pub material: Material,
    /// Validity window
    #[serde(default)]
    pub validity: Validity,
    /// Reference block hash for mortality
    pub reference_block: String,
}

impl BuildContext {
    /// Resolve the sender (SS58 or 0x-hex account id) and its declared key type
    pub fn sender(&self) -> Result<Sender, WasmPolyxError> {
        let account_id: AccountId = self.sender.parse()?;
        Ok(Sender {
            account_id,
            key_type: self.key_type,
        })
    }
}
