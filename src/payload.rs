//! Signable payload representations
//!
//! A transaction is signed through exactly one of two representations:
//! - [`StructuredPayload`]: call plus the chain-state snapshot (era, nonce, tip,
//!   versions and hashes) the signature commits to
//! - [`RawBytes`]: arbitrary bytes, signed as given
//!
//! The polkadot.js signer formats (`SignerPayloadJSON` and `SignerPayloadRaw`)
//! are parsed here as well.

use crate::address::{AccountId, Sender};
use crate::codec::{
    blake2_256, decode_compact, decode_era, encode_compact_to, encode_era_to, parse_hex,
    parse_hex_hash, take, take_hash, take_u32,
};
use crate::error::{PayloadKind, WasmPolyxError};
use crate::types::{Era, KeyType, MAX_UNHASHED_PAYLOAD_LEN};
use serde::{Deserialize, Serialize};

/// The representation handed to the signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignablePayload {
    Structured(StructuredPayload),
    Raw(RawBytes),
}

impl SignablePayload {
    pub fn sender(&self) -> &Sender {
        match self {
            SignablePayload::Structured(p) => &p.sender,
            SignablePayload::Raw(r) => &r.sender,
        }
    }

    pub fn kind(&self) -> PayloadKind {
        match self {
            SignablePayload::Structured(_) => PayloadKind::Structured,
            SignablePayload::Raw(_) => PayloadKind::Raw,
        }
    }

    /// The exact bytes passed to the signing algorithm
    pub fn signing_bytes(&self) -> Vec<u8> {
        match self {
            SignablePayload::Structured(p) => p.signing_bytes(),
            SignablePayload::Raw(r) => r.data.clone(),
        }
    }
}

impl From<StructuredPayload> for SignablePayload {
    fn from(payload: StructuredPayload) -> Self {
        SignablePayload::Structured(payload)
    }
}

impl From<RawBytes> for SignablePayload {
    fn from(raw: RawBytes) -> Self {
        SignablePayload::Raw(raw)
    }
}

/// Call plus the chain-state snapshot a transaction signature commits to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuredPayload {
    pub sender: Sender,
    /// SCALE-encoded call, without a length prefix
    pub call_data: Vec<u8>,
    pub spec_version: u32,
    pub transaction_version: u32,
    pub genesis_hash: [u8; 32],
    /// Equal to `genesis_hash` for an immortal era
    pub block_hash: [u8; 32],
    pub era: Era,
    pub nonce: u32,
    pub tip: u128,
}

impl StructuredPayload {
    /// Canonical signable form:
    /// `compact(len) ++ call ++ era ++ compact(nonce) ++ compact(tip) ++
    /// spec_version ++ transaction_version ++ genesis_hash ++ block_hash`
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.call_data.len() + 96);
        encode_compact_to(self.call_data.len() as u32, &mut out);
        out.extend_from_slice(&self.call_data);
        self.encode_tail_to(&mut out);
        out
    }

    /// Same as [`encode`](Self::encode) but with the call written bare, the
    /// layout polkadot.js hands out as a raw `"payload"`
    pub fn encode_unprefixed(&self) -> Vec<u8> {
        let mut out = self.call_data.clone();
        self.encode_tail_to(&mut out);
        out
    }

    fn encode_tail_to(&self, out: &mut Vec<u8>) {
        encode_era_to(&self.era, out);
        encode_compact_to(self.nonce, out);
        encode_compact_to(self.tip, out);
        out.extend_from_slice(&self.spec_version.to_le_bytes());
        out.extend_from_slice(&self.transaction_version.to_le_bytes());
        out.extend_from_slice(&self.genesis_hash);
        out.extend_from_slice(&self.block_hash);
    }

    /// Bytes the signature is computed over: the canonical form, or its
    /// Blake2-256 digest when longer than [`MAX_UNHASHED_PAYLOAD_LEN`]
    pub fn signing_bytes(&self) -> Vec<u8> {
        let canonical = self.encode();
        if canonical.len() > MAX_UNHASHED_PAYLOAD_LEN {
            blake2_256(&canonical).to_vec()
        } else {
            canonical
        }
    }

    /// Parse the canonical (length-prefixed) form
    ///
    /// The call bytes are taken as-is. Checking them against the metadata is
    /// the registry's job.
    pub fn decode(bytes: &[u8], sender: Sender) -> Result<Self, WasmPolyxError> {
        let mut input = bytes;
        let call_len: u32 = decode_compact(&mut input)?;
        let call_data = take(&mut input, call_len as usize, "call")?.to_vec();
        Self::decode_tail(call_data, &mut input, sender)
    }

    /// Parse everything after the call and check nothing is left over
    pub(crate) fn decode_tail(
        call_data: Vec<u8>,
        input: &mut &[u8],
        sender: Sender,
    ) -> Result<Self, WasmPolyxError> {
        let era = decode_era(input)?;
        let nonce: u32 = decode_compact(input)?;
        let tip: u128 = decode_compact(input)?;
        let spec_version = take_u32(input, "spec version")?;
        let transaction_version = take_u32(input, "transaction version")?;
        let genesis_hash = take_hash(input, "genesis hash")?;
        let block_hash = take_hash(input, "block hash")?;
        if !input.is_empty() {
            return Err(WasmPolyxError::ScaleDecodeError(format!(
                "{} trailing bytes after payload",
                input.len()
            )));
        }
        Ok(StructuredPayload {
            sender,
            call_data,
            spec_version,
            transaction_version,
            genesis_hash,
            block_hash,
            era,
            nonce,
            tip,
        })
    }

    /// An immortal era must reference the genesis block
    pub fn check_block_hash(&self) -> Result<(), WasmPolyxError> {
        if self.era.is_immortal() && self.block_hash != self.genesis_hash {
            return Err(WasmPolyxError::InvalidTransaction(
                "Immortal era requires block hash to equal genesis hash".to_string(),
            ));
        }
        if !self.era.is_valid() {
            return Err(WasmPolyxError::InvalidTransaction(format!(
                "Era {:?} is not representable",
                self.era
            )));
        }
        Ok(())
    }
}

/// Arbitrary bytes signed for an account, with no chain-state dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBytes {
    pub sender: Sender,
    pub data: Vec<u8>,
}

impl RawBytes {
    pub fn new(sender: Sender, data: impl Into<Vec<u8>>) -> Self {
        RawBytes {
            sender,
            data: data.into(),
        }
    }
}

/// polkadot.js `SignerPayloadJSON`: every numeric field is a hex string
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerPayloadJson {
    pub address: String,
    pub block_hash: String,
    #[serde(default)]
    pub block_number: String,
    pub era: String,
    pub genesis_hash: String,
    /// Bare call hex
    pub method: String,
    pub nonce: String,
    pub spec_version: String,
    #[serde(default)]
    pub tip: String,
    pub transaction_version: String,
    #[serde(default)]
    pub signed_extensions: Vec<String>,
    #[serde(default = "default_payload_version")]
    pub version: u32,
}

fn default_payload_version() -> u32 {
    4
}

impl SignerPayloadJson {
    /// Convert to a structured payload. `key_type` is the sender's declared
    /// key type when the caller knows it.
    pub fn to_structured(
        &self,
        key_type: Option<KeyType>,
    ) -> Result<StructuredPayload, WasmPolyxError> {
        let account_id: AccountId = self.address.parse()?;
        let era_bytes = parse_hex(&self.era)?;
        let era = decode_era(&mut &era_bytes[..])?;
        Ok(StructuredPayload {
            sender: Sender {
                account_id,
                key_type,
            },
            call_data: parse_hex(&self.method)?,
            spec_version: parse_hex_u32(&self.spec_version, "specVersion")?,
            transaction_version: parse_hex_u32(&self.transaction_version, "transactionVersion")?,
            genesis_hash: parse_hex_hash(&self.genesis_hash)?,
            block_hash: parse_hex_hash(&self.block_hash)?,
            era,
            nonce: parse_hex_u32(&self.nonce, "nonce")?,
            tip: parse_hex_uint(&self.tip, "tip")?,
        })
    }
}

/// `type` field of a polkadot.js raw payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RawPayloadType {
    /// Arbitrary message bytes
    Bytes,
    /// Unprefixed extrinsic payload
    Payload,
}

/// polkadot.js `SignerPayloadRaw`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerPayloadRaw {
    pub address: String,
    pub data: String,
    #[serde(rename = "type")]
    pub payload_type: RawPayloadType,
}

impl SignerPayloadRaw {
    pub fn sender(&self, key_type: Option<KeyType>) -> Result<Sender, WasmPolyxError> {
        Ok(Sender {
            account_id: self.address.parse()?,
            key_type,
        })
    }

    pub fn data_bytes(&self) -> Result<Vec<u8>, WasmPolyxError> {
        parse_hex(&self.data)
    }
}

fn parse_hex_uint(value: &str, field: &str) -> Result<u128, WasmPolyxError> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| WasmPolyxError::InvalidInput(format!("Invalid {}: {}", field, e)))
}

fn parse_hex_u32(value: &str, field: &str) -> Result<u32, WasmPolyxError> {
    u32::try_from(parse_hex_uint(value, field)?)
        .map_err(|_| WasmPolyxError::InvalidInput(format!("{} does not fit in u32", field)))
}
