//! SS58 address encoding and decoding for Polymesh/Substrate chains
//!
//! Uses the official bs58 crate for base58 encoding, matching the Substrate ecosystem.
//! See: https://docs.substrate.io/reference/address-formats/

use crate::error::WasmPolyxError;
use crate::types::{AddressFormat, KeyType};
use blake2::{Blake2b512, Digest};
use core::fmt;
use core::str::FromStr;

/// SS58 prefix for checksum calculation
const SS58_PREFIX: &[u8] = b"SS58PRE";

/// 32-byte account identifier
///
/// For Ed25519 and Sr25519 keys this is the public key. For ECDSA keys it is
/// the Blake2-256 hash of the compressed public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Encode as an SS58 address with the given network prefix
    pub fn to_ss58(&self, prefix: u16) -> String {
        // A 32-byte key and a prefix below 16384 are always encodable
        encode_ss58(&self.0, prefix & 0x3fff).unwrap_or_default()
    }

    /// Decode from an SS58 address, ignoring the network prefix
    pub fn from_ss58(address: &str) -> Result<Self, WasmPolyxError> {
        let (pubkey, _) = decode_ss58(address)?;
        Self::from_slice(&pubkey)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, WasmPolyxError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| {
            WasmPolyxError::InvalidAddress(format!(
                "Account id must be 32 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(AccountId(arr))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self)
    }
}

/// Accepts either an SS58 address or a 0x-prefixed 32-byte hex string
impl FromStr for AccountId {
    type Err = WasmPolyxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.strip_prefix("0x") {
            Some(hex_str) => {
                let bytes = hex::decode(hex_str)?;
                AccountId::from_slice(&bytes)
            }
            None => AccountId::from_ss58(s),
        }
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        AccountId(bytes)
    }
}

/// The account a payload is signed for, with its declared key type when known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sender {
    pub account_id: AccountId,
    /// Key type the account is registered with. `None` when the producer of
    /// the payload did not say (e.g. a polkadot.js JSON payload).
    pub key_type: Option<KeyType>,
}

impl Sender {
    pub fn new(account_id: AccountId) -> Self {
        Sender {
            account_id,
            key_type: None,
        }
    }

    pub fn with_key_type(account_id: AccountId, key_type: KeyType) -> Self {
        Sender {
            account_id,
            key_type: Some(key_type),
        }
    }
}

/// Encode a public key to SS58 address format
///
/// # Arguments
/// * `public_key` - 32-byte account id
/// * `prefix` - Network prefix (12 for Polymesh, 42 for generic Substrate)
pub fn encode_ss58(public_key: &[u8], prefix: u16) -> Result<String, WasmPolyxError> {
    if public_key.len() != 32 {
        return Err(WasmPolyxError::InvalidAddress(format!(
            "Public key must be 32 bytes, got {}",
            public_key.len()
        )));
    }

    // Build payload: prefix + public key
    let mut payload = encode_prefix(prefix)?;
    payload.extend_from_slice(public_key);

    // Calculate checksum (first 2 bytes of Blake2b-512 hash)
    let checksum = ss58_checksum(&payload);
    payload.extend_from_slice(&checksum[..2]);

    Ok(bs58::encode(&payload).into_string())
}

/// Decode an SS58 address to public key and prefix
pub fn decode_ss58(address: &str) -> Result<(Vec<u8>, u16), WasmPolyxError> {
    let decoded = bs58::decode(address)
        .into_vec()
        .map_err(|e| WasmPolyxError::InvalidAddress(format!("Invalid base58: {}", e)))?;

    if decoded.len() < 35 {
        return Err(WasmPolyxError::InvalidAddress(
            "Address too short".to_string(),
        ));
    }

    let (prefix, prefix_len) = decode_prefix(&decoded)?;

    let checksum_start = decoded.len() - 2;
    let public_key = &decoded[prefix_len..checksum_start];
    let checksum = &decoded[checksum_start..];

    if public_key.len() != 32 {
        return Err(WasmPolyxError::InvalidAddress(format!(
            "Invalid public key length: {}",
            public_key.len()
        )));
    }

    let payload = &decoded[..checksum_start];
    let expected_checksum = ss58_checksum(payload);

    if checksum != &expected_checksum[..2] {
        return Err(WasmPolyxError::InvalidAddress(
            "Invalid checksum".to_string(),
        ));
    }

    Ok((public_key.to_vec(), prefix))
}

/// Validate an SS58 address
pub fn validate_address(address: &str, expected_prefix: Option<u16>) -> bool {
    match decode_ss58(address) {
        Ok((_, prefix)) => expected_prefix.map_or(true, |expected| prefix == expected),
        Err(_) => false,
    }
}

/// Encode SS58 prefix (supports single and two-byte prefixes)
fn encode_prefix(prefix: u16) -> Result<Vec<u8>, WasmPolyxError> {
    if prefix < 64 {
        Ok(vec![prefix as u8])
    } else if prefix < 16384 {
        // Two-byte SS58 prefix encoding
        let first = ((prefix & 0b0000_0000_1111_1100) as u8) >> 2 | 0b0100_0000;
        let second = ((prefix >> 8) as u8) | ((prefix & 0b0000_0000_0000_0011) as u8) << 6;
        Ok(vec![first, second])
    } else {
        Err(WasmPolyxError::InvalidAddress(format!(
            "Invalid prefix: {}",
            prefix
        )))
    }
}

/// Decode SS58 prefix from raw bytes
fn decode_prefix(data: &[u8]) -> Result<(u16, usize), WasmPolyxError> {
    if data[0] < 64 {
        Ok((data[0] as u16, 1))
    } else if data[0] < 128 {
        if data.len() < 2 {
            return Err(WasmPolyxError::InvalidAddress(
                "Address too short for two-byte prefix".to_string(),
            ));
        }
        let lower = (data[0] & 0b0011_1111) << 2 | (data[1] >> 6);
        let upper = data[1] & 0b0011_1111;
        Ok((((upper as u16) << 8) | (lower as u16), 2))
    } else {
        Err(WasmPolyxError::InvalidAddress(format!(
            "Invalid prefix byte: {}",
            data[0]
        )))
    }
}

/// Calculate SS58 checksum (Blake2b-512 of "SS58PRE" || payload)
fn ss58_checksum(payload: &[u8]) -> [u8; 64] {
    let mut hasher = Blake2b512::new();
    hasher.update(SS58_PREFIX);
    hasher.update(payload);
    let result = hasher.finalize();
    let mut checksum = [0u8; 64];
    checksum.copy_from_slice(&result);
    checksum
}
