//! Shared types for Polymesh transactions

use crate::error::WasmPolyxError;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Canonical payloads longer than this are signed as their Blake2-256 digest
pub const MAX_UNHASHED_PAYLOAD_LEN: usize = 256;

/// Wire discriminator byte prefixed to a raw signature, per algorithm
pub const SIGNATURE_DISCRIMINATORS: [(KeyType, u8); 3] = [
    (KeyType::Ed25519, 0x00),
    (KeyType::Sr25519, 0x01),
    (KeyType::Ecdsa, 0x02),
];

/// Extrinsic format version written in the low bits of the version byte
pub const EXTRINSIC_FORMAT_VERSION: u8 = 4;

/// Bit set in the version byte of a signed extrinsic
pub const SIGNED_EXTRINSIC_BIT: u8 = 0x80;

/// Signing algorithm of a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Ed25519,
    Sr25519,
    Ecdsa,
}

impl KeyType {
    /// Discriminator byte used on the wire
    pub fn discriminator(self) -> u8 {
        SIGNATURE_DISCRIMINATORS
            .iter()
            .find(|(key_type, _)| *key_type == self)
            .map(|(_, byte)| *byte)
            .unwrap_or_default()
    }

    /// Resolve the algorithm from a wire discriminator
    pub fn from_discriminator(byte: u8) -> Result<Self, WasmPolyxError> {
        SIGNATURE_DISCRIMINATORS
            .iter()
            .find(|(_, b)| *b == byte)
            .map(|(key_type, _)| *key_type)
            .ok_or_else(|| {
                WasmPolyxError::UnknownKeyType(format!("signature discriminator {:#04x}", byte))
            })
    }

    /// Length of the raw signature this algorithm produces
    pub fn signature_len(self) -> usize {
        match self {
            KeyType::Ed25519 | KeyType::Sr25519 => 64,
            KeyType::Ecdsa => 65,
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyType::Ed25519 => f.write_str("ed25519"),
            KeyType::Sr25519 => f.write_str("sr25519"),
            KeyType::Ecdsa => f.write_str("ecdsa"),
        }
    }
}

impl FromStr for KeyType {
    type Err = WasmPolyxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ed25519" => Ok(KeyType::Ed25519),
            "sr25519" => Ok(KeyType::Sr25519),
            "ecdsa" => Ok(KeyType::Ecdsa),
            other => Err(WasmPolyxError::UnknownKeyType(other.to_string())),
        }
    }
}

/// Versioned chain metadata, as fetched from a node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainMetadata {
    /// SCALE-encoded `RuntimeMetadataPrefixed`
    pub bytes: Vec<u8>,
    /// Runtime spec version the metadata was fetched for
    pub spec_version: u32,
}

impl ChainMetadata {
    pub fn new(bytes: Vec<u8>, spec_version: u32) -> Self {
        ChainMetadata {
            bytes,
            spec_version,
        }
    }

    /// Build from the hex blob returned by `state_getMetadata`
    pub fn from_hex(metadata_hex: &str, spec_version: u32) -> Result<Self, WasmPolyxError> {
        let bytes = hex::decode(metadata_hex.strip_prefix("0x").unwrap_or(metadata_hex))?;
        Ok(ChainMetadata::new(bytes, spec_version))
    }
}

/// Runtime version as reported by `state_getRuntimeVersion`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    pub spec_name: String,
    pub spec_version: u32,
    pub transaction_version: u32,
}

/// Chain material required for building payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    /// Chain genesis hash (e.g., "0x2ace05e703aa50b48c0ccccfc8b424f7aab9a1e2c424ed12e45d20b1e8ffd0d6")
    pub genesis_hash: String,
    /// Chain name (e.g., "Polymesh Testnet")
    pub chain_name: String,
    /// Runtime spec name (e.g., "polymesh_testnet")
    pub spec_name: String,
    /// Runtime spec version
    pub spec_version: u32,
    /// Transaction format version
    pub tx_version: u32,
}

impl Material {
    /// SS58 format for addresses on this chain
    pub fn address_format(&self) -> AddressFormat {
        AddressFormat::from_chain_name(&self.chain_name)
    }
}

/// Validity window for mortal transactions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validity {
    /// Block number when transaction becomes valid
    pub first_valid: u32,
    /// Maximum duration in blocks (0 means immortal)
    #[serde(default = "default_max_duration")]
    pub max_duration: u32,
}

fn default_max_duration() -> u32 {
    64
}

impl Default for Validity {
    fn default() -> Self {
        Self {
            first_valid: 0,
            max_duration: default_max_duration(),
        }
    }
}

/// Transaction era (mortal or immortal)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Era {
    /// Immortal transaction (never expires)
    Immortal,
    /// Mortal transaction with period and phase
    Mortal { period: u64, phase: u64 },
}

impl Era {
    /// Mortal era starting at `current_block`, valid for about `period` blocks.
    ///
    /// The period is rounded up to a power of two in `[4, 65536]` and the phase
    /// is quantized the same way the runtime does it.
    pub fn mortal(period: u64, current_block: u64) -> Self {
        let period = period
            .checked_next_power_of_two()
            .unwrap_or(1 << 16)
            .clamp(4, 1 << 16);
        let phase = current_block % period;
        let quantize_factor = (period >> 12).max(1);
        let quantized_phase = phase / quantize_factor * quantize_factor;
        Era::Mortal {
            period,
            phase: quantized_phase,
        }
    }

    /// Check if this is an immortal era
    pub fn is_immortal(&self) -> bool {
        matches!(self, Era::Immortal)
    }

    /// Whether period and phase are representable on the wire
    pub fn is_valid(&self) -> bool {
        match *self {
            Era::Immortal => true,
            Era::Mortal { period, phase } => {
                period.is_power_of_two()
                    && (4..=(1 << 16)).contains(&period)
                    && phase < period
                    && phase % (period >> 12).max(1) == 0
            }
        }
    }

    /// First block in which a transaction with this era is valid
    pub fn birth(&self, current_block: u64) -> u64 {
        match *self {
            Era::Immortal => 0,
            Era::Mortal { period, phase } => {
                (current_block.max(phase) - phase) / period * period + phase
            }
        }
    }

    /// First block in which a transaction with this era is no longer valid
    pub fn death(&self, current_block: u64) -> u64 {
        match *self {
            Era::Immortal => u64::MAX,
            Era::Mortal { period, .. } => self.birth(current_block) + period,
        }
    }
}

/// SS58 address format prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFormat {
    /// Polymesh mainnet and testnet (prefix 12)
    Polymesh = 12,
    /// Substrate generic (prefix 42, addresses start with '5')
    Substrate = 42,
}

impl AddressFormat {
    /// Get the prefix value
    pub fn prefix(self) -> u16 {
        self as u16
    }

    /// Get format from chain name
    pub fn from_chain_name(name: &str) -> Self {
        if name.to_lowercase().starts_with("polymesh") {
            AddressFormat::Polymesh
        } else {
            AddressFormat::Substrate
        }
    }
}
