//! Signed extrinsic assembly and parsing
//!
//! Wire layout:
//! `compact(len) ++ 0x84 ++ 0x00 ++ account_id ++ discriminator ++ signature ++
//! era ++ compact(nonce) ++ compact(tip) ++ call`

use crate::address::AccountId;
use crate::codec::{
    blake2_256, decode_compact, decode_era, encode_compact_to, encode_era_to, parse_hex, take,
    take_hash, to_hex,
};
use crate::error::{ErrorKind, PayloadKind, Stage, TxError, WasmPolyxError};
use crate::payload::StructuredPayload;
use crate::registry::Registry;
use crate::signer::{verify_message, Signature};
use crate::types::{Era, KeyType, EXTRINSIC_FORMAT_VERSION, SIGNED_EXTRINSIC_BIT};

/// `MultiAddress::Id` variant index
const ADDRESS_ID: u8 = 0x00;

/// A fully signed, submittable extrinsic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedExtrinsic {
    pub sender: AccountId,
    pub signature: Signature,
    pub era: Era,
    pub nonce: u32,
    pub tip: u128,
    /// SCALE-encoded call
    pub call: Vec<u8>,
}

impl SignedExtrinsic {
    /// Serialize with the compact length prefix
    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::with_capacity(self.call.len() + 112);
        body.push(SIGNED_EXTRINSIC_BIT | EXTRINSIC_FORMAT_VERSION);
        body.push(ADDRESS_ID);
        body.extend_from_slice(self.sender.as_bytes());
        body.extend_from_slice(&self.signature.to_wire());
        encode_era_to(&self.era, &mut body);
        encode_compact_to(self.nonce, &mut body);
        encode_compact_to(self.tip, &mut body);
        body.extend_from_slice(&self.call);

        let mut result = Vec::with_capacity(body.len() + 4);
        encode_compact_to(body.len() as u32, &mut result);
        result.extend(body);
        result
    }

    pub fn to_hex(&self) -> String {
        to_hex(&self.encode())
    }

    /// Transaction hash: Blake2-256 of the encoded extrinsic
    pub fn hash(&self) -> [u8; 32] {
        blake2_256(&self.encode())
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, WasmPolyxError> {
        Self::decode(&parse_hex(hex_str)?)
    }

    /// Parse a signed extrinsic
    pub fn decode(bytes: &[u8]) -> Result<Self, WasmPolyxError> {
        let mut input = bytes;
        let length: u32 = decode_compact(&mut input)?;
        if length as usize != input.len() {
            return Err(WasmPolyxError::InvalidTransaction(format!(
                "Length prefix says {} bytes, found {}",
                length,
                input.len()
            )));
        }

        let version = take(&mut input, 1, "version byte")?[0];
        if version & SIGNED_EXTRINSIC_BIT == 0 {
            return Err(WasmPolyxError::InvalidTransaction(
                "Extrinsic is not signed".to_string(),
            ));
        }
        if version & !SIGNED_EXTRINSIC_BIT != EXTRINSIC_FORMAT_VERSION {
            return Err(WasmPolyxError::InvalidTransaction(format!(
                "Unsupported extrinsic version: {}",
                version & !SIGNED_EXTRINSIC_BIT
            )));
        }

        let address_type = take(&mut input, 1, "address type")?[0];
        if address_type != ADDRESS_ID {
            return Err(WasmPolyxError::InvalidTransaction(format!(
                "Unsupported address type: {}",
                address_type
            )));
        }
        let sender = AccountId(take_hash(&mut input, "signer")?);

        let algorithm = KeyType::from_discriminator(take(&mut input, 1, "signature type")?[0])?;
        let raw = take(&mut input, algorithm.signature_len(), "signature")?;
        let signature = Signature::new(algorithm, raw.to_vec())?;

        let era = decode_era(&mut input)?;
        let nonce: u32 = decode_compact(&mut input)?;
        let tip: u128 = decode_compact(&mut input)?;
        if input.is_empty() {
            return Err(WasmPolyxError::InvalidTransaction(
                "Missing call data".to_string(),
            ));
        }

        Ok(SignedExtrinsic {
            sender,
            signature,
            era,
            nonce,
            tip,
            call: input.to_vec(),
        })
    }
}

/// Combine a structured payload and its signature into a signed extrinsic
///
/// Everything is checked locally, before anything is sent: the signature
/// algorithm must match the sender's declared key type, the payload must be
/// valid against the registry and the signature must verify over the
/// payload's signing bytes.
pub fn assemble(
    payload: &StructuredPayload,
    signature: &Signature,
    registry: &Registry,
) -> Result<SignedExtrinsic, TxError> {
    let fail = |kind: ErrorKind| {
        TxError::new(Stage::Assemble, kind)
            .with_payload(PayloadKind::Structured)
            .with_sender(payload.sender.account_id)
    };

    if let Some(declared) = payload.sender.key_type {
        if declared != signature.algorithm {
            return Err(fail(ErrorKind::Assembly(format!(
                "signature discriminator {:#04x} ({}) does not match sender key type {}",
                signature.algorithm.discriminator(),
                signature.algorithm,
                declared
            ))));
        }
    }

    registry.check_payload(payload).map_err(|e| {
        TxError::from_local(Stage::Assemble, e)
            .with_payload(PayloadKind::Structured)
            .with_sender(payload.sender.account_id)
    })?;

    if !verify_message(
        &payload.sender.account_id,
        &payload.signing_bytes(),
        signature,
    ) {
        return Err(fail(ErrorKind::Assembly(
            "signature does not verify against payload and sender".to_string(),
        )));
    }

    Ok(SignedExtrinsic {
        sender: payload.sender.account_id,
        signature: signature.clone(),
        era: payload.era,
        nonce: payload.nonce,
        tip: payload.tip,
        call: payload.call_data.clone(),
    })
}
