//! Type registry built from chain metadata
//!
//! The registry is the only state shared between concurrent transactions. It
//! is immutable once built and cheap to clone.

use crate::address::Sender;
use crate::call::Call;
use crate::codec::{encode_compact_to, take};
use crate::error::WasmPolyxError;
use crate::payload::{
    RawBytes, RawPayloadType, SignablePayload, SignerPayloadRaw, StructuredPayload,
};
use crate::types::{ChainMetadata, KeyType};
use std::sync::Arc;
use subxt_core::ext::scale_value::{scale::decode_as_type, Composite};
use subxt_core::metadata::Metadata;
use subxt_core::tx::payload::{dynamic, Payload};

/// Encode/decode schema for calls and payloads of one runtime version
#[derive(Debug, Clone)]
pub struct Registry {
    metadata: Arc<Metadata>,
    spec_version: u32,
}

/// Build a registry from fetched metadata
pub fn build_registry(metadata: &ChainMetadata) -> Result<Registry, WasmPolyxError> {
    Registry::new(metadata)
}

impl Registry {
    pub fn new(metadata: &ChainMetadata) -> Result<Self, WasmPolyxError> {
        let decoded = subxt_core::metadata::decode_from(&metadata.bytes)
            .map_err(|e| WasmPolyxError::ScaleDecodeError(format!("Invalid metadata: {}", e)))?;
        Ok(Registry {
            metadata: Arc::new(decoded),
            spec_version: metadata.spec_version,
        })
    }

    /// Runtime spec version this registry describes
    pub fn spec_version(&self) -> u32 {
        self.spec_version
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Encode a call: `pallet_index ++ call_index ++ args`
    pub fn encode_call(&self, call: &Call) -> Result<Vec<u8>, WasmPolyxError> {
        dynamic(call.pallet.as_str(), call.name.as_str(), call.fields.clone())
            .encode_call_data(&self.metadata)
            .map_err(|e| {
                WasmPolyxError::CallCodec(format!(
                    "Failed to encode {}.{}: {}",
                    call.pallet, call.name, e
                ))
            })
    }

    /// `Utility::batch_all(calls)`
    ///
    /// Inner calls are encoded one by one and concatenated behind the
    /// `Vec` length prefix.
    pub fn encode_batch_all(&self, calls: &[Call]) -> Result<Vec<u8>, WasmPolyxError> {
        if calls.is_empty() {
            return Err(WasmPolyxError::InvalidInput(
                "Batch cannot be empty".to_string(),
            ));
        }
        if calls.iter().any(|c| c.pallet == "Utility" && c.name.starts_with("batch")) {
            return Err(WasmPolyxError::InvalidInput(
                "Nested batch not supported".to_string(),
            ));
        }

        let encoded = calls
            .iter()
            .map(|call| self.encode_call(call))
            .collect::<Result<Vec<_>, _>>()?;

        let (pallet_idx, call_idx) = self.call_index("Utility", "batch_all")?;
        let mut result = vec![pallet_idx, call_idx];
        encode_compact_to(encoded.len() as u32, &mut result);
        for call in encoded {
            result.extend(call);
        }
        Ok(result)
    }

    /// Pallet and call index from metadata
    pub fn call_index(&self, pallet: &str, call: &str) -> Result<(u8, u8), WasmPolyxError> {
        let p = self.metadata.pallet_by_name(pallet).ok_or_else(|| {
            WasmPolyxError::CallCodec(format!("{} pallet not found", pallet))
        })?;
        let c = p.call_variant_by_name(call).ok_or_else(|| {
            WasmPolyxError::CallCodec(format!("{}.{} not found", pallet, call))
        })?;
        Ok((p.index(), c.index))
    }

    /// Decode a complete call. Fails if any bytes are left over.
    pub fn decode_call(&self, bytes: &[u8]) -> Result<Call, WasmPolyxError> {
        let mut input = bytes;
        let call = self.decode_call_prefix(&mut input)?;
        if !input.is_empty() {
            return Err(WasmPolyxError::CallCodec(format!(
                "{} trailing bytes after {}.{}",
                input.len(),
                call.pallet,
                call.name
            )));
        }
        Ok(call)
    }

    /// Decode one call from the front of `input`, advancing the cursor
    pub fn decode_call_prefix(&self, input: &mut &[u8]) -> Result<Call, WasmPolyxError> {
        let pallet_index = take(input, 1, "pallet index")?[0];
        let call_index = take(input, 1, "call index")?[0];

        let pallet = self.metadata.pallet_by_index(pallet_index).ok_or_else(|| {
            WasmPolyxError::CallCodec(format!("Unknown pallet index {}", pallet_index))
        })?;
        let variant = pallet.call_variant_by_index(call_index).ok_or_else(|| {
            WasmPolyxError::CallCodec(format!(
                "Unknown call index {} in {}",
                call_index,
                pallet.name()
            ))
        })?;

        let mut named = Vec::new();
        let mut unnamed = Vec::new();
        for field in &variant.fields {
            let value = decode_as_type(input, field.ty.id, self.metadata.types())
                .map_err(|e| {
                    WasmPolyxError::CallCodec(format!(
                        "{}.{}: {}",
                        pallet.name(),
                        variant.name,
                        e
                    ))
                })?
                .remove_context();
            match &field.name {
                Some(name) => named.push((name.clone(), value)),
                None => unnamed.push(value),
            }
        }
        let fields = if unnamed.is_empty() {
            Composite::Named(named)
        } else {
            Composite::Unnamed(unnamed)
        };

        Ok(Call::new(pallet.name(), variant.name.clone(), fields))
    }

    /// Canonical signable bytes of a payload, after checking that it was built
    /// for this runtime, that its call decodes, and that its era and block
    /// hash agree
    pub fn encode_payload(&self, payload: &StructuredPayload) -> Result<Vec<u8>, WasmPolyxError> {
        self.check_payload(payload)?;
        Ok(payload.encode())
    }

    pub(crate) fn check_payload(&self, payload: &StructuredPayload) -> Result<(), WasmPolyxError> {
        if payload.spec_version != self.spec_version {
            return Err(WasmPolyxError::StaleMetadata {
                registry: self.spec_version,
                payload: payload.spec_version,
            });
        }
        payload.check_block_hash()?;
        self.decode_call(&payload.call_data)?;
        Ok(())
    }

    /// Inverse of [`encode_payload`](Self::encode_payload)
    pub fn decode_payload(
        &self,
        bytes: &[u8],
        sender: Sender,
    ) -> Result<StructuredPayload, WasmPolyxError> {
        let payload = StructuredPayload::decode(bytes, sender)?;
        self.decode_call(&payload.call_data)?;
        Ok(payload)
    }

    /// Parse a payload whose call is not length-prefixed. The call boundary
    /// is found by decoding the call against the metadata.
    pub fn decode_unprefixed_payload(
        &self,
        bytes: &[u8],
        sender: Sender,
    ) -> Result<StructuredPayload, WasmPolyxError> {
        let mut input = bytes;
        self.decode_call_prefix(&mut input)?;
        let call_len = bytes.len() - input.len();
        StructuredPayload::decode_tail(bytes[..call_len].to_vec(), &mut input, sender)
    }

    /// Turn a polkadot.js raw payload into the representation it stands for
    pub fn parse_raw_payload(
        &self,
        raw: &SignerPayloadRaw,
        key_type: Option<KeyType>,
    ) -> Result<SignablePayload, WasmPolyxError> {
        let sender = raw.sender(key_type)?;
        let data = raw.data_bytes()?;
        match raw.payload_type {
            RawPayloadType::Bytes => Ok(SignablePayload::Raw(RawBytes::new(sender, data))),
            RawPayloadType::Payload => Ok(SignablePayload::Structured(
                self.decode_unprefixed_payload(&data, sender)?,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::AccountId;
    use crate::codec::to_hex;
    use crate::test_utils::metadata::{
        test_registry, AccountId32, BalancesCall, Memo, MultiAddress, RuntimeCall, SystemCall,
        UtilityCall, TEST_SPEC_VERSION,
    };
    use crate::types::Era;
    use parity_scale_codec::Encode;

    const GENESIS: [u8; 32] = [0x2a; 32];

    fn dest() -> AccountId {
        AccountId([0xbb; 32])
    }

    fn sender() -> Sender {
        Sender::new(AccountId([0xaa; 32]))
    }

    fn payload(registry: &Registry, call: &Call) -> StructuredPayload {
        StructuredPayload {
            sender: sender(),
            call_data: registry.encode_call(call).unwrap(),
            spec_version: TEST_SPEC_VERSION,
            transaction_version: 7,
            genesis_hash: GENESIS,
            block_hash: GENESIS,
            era: Era::Immortal,
            nonce: 5,
            tip: 0,
        }
    }

    #[test]
    fn test_encode_transfer_matches_runtime_encoding() {
        let registry = test_registry();
        let encoded = registry.encode_call(&Call::transfer(&dest(), 1)).unwrap();
        let expected = RuntimeCall::Balances(BalancesCall::transfer {
            dest: MultiAddress::Id(AccountId32([0xbb; 32])),
            value: 1,
        })
        .encode();
        assert_eq!(encoded, expected);
        assert_eq!(&encoded[..3], &[5, 0, 0]);
    }

    #[test]
    fn test_call_roundtrip() {
        let registry = test_registry();
        let calls = [
            Call::transfer(&dest(), 1),
            Call::transfer(&dest(), u128::MAX),
            Call::transfer_with_memo(&dest(), 42, Some("Test memo")).unwrap(),
            Call::transfer_with_memo(&dest(), 42, None).unwrap(),
            Call::remark(b"hello polymesh"),
        ];
        for call in calls {
            let bytes = registry.encode_call(&call).unwrap();
            assert_eq!(registry.decode_call(&bytes).unwrap(), call);
        }
    }

    #[test]
    fn test_memo_encoding_matches_runtime() {
        let registry = test_registry();
        let encoded = registry
            .encode_call(&Call::transfer_with_memo(&dest(), 42, Some("Test memo")).unwrap())
            .unwrap();
        let mut memo = [0u8; 32];
        memo[..9].copy_from_slice(b"Test memo");
        let expected = RuntimeCall::Balances(BalancesCall::transfer_with_memo {
            dest: MultiAddress::Id(AccountId32([0xbb; 32])),
            value: 42,
            memo: Some(Memo(memo)),
        })
        .encode();
        assert_eq!(encoded, expected);
    }

    #[test]
    fn test_unknown_call_fails() {
        let registry = test_registry();
        assert!(matches!(
            registry.encode_call(&Call::new("Balances", "mint", Composite::Named(vec![]))),
            Err(WasmPolyxError::CallCodec(_))
        ));
        assert!(registry.decode_call(&[99, 0]).is_err());
        assert!(registry.decode_call(&[5, 9]).is_err());
    }

    #[test]
    fn test_decode_call_rejects_trailing_bytes() {
        let registry = test_registry();
        let mut bytes = registry.encode_call(&Call::transfer(&dest(), 1)).unwrap();
        bytes.push(0);
        assert!(registry.decode_call(&bytes).is_err());
    }

    #[test]
    fn test_batch_all() {
        let registry = test_registry();
        let calls = vec![Call::transfer(&dest(), 1), Call::remark(b"x")];
        let encoded = registry.encode_batch_all(&calls).unwrap();
        let expected = RuntimeCall::Utility(UtilityCall::batch_all {
            calls: vec![
                RuntimeCall::Balances(BalancesCall::transfer {
                    dest: MultiAddress::Id(AccountId32([0xbb; 32])),
                    value: 1,
                }),
                RuntimeCall::System(SystemCall::remark {
                    remark: b"x".to_vec(),
                }),
            ],
        })
        .encode();
        assert_eq!(encoded, expected);

        let decoded = registry.decode_call(&encoded).unwrap();
        assert_eq!(decoded.pallet, "Utility");
        assert_eq!(decoded.name, "batch_all");

        assert!(registry.encode_batch_all(&[]).is_err());
    }

    #[test]
    fn test_payload_encoding_is_deterministic() {
        let registry = test_registry();
        let p = payload(&registry, &Call::transfer(&dest(), 1));
        let first = registry.encode_payload(&p).unwrap();
        let second = registry.encode_payload(&p.clone()).unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.decode_payload(&first, sender()).unwrap(), p);
    }

    #[test]
    fn test_encode_payload_rejects_stale_spec_version() {
        let registry = test_registry();
        let mut p = payload(&registry, &Call::transfer(&dest(), 1));
        p.spec_version = TEST_SPEC_VERSION - 1;
        assert_eq!(
            registry.encode_payload(&p),
            Err(WasmPolyxError::StaleMetadata {
                registry: TEST_SPEC_VERSION,
                payload: TEST_SPEC_VERSION - 1,
            })
        );
    }

    #[test]
    fn test_encode_payload_rejects_bad_call_and_block_hash() {
        let registry = test_registry();
        let mut p = payload(&registry, &Call::transfer(&dest(), 1));
        p.block_hash = [0x33; 32];
        assert!(registry.encode_payload(&p).is_err());

        let mut p = payload(&registry, &Call::transfer(&dest(), 1));
        p.call_data.truncate(10);
        assert!(matches!(
            registry.encode_payload(&p),
            Err(WasmPolyxError::CallCodec(_))
        ));
    }

    #[test]
    fn test_decode_unprefixed_payload() {
        let registry = test_registry();
        let mut p = payload(&registry, &Call::transfer(&dest(), 1));
        p.era = Era::mortal(64, 10);
        p.block_hash = [0x33; 32];
        let decoded = registry
            .decode_unprefixed_payload(&p.encode_unprefixed(), sender())
            .unwrap();
        assert_eq!(decoded, p);
    }

    #[test]
    fn test_parse_raw_payload() {
        let registry = test_registry();
        let p = payload(&registry, &Call::remark(b"hi"));
        let raw = SignerPayloadRaw {
            address: sender().account_id.to_string(),
            data: to_hex(&p.encode_unprefixed()),
            payload_type: RawPayloadType::Payload,
        };
        assert_eq!(
            registry.parse_raw_payload(&raw, None).unwrap(),
            SignablePayload::Structured(p)
        );

        let raw = SignerPayloadRaw {
            address: sender().account_id.to_string(),
            data: "0x0102".to_string(),
            payload_type: RawPayloadType::Bytes,
        };
        assert_eq!(
            registry.parse_raw_payload(&raw, None).unwrap(),
            SignablePayload::Raw(RawBytes::new(sender(), vec![1, 2]))
        );
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Registry>();
    }

    #[test]
    fn test_invalid_metadata() {
        let bad = ChainMetadata::new(vec![1, 2, 3], 1);
        assert!(matches!(
            Registry::new(&bad),
            Err(WasmPolyxError::ScaleDecodeError(_))
        ));
    }
}
