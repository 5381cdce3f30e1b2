//! Payload building from intents
//!
//! Turns a high-level intent plus its chain context into one of the two
//! signable representations. Call bytes always come from the registry.

pub mod types;

use crate::address::AccountId;
use crate::call::Call;
use crate::codec::parse_hex_hash;
use crate::error::WasmPolyxError;
use crate::payload::{RawBytes, StructuredPayload};
use crate::registry::Registry;
use crate::types::{Era, Validity};
pub use types::{BuildContext, TransactionIntent};

/// Build a structured payload from an intent
///
/// # Arguments
/// * `intent` - High-level description of the transaction
/// * `context` - Chain context (sender, nonce, material, validity)
/// * `registry` - Schema for the runtime the material describes
pub fn build_payload(
    intent: &TransactionIntent,
    context: &BuildContext,
    registry: &Registry,
) -> Result<StructuredPayload, WasmPolyxError> {
    if context.material.spec_version != registry.spec_version() {
        return Err(WasmPolyxError::StaleMetadata {
            registry: registry.spec_version(),
            payload: context.material.spec_version,
        });
    }

    let sender = context.sender()?;
    let call_data = build_call_data(intent, registry)?;
    let era = compute_era(&context.validity);

    let genesis_hash = parse_hex_hash(&context.material.genesis_hash)?;
    // Immortal transactions are checked against the genesis block
    let block_hash = if era.is_immortal() {
        genesis_hash
    } else {
        parse_hex_hash(&context.reference_block)?
    };

    let payload = StructuredPayload {
        sender,
        call_data,
        spec_version: context.material.spec_version,
        transaction_version: context.material.tx_version,
        genesis_hash,
        block_hash,
        era,
        nonce: context.nonce,
        tip: context.tip,
    };
    payload.check_block_hash()?;
    Ok(payload)
}

/// Build a raw-bytes payload for message signing
pub fn build_raw(context: &BuildContext, data: &[u8]) -> Result<RawBytes, WasmPolyxError> {
    Ok(RawBytes::new(context.sender()?, data))
}

/// Build call data for an intent
pub fn build_call_data(
    intent: &TransactionIntent,
    registry: &Registry,
) -> Result<Vec<u8>, WasmPolyxError> {
    match intent {
        TransactionIntent::Batch { calls } => {
            let calls = calls
                .iter()
                .map(intent_call)
                .collect::<Result<Vec<_>, _>>()?;
            registry.encode_batch_all(&calls)
        }
        single => registry.encode_call(&intent_call(single)?),
    }
}

/// Map a single (non-batch) intent to its runtime call
fn intent_call(intent: &TransactionIntent) -> Result<Call, WasmPolyxError> {
    match intent {
        TransactionIntent::Transfer { to, amount, memo } => {
            let dest: AccountId = to.parse()?;
            match memo {
                Some(memo) => Call::transfer_with_memo(&dest, *amount, Some(memo)),
                None => Ok(Call::transfer(&dest, *amount)),
            }
        }
        TransactionIntent::Remark { message } => Ok(Call::remark(message.as_bytes())),
        TransactionIntent::Batch { .. } => Err(WasmPolyxError::InvalidInput(
            "Nested batch not supported".to_string(),
        )),
    }
}

/// Compute era from validity window. A zero duration means immortal.
pub fn compute_era(validity: &Validity) -> Era {
    if validity.max_duration == 0 {
        Era::Immortal
    } else {
        Era::mortal(validity.max_duration as u64, validity.first_valid as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::to_hex;
    use crate::test_utils::metadata::{test_registry, TEST_SPEC_VERSION, TEST_TX_VERSION};
    use crate::types::{AddressFormat, KeyType, Material};

    const GENESIS: [u8; 32] = [0x6f; 32];
    const REFERENCE: [u8; 32] = [0x91; 32];

    fn alice() -> AccountId {
        AccountId([0xaa; 32])
    }

    fn bob() -> AccountId {
        AccountId([0xbb; 32])
    }

    fn test_context(validity: Validity) -> BuildContext {
        BuildContext {
            sender: alice().to_ss58(AddressFormat::Polymesh.prefix()),
            key_type: Some(KeyType::Sr25519),
            nonce: 5,
            tip: 0,
            material: Material {
                genesis_hash: to_hex(&GENESIS),
                chain_name: "Polymesh Testnet".to_string(),
                spec_name: "polymesh_testnet".to_string(),
                spec_version: TEST_SPEC_VERSION,
                tx_version: TEST_TX_VERSION,
            },
            validity,
            reference_block: to_hex(&REFERENCE),
        }
    }

    fn transfer_intent(memo: Option<&str>) -> TransactionIntent {
        TransactionIntent::Transfer {
            to: bob().to_ss58(12),
            amount: 1,
            memo: memo.map(str::to_string),
        }
    }

    #[test]
    fn test_build_transfer() {
        let registry = test_registry();
        let context = test_context(Validity {
            first_valid: 1000,
            max_duration: 64,
        });

        let payload = build_payload(&transfer_intent(None), &context, &registry).unwrap();
        assert_eq!(payload.sender.account_id, alice());
        assert_eq!(payload.sender.key_type, Some(KeyType::Sr25519));
        assert_eq!(payload.nonce, 5);
        assert_eq!(payload.block_hash, REFERENCE);
        assert_eq!(payload.genesis_hash, GENESIS);
        assert_eq!(
            payload.era,
            Era::Mortal {
                period: 64,
                phase: 1000 % 64
            }
        );
        assert_eq!(
            registry.decode_call(&payload.call_data).unwrap(),
            Call::transfer(&bob(), 1)
        );
    }

    #[test]
    fn test_immortal_uses_genesis_as_block_hash() {
        let registry = test_registry();
        let context = test_context(Validity {
            first_valid: 0,
            max_duration: 0,
        });
        let payload = build_payload(&transfer_intent(None), &context, &registry).unwrap();
        assert_eq!(payload.era, Era::Immortal);
        assert_eq!(payload.block_hash, GENESIS);
    }

    #[test]
    fn test_build_transfer_with_memo() {
        let registry = test_registry();
        let context = test_context(Validity::default());
        let payload = build_payload(&transfer_intent(Some("invoice-42")), &context, &registry)
            .unwrap();
        assert_eq!(
            registry.decode_call(&payload.call_data).unwrap(),
            Call::transfer_with_memo(&bob(), 1, Some("invoice-42")).unwrap()
        );

        let too_long = "x".repeat(33);
        assert!(build_payload(&transfer_intent(Some(&too_long)), &context, &registry).is_err());
    }

    #[test]
    fn test_build_batch() {
        let registry = test_registry();
        let context = test_context(Validity::default());
        let intent = TransactionIntent::Batch {
            calls: vec![
                transfer_intent(None),
                TransactionIntent::Remark {
                    message: "hello".to_string(),
                },
            ],
        };
        let payload = build_payload(&intent, &context, &registry).unwrap();
        let expected = registry
            .encode_batch_all(&[Call::transfer(&bob(), 1), Call::remark(b"hello")])
            .unwrap();
        assert_eq!(payload.call_data, expected);

        let nested = TransactionIntent::Batch {
            calls: vec![intent],
        };
        assert!(build_payload(&nested, &context, &registry).is_err());
    }

    #[test]
    fn test_material_for_other_runtime_is_stale() {
        let registry = test_registry();
        let mut context = test_context(Validity::default());
        context.material.spec_version = TEST_SPEC_VERSION - 1;
        let err = build_payload(&transfer_intent(None), &context, &registry).unwrap_err();
        assert_eq!(
            err,
            WasmPolyxError::StaleMetadata {
                registry: TEST_SPEC_VERSION,
                payload: TEST_SPEC_VERSION - 1
            }
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let registry = test_registry();
        let context = test_context(Validity::default());
        let a = build_payload(&transfer_intent(None), &context, &registry).unwrap();
        let b = build_payload(&transfer_intent(None), &context, &registry.clone()).unwrap();
        assert_eq!(
            registry.encode_payload(&a).unwrap(),
            registry.encode_payload(&b).unwrap()
        );
    }

    #[test]
    fn test_build_raw() {
        let context = test_context(Validity::default());
        let raw = build_raw(&context, b"hello").unwrap();
        assert_eq!(raw.sender.account_id, alice());
        assert_eq!(raw.data, b"hello");
    }

    #[test]
    fn test_compute_era() {
        assert_eq!(
            compute_era(&Validity {
                first_valid: 0,
                max_duration: 0
            }),
            Era::Immortal
        );
        // Rounded up to the next power of two
        assert_eq!(
            compute_era(&Validity {
                first_valid: 1000,
                max_duration: 2400
            }),
            Era::Mortal {
                period: 4096,
                phase: 1000
            }
        );
    }
}
