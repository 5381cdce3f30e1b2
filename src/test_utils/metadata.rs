//! A small V15 runtime metadata covering the calls the crate builds
//!
//! Pallet and call indices follow the Polymesh runtime layout for the pallets
//! included here. The runtime types also derive `Encode`, so tests can compare
//! registry output against the encoding the runtime itself would produce.

#![allow(non_camel_case_types)]

use crate::registry::Registry;
use crate::types::ChainMetadata;
use frame_metadata::v15::{
    CustomMetadata, ExtrinsicMetadata, OuterEnums, PalletCallMetadata, PalletMetadata,
    RuntimeMetadataV15,
};
use frame_metadata::RuntimeMetadataPrefixed;
use parity_scale_codec::{Decode, Encode};
use scale_info::{meta_type, TypeInfo};

pub const TEST_SPEC_VERSION: u32 = 7_002_000;
pub const TEST_TX_VERSION: u32 = 7;

#[derive(Debug, Clone, PartialEq, Encode, Decode, TypeInfo)]
pub struct AccountId32(pub [u8; 32]);

#[derive(Debug, Clone, PartialEq, Encode, Decode, TypeInfo)]
pub enum MultiAddress {
    #[codec(index = 0)]
    Id(AccountId32),
    #[codec(index = 2)]
    Raw(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Encode, Decode, TypeInfo)]
pub enum MultiSignature {
    #[codec(index = 0)]
    Ed25519([u8; 64]),
    #[codec(index = 1)]
    Sr25519([u8; 64]),
    #[codec(index = 2)]
    Ecdsa([u8; 65]),
}

#[derive(Debug, Clone, PartialEq, Encode, Decode, TypeInfo)]
pub struct Memo(pub [u8; 32]);

#[derive(Debug, Clone, PartialEq, Encode, Decode, TypeInfo)]
pub enum SystemCall {
    #[codec(index = 0)]
    remark { remark: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Encode, Decode, TypeInfo)]
pub enum BalancesCall {
    #[codec(index = 0)]
    transfer {
        dest: MultiAddress,
        #[codec(compact)]
        value: u128,
    },
    #[codec(index = 1)]
    transfer_with_memo {
        dest: MultiAddress,
        #[codec(compact)]
        value: u128,
        memo: Option<Memo>,
    },
}

#[derive(Debug, Clone, PartialEq, Encode, Decode, TypeInfo)]
pub enum UtilityCall {
    #[codec(index = 2)]
    batch_all { calls: Vec<RuntimeCall> },
}

#[derive(Debug, Clone, PartialEq, Encode, Decode, TypeInfo)]
pub enum RuntimeCall {
    #[codec(index = 0)]
    System(SystemCall),
    #[codec(index = 5)]
    Balances(BalancesCall),
    #[codec(index = 29)]
    Utility(UtilityCall),
}

#[derive(TypeInfo)]
pub enum RuntimeEvent {
    Noop,
}

#[derive(TypeInfo)]
pub enum RuntimeError {
    Noop,
}

fn pallet<T: TypeInfo + 'static>(name: &'static str, index: u8) -> PalletMetadata {
    PalletMetadata {
        name,
        storage: None,
        calls: Some(PalletCallMetadata {
            ty: meta_type::<T>(),
        }),
        event: None,
        constants: vec![],
        error: None,
        index,
        docs: vec![],
    }
}

/// SCALE-encoded `RuntimeMetadataPrefixed`
pub fn test_metadata_bytes() -> Vec<u8> {
    let pallets = vec![
        pallet::<SystemCall>("System", 0),
        pallet::<BalancesCall>("Balances", 5),
        pallet::<UtilityCall>("Utility", 29),
    ];
    let extrinsic = ExtrinsicMetadata {
        version: 4,
        address_ty: meta_type::<MultiAddress>(),
        call_ty: meta_type::<RuntimeCall>(),
        signature_ty: meta_type::<MultiSignature>(),
        extra_ty: meta_type::<()>(),
        signed_extensions: vec![],
    };
    let v15 = RuntimeMetadataV15::new(
        pallets,
        extrinsic,
        meta_type::<()>(),
        vec![],
        OuterEnums {
            call_enum_ty: meta_type::<RuntimeCall>(),
            event_enum_ty: meta_type::<RuntimeEvent>(),
            error_enum_ty: meta_type::<RuntimeError>(),
        },
        CustomMetadata {
            map: Default::default(),
        },
    );
    RuntimeMetadataPrefixed::from(v15).encode()
}

pub fn test_chain_metadata() -> ChainMetadata {
    ChainMetadata::new(test_metadata_bytes(), TEST_SPEC_VERSION)
}

pub fn test_registry() -> Registry {
    Registry::new(&test_chain_metadata()).expect("test metadata decodes")
}
