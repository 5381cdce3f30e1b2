//! End-to-end transaction flow for one node
//!
//! fetch metadata -> build payload -> encode -> sign -> assemble -> submit,
//! strictly in that order per transaction. The registry is fetched once on
//! connect and shared by every transaction prepared afterwards; submission
//! checks it against the live runtime first.

use crate::address::AccountId;
use crate::builder::types::{BuildContext, TransactionIntent};
use crate::builder::build_payload;
use crate::error::{PayloadKind, Stage, TxError};
use crate::extrinsic::{assemble, SignedExtrinsic};
use crate::metadata::{
    ensure_fresh, fetch_material, fetch_metadata, fetch_reference_block, fetch_runtime_version,
};
use crate::payload::{RawBytes, SignablePayload};
use crate::registry::Registry;
use crate::signer::{Keyring, Signature};
use crate::submitter::{Submitter, TxHash, TxStatus};
use crate::types::{Material, Validity};
use futures_util::Stream;

/// Per-transaction inputs supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOptions {
    /// Externally assigned account nonce
    pub nonce: u32,
    pub tip: u128,
    /// Blocks the transaction stays valid for, counted from the latest
    /// finalized block. 0 makes it immortal.
    pub mortality: u32,
}

impl TxOptions {
    pub fn new(nonce: u32) -> Self {
        TxOptions {
            nonce,
            tip: 0,
            mortality: 64,
        }
    }
}

#[derive(Debug)]
pub struct Pipeline {
    submitter: Submitter,
    registry: Registry,
    material: Material,
    keyring: Keyring,
}

impl Pipeline {
    /// Fetch metadata and chain material, and build the registry
    pub async fn connect(submitter: Submitter, keyring: Keyring) -> Result<Self, TxError> {
        let metadata = fetch_metadata(submitter.rpc()).await?;
        let material = fetch_material(submitter.rpc()).await?;
        let registry = Registry::new(&metadata)
            .map_err(|e| TxError::from_local(Stage::BuildRegistry, e))?;

        tracing::info!(
            endpoint = submitter.rpc().endpoint(),
            chain = %material.chain_name,
            spec_version = registry.spec_version(),
            "Pipeline connected"
        );
        Ok(Pipeline {
            submitter,
            registry,
            material,
            keyring,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    /// SS58 address of `account` in the connected chain's format
    pub fn address(&self, account: &AccountId) -> String {
        account.to_ss58(self.material.address_format().prefix())
    }

    /// Build, sign and assemble one transaction. Nothing is sent.
    pub async fn prepare(
        &self,
        intent: &TransactionIntent,
        sender: &AccountId,
        options: TxOptions,
    ) -> Result<SignedExtrinsic, TxError> {
        let context_err = |stage: Stage| {
            move |e| {
                TxError::from_local(stage, e)
                    .with_payload(PayloadKind::Structured)
                    .with_sender(*sender)
            }
        };

        let declared = self.keyring.sender(sender).map_err(context_err(Stage::Sign))?;

        let (validity, reference_block) = if options.mortality == 0 {
            (
                Validity {
                    first_valid: 0,
                    max_duration: 0,
                },
                self.material.genesis_hash.clone(),
            )
        } else {
            let reference = fetch_reference_block(self.submitter.rpc())
                .await
                .map_err(|e| e.with_sender(*sender))?;
            (
                Validity {
                    first_valid: reference.number,
                    max_duration: options.mortality,
                },
                reference.hash,
            )
        };

        let context = BuildContext {
            sender: self.address(sender),
            key_type: declared.key_type,
            nonce: options.nonce,
            tip: options.tip,
            material: self.material.clone(),
            validity,
            reference_block,
        };
        let payload = build_payload(intent, &context, &self.registry)
            .map_err(context_err(Stage::BuildPayload))?;
        self.registry
            .encode_payload(&payload)
            .map_err(context_err(Stage::Encode))?;

        let signature = self
            .keyring
            .sign(&SignablePayload::Structured(payload.clone()))
            .map_err(context_err(Stage::Sign))?;
        let extrinsic = assemble(&payload, &signature, &self.registry)?;

        tracing::debug!(
            sender = %self.address(sender),
            nonce = options.nonce,
            tx_hash = %TxHash(extrinsic.hash()),
            "Prepared extrinsic"
        );
        Ok(extrinsic)
    }

    /// Sign arbitrary bytes for an account held in the keyring
    pub fn sign_raw(&self, sender: &AccountId, data: &[u8]) -> Result<Signature, TxError> {
        self.keyring
            .sender(sender)
            .map(|s| SignablePayload::Raw(RawBytes::new(s, data)))
            .and_then(|payload| self.keyring.sign(&payload))
            .map_err(|e| {
                TxError::from_local(Stage::Sign, e)
                    .with_payload(PayloadKind::Raw)
                    .with_sender(*sender)
            })
    }

    /// Submit after checking the registry against the live runtime
    pub async fn submit(&self, extrinsic: &SignedExtrinsic) -> Result<TxHash, TxError> {
        self.preflight(extrinsic).await?;
        self.submitter.submit_extrinsic(extrinsic).await
    }

    pub async fn submit_and_watch(
        &self,
        extrinsic: &SignedExtrinsic,
    ) -> Result<impl Stream<Item = Result<TxStatus, TxError>> + Send + 'static, TxError> {
        self.preflight(extrinsic).await?;
        self.submitter.submit_and_watch(extrinsic).await
    }

    /// Prepare and submit
    pub async fn send(
        &self,
        intent: &TransactionIntent,
        sender: &AccountId,
        options: TxOptions,
    ) -> Result<TxHash, TxError> {
        let extrinsic = self.prepare(intent, sender, options).await?;
        self.submit(&extrinsic).await
    }

    pub fn watch(
        &self,
        tx_hash: TxHash,
    ) -> impl Stream<Item = Result<TxStatus, TxError>> + Send + 'static {
        self.submitter.watch(tx_hash)
    }

    async fn preflight(&self, extrinsic: &SignedExtrinsic) -> Result<(), TxError> {
        let runtime = fetch_runtime_version(self.submitter.rpc()).await?;
        ensure_fresh(&self.registry, &runtime).map_err(|e| {
            e.with_payload(PayloadKind::Extrinsic)
                .with_sender(extrinsic.sender)
        })
    }
}
