//! Chain metadata and chain-state fetching
//!
//! Reads only. Staleness is never detected on fetch; compare a registry
//! against the live runtime with [`ensure_fresh`].

use crate::codec::parse_hex;
use crate::error::{ErrorKind, Stage, TxError};
use crate::registry::Registry;
use crate::rpc::{Header, RpcClient, RpcError};
use crate::types::{ChainMetadata, Material, RuntimeVersion};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

/// Magic prefix of encoded runtime metadata ("meta")
const METADATA_MAGIC: [u8; 4] = *b"meta";

/// Block to anchor a mortal transaction to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceBlock {
    pub hash: String,
    pub number: u32,
}

/// Fetch the metadata blob and the spec version it belongs to, in one round trip
pub async fn fetch_metadata(client: &RpcClient) -> Result<ChainMetadata, TxError> {
    let mut results = client
        .batch(&[
            ("state_getMetadata", json!([])),
            ("state_getRuntimeVersion", json!([])),
        ])
        .await
        .map_err(fetch_error)?
        .into_iter();

    let metadata_hex: String = next_result(&mut results, "state_getMetadata")?;
    let version: RuntimeVersion = next_result(&mut results, "state_getRuntimeVersion")?;

    let bytes = parse_hex(&metadata_hex).map_err(|e| protocol(format!("metadata: {}", e)))?;
    if !bytes.starts_with(&METADATA_MAGIC) {
        return Err(protocol("metadata is missing the 'meta' prefix".to_string()));
    }

    tracing::info!(
        spec_name = %version.spec_name,
        spec_version = version.spec_version,
        metadata_len = bytes.len(),
        "Fetched chain metadata"
    );
    Ok(ChainMetadata::new(bytes, version.spec_version))
}

/// The runtime version the chain is currently running
pub async fn fetch_runtime_version(client: &RpcClient) -> Result<RuntimeVersion, TxError> {
    client
        .call("state_getRuntimeVersion", json!([]))
        .await
        .map_err(fetch_error)
}

/// Genesis hash, chain name and runtime versions, in one round trip
pub async fn fetch_material(client: &RpcClient) -> Result<Material, TxError> {
    let mut results = client
        .batch(&[
            ("chain_getBlockHash", json!([0])),
            ("system_chain", json!([])),
            ("state_getRuntimeVersion", json!([])),
        ])
        .await
        .map_err(fetch_error)?
        .into_iter();

    let genesis_hash: String = next_result(&mut results, "chain_getBlockHash")?;
    let chain_name: String = next_result(&mut results, "system_chain")?;
    let version: RuntimeVersion = next_result(&mut results, "state_getRuntimeVersion")?;

    Ok(Material {
        genesis_hash,
        chain_name,
        spec_name: version.spec_name,
        spec_version: version.spec_version,
        tx_version: version.transaction_version,
    })
}

/// The latest finalized block, used as the mortality checkpoint
pub async fn fetch_reference_block(client: &RpcClient) -> Result<ReferenceBlock, TxError> {
    let hash: String = client
        .call("chain_getFinalizedHead", json!([]))
        .await
        .map_err(fetch_error)?;
    let header: Option<Header> = client
        .call("chain_getHeader", json!([hash]))
        .await
        .map_err(fetch_error)?;
    let header =
        header.ok_or_else(|| protocol(format!("no header for finalized head {}", hash)))?;
    Ok(ReferenceBlock {
        hash,
        number: header.number,
    })
}

/// Fail with `StaleMetadata` unless the registry describes the running runtime
pub fn ensure_fresh(registry: &Registry, runtime: &RuntimeVersion) -> Result<(), TxError> {
    if registry.spec_version() != runtime.spec_version {
        tracing::warn!(
            registry = registry.spec_version(),
            chain = runtime.spec_version,
            "Metadata is stale"
        );
        return Err(TxError::new(
            Stage::Submit,
            ErrorKind::StaleMetadata {
                expected: registry.spec_version(),
                actual: runtime.spec_version,
            },
        ));
    }
    Ok(())
}

fn fetch_error(err: RpcError) -> TxError {
    err.into_tx_error(Stage::FetchMetadata)
}

fn protocol(message: String) -> TxError {
    TxError::new(Stage::FetchMetadata, ErrorKind::Protocol(message))
}

fn next_result<T: DeserializeOwned>(
    results: &mut impl Iterator<Item = Result<Value, RpcError>>,
    method: &str,
) -> Result<T, TxError> {
    let value = results
        .next()
        .ok_or_else(|| protocol(format!("missing {} result", method)))?
        .map_err(fetch_error)?;
    if value.is_null() {
        return Err(protocol(format!("{} returned null", method)));
    }
    serde_json::from_value(value).map_err(|e| protocol(format!("{}: {}", method, e)))
}
