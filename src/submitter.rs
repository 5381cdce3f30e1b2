//! Extrinsic submission and status tracking
//!
//! Submission is one `author_submitExtrinsic` call, retried only for transport
//! faults and never re-signed. Watching polls the node over HTTP and can be
//! attached at any time after submission.

use crate::codec::{blake2_256, parse_hex, parse_hex_hash, to_hex};
use crate::config::WatchConfig;
use crate::error::{ErrorKind, PayloadKind, Stage, TxError, WasmPolyxError, POOL_ALREADY_IMPORTED};
use crate::extrinsic::SignedExtrinsic;
use crate::rpc::{calculate_backoff, Header, RpcClient, RpcError, SignedBlock};
use crate::types::Era;
use core::fmt;
use core::str::FromStr;
use futures_util::stream::{self, Stream};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::time::Instant;

/// Blake2-256 hash of an encoded extrinsic
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl TxHash {
    pub fn of(extrinsic: &[u8]) -> Self {
        TxHash(blake2_256(extrinsic))
    }

    /// Hash of a hex-encoded extrinsic, `None` if it is not valid hex
    fn of_hex(extrinsic_hex: &str) -> Option<Self> {
        parse_hex(extrinsic_hex).ok().map(|bytes| TxHash::of(&bytes))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&to_hex(&self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self)
    }
}

impl FromStr for TxHash {
    type Err = WasmPolyxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex_hash(s).map(TxHash)
    }
}

/// Observed state of a submitted transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// In the node's pool
    Pending,
    /// Included in a block of the best chain
    InBlock { block_hash: String, number: u32 },
    /// Included in a finalized block
    Finalized { block_hash: String, number: u32 },
    /// Left the pool without being included
    Dropped,
    /// Can no longer be included
    Invalid { reason: String },
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TxStatus::Finalized { .. } | TxStatus::Dropped | TxStatus::Invalid { .. }
        )
    }
}

/// Sends signed extrinsics to one node and tracks them
#[derive(Debug, Clone)]
pub struct Submitter {
    rpc: Arc<RpcClient>,
    watch: WatchConfig,
}

impl Submitter {
    pub fn new(rpc: Arc<RpcClient>, watch: WatchConfig) -> Result<Self, WasmPolyxError> {
        watch.validate()?;
        Ok(Submitter { rpc, watch })
    }

    pub fn rpc(&self) -> &Arc<RpcClient> {
        &self.rpc
    }

    /// Submit a hex-encoded extrinsic and return its hash
    ///
    /// Transport faults are retried. If an earlier attempt may have reached the
    /// node, a later "already imported" answer means that attempt succeeded
    /// and the locally computed hash is returned. If the last attempt still
    /// fails after a possibly delivered one, the outcome is unknown and the
    /// error is a `Timeout`.
    pub async fn submit(&self, extrinsic_hex: &str) -> Result<TxHash, TxError> {
        let bytes = parse_hex(extrinsic_hex).map_err(|e| {
            TxError::new(
                Stage::Submit,
                ErrorKind::Assembly(format!("extrinsic is not valid hex: {}", e)),
            )
            .with_payload(PayloadKind::Extrinsic)
        })?;
        let local_hash = TxHash::of(&bytes);
        let params = json!([extrinsic_hex]);
        let config = self.rpc.config();

        let mut attempt = 0;
        let mut ambiguous = false;
        loop {
            match self.rpc.call_once("author_submitExtrinsic", &params).await {
                Ok(value) => {
                    let node_hash = value
                        .as_str()
                        .and_then(|s| s.parse::<TxHash>().ok())
                        .ok_or_else(|| {
                            TxError::new(
                                Stage::Submit,
                                ErrorKind::Protocol(format!("unexpected submit result {}", value)),
                            )
                        })?;
                    if node_hash != local_hash {
                        return Err(TxError::new(
                            Stage::Submit,
                            ErrorKind::Protocol(format!(
                                "node returned hash {}, expected {}",
                                node_hash, local_hash
                            )),
                        ));
                    }
                    tracing::info!(tx_hash = %local_hash, attempt, "Extrinsic submitted");
                    return Ok(local_hash);
                }
                Err(RpcError::Node { code, .. }) if ambiguous && code == POOL_ALREADY_IMPORTED => {
                    tracing::info!(
                        tx_hash = %local_hash,
                        attempt,
                        "Extrinsic already imported by an earlier attempt"
                    );
                    return Ok(local_hash);
                }
                Err(e) if e.is_transient() && attempt < config.max_retries => {
                    ambiguous |= e.maybe_delivered();
                    attempt += 1;
                    let delay =
                        calculate_backoff(attempt, config.retry_backoff_ms, config.max_backoff_ms);
                    tracing::warn!(
                        tx_hash = %local_hash,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Submission failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    ambiguous |= e.maybe_delivered();
                    let err = if ambiguous && e.is_transient() {
                        TxError::new(
                            Stage::Submit,
                            ErrorKind::Timeout {
                                after_ms: config.request_timeout_ms,
                            },
                        )
                    } else {
                        e.into_tx_error(Stage::Submit)
                    };
                    tracing::warn!(tx_hash = %local_hash, attempt, error = %err, "Submission failed");
                    return Err(err);
                }
            }
        }
    }

    /// Submit an assembled extrinsic. Errors carry its sender.
    pub async fn submit_extrinsic(&self, extrinsic: &SignedExtrinsic) -> Result<TxHash, TxError> {
        self.submit(&extrinsic.to_hex()).await.map_err(|e| {
            e.with_payload(PayloadKind::Extrinsic)
                .with_sender(extrinsic.sender)
        })
    }

    /// Stream of status changes for a submitted transaction
    ///
    /// Ends after a terminal status. Ends with a `Timeout` error if none is
    /// seen within the configured bound; the outcome is then unknown.
    pub fn watch(
        &self,
        tx_hash: TxHash,
    ) -> impl Stream<Item = Result<TxStatus, TxError>> + Send + 'static {
        self.watch_until(tx_hash, None)
    }

    /// Submit, then watch. A mortal extrinsic is reported `Invalid` once its
    /// mortality ends without inclusion.
    pub async fn submit_and_watch(
        &self,
        extrinsic: &SignedExtrinsic,
    ) -> Result<impl Stream<Item = Result<TxStatus, TxError>> + Send + 'static, TxError> {
        let expires_at = match extrinsic.era {
            Era::Immortal => None,
            era => {
                let best: Header = self
                    .rpc
                    .call("chain_getHeader", json!([]))
                    .await
                    .map_err(|e| e.into_tx_error(Stage::Submit).with_sender(extrinsic.sender))?;
                Some(era.death(best.number as u64))
            }
        };
        let tx_hash = self.submit_extrinsic(extrinsic).await?;
        Ok(self.watch_until(tx_hash, expires_at))
    }

    pub(crate) fn watch_until(
        &self,
        tx_hash: TxHash,
        expires_at: Option<u64>,
    ) -> impl Stream<Item = Result<TxStatus, TxError>> + Send + 'static {
        let watcher = Watcher {
            rpc: self.rpc.clone(),
            tx_hash,
            deadline: Instant::now() + self.watch.timeout(),
            config: self.watch.clone(),
            expires_at,
            next_block: None,
            seen_pending: false,
            included: None,
            queue: VecDeque::new(),
            polled: false,
            done: false,
        };
        stream::unfold(watcher, |mut watcher| async move {
            watcher.next_status().await.map(|item| (item, watcher))
        })
    }
}

struct Watcher {
    rpc: Arc<RpcClient>,
    tx_hash: TxHash,
    config: WatchConfig,
    deadline: Instant,
    /// First block of the mortality window's end, if known
    expires_at: Option<u64>,
    /// Next best-chain block to scan
    next_block: Option<u32>,
    seen_pending: bool,
    included: Option<(String, u32)>,
    queue: VecDeque<TxStatus>,
    polled: bool,
    done: bool,
}

impl Watcher {
    async fn next_status(&mut self) -> Option<Result<TxStatus, TxError>> {
        loop {
            if let Some(status) = self.queue.pop_front() {
                self.done |= status.is_terminal();
                return Some(Ok(status));
            }
            if self.done {
                return None;
            }

            let now = Instant::now();
            if now >= self.deadline {
                self.done = true;
                tracing::warn!(tx_hash = %self.tx_hash, "No terminal status before watch timeout");
                return Some(Err(TxError::new(
                    Stage::Watch,
                    ErrorKind::Timeout {
                        after_ms: self.config.timeout().as_millis() as u64,
                    },
                )));
            }
            if self.polled {
                tokio::time::sleep(self.config.poll_interval().min(self.deadline - now)).await;
            }
            self.polled = true;

            if let Err(e) = self.poll().await {
                if e.is_transient() {
                    tracing::warn!(tx_hash = %self.tx_hash, error = %e, "Status poll failed");
                    continue;
                }
                self.done = true;
                return Some(Err(e.into_tx_error(Stage::Watch)));
            }
        }
    }

    /// Pool first, then the best chain, then finality. A transaction that left
    /// the pool before the pool query is in a block the chain query sees.
    async fn poll(&mut self) -> Result<(), RpcError> {
        let pending: Vec<String> = self.rpc.call("author_pendingExtrinsics", json!([])).await?;
        let in_pool = pending
            .iter()
            .any(|x| TxHash::of_hex(x) == Some(self.tx_hash));
        if in_pool && !self.seen_pending && self.included.is_none() {
            self.seen_pending = true;
            self.queue.push_back(TxStatus::Pending);
        }

        let best: Header = self.rpc.call("chain_getHeader", json!([])).await?;
        if self.included.is_none() {
            self.scan(best.number).await?;
        }

        match self.included.clone() {
            Some((block_hash, number)) => {
                let finalized_hash: String =
                    self.rpc.call("chain_getFinalizedHead", json!([])).await?;
                let finalized: Option<Header> = self
                    .rpc
                    .call("chain_getHeader", json!([finalized_hash]))
                    .await?;
                if finalized.is_some_and(|h| h.number >= number) {
                    let canonical: Option<String> =
                        self.rpc.call("chain_getBlockHash", json!([number])).await?;
                    if canonical.as_deref() == Some(block_hash.as_str()) {
                        tracing::info!(tx_hash = %self.tx_hash, block = number, "Transaction finalized");
                        self.queue
                            .push_back(TxStatus::Finalized { block_hash, number });
                    } else {
                        tracing::warn!(tx_hash = %self.tx_hash, block = number, "Inclusion block retracted");
                        self.included = None;
                        self.next_block = Some(number);
                    }
                }
            }
            None if !in_pool => match self.expires_at {
                Some(death) if best.number as u64 >= death => {
                    self.queue.push_back(TxStatus::Invalid {
                        reason: format!("mortality ended at block {}", death),
                    });
                }
                _ if self.seen_pending => self.queue.push_back(TxStatus::Dropped),
                _ => {}
            },
            None => {}
        }
        Ok(())
    }

    async fn scan(&mut self, best: u32) -> Result<(), RpcError> {
        let from = self
            .next_block
            .unwrap_or_else(|| best.saturating_sub(self.config.lookback_blocks));
        for number in from..=best {
            let Some(block_hash) = self
                .rpc
                .call::<Option<String>>("chain_getBlockHash", json!([number]))
                .await?
            else {
                break;
            };
            let block: Option<SignedBlock> =
                self.rpc.call("chain_getBlock", json!([block_hash])).await?;
            self.next_block = Some(number + 1);

            let tx_hash = self.tx_hash;
            let found = block.is_some_and(|b| {
                b.block
                    .extrinsics
                    .iter()
                    .any(|x| TxHash::of_hex(x) == Some(tx_hash))
            });
            if found {
                tracing::info!(tx_hash = %self.tx_hash, block = number, "Transaction included");
                self.queue.push_back(TxStatus::InBlock {
                    block_hash: block_hash.clone(),
                    number,
                });
                self.included = Some((block_hash, number));
                break;
            }
        }
        Ok(())
    }
}
