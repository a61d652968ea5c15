//! Chain connectivity.
//!
//! A [`ChainHandle`] is the only way the rest of the crate talks to a blockchain: it reports the
//! current height and returns the logs a contract emitted in a block range. [`RpcChainHandle`]
//! implements it over an alloy [`RootProvider`](alloy::providers::RootProvider) with a bounded
//! per-call timeout and exponential backoff; build one with [`RpcChainHandleBuilder`].
//!
//! Chain-specific quirks are carried by [`ChainConfig`] flags rather than by different handle
//! types. The one quirk currently modelled is proof-of-authority block headers, whose
//! `extraData` exceeds the base protocol's 32 byte maximum.

mod builder;
mod handle;
mod header;

pub use builder::{
    DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_MIN_DELAY, RpcChainHandleBuilder,
};
pub use handle::RpcChainHandle;
pub use header::MAX_EXTRA_DATA_BYTES;

use alloy::{
    primitives::{Address, B256, Bytes},
    rpc::types::Log,
};
use serde::{Deserialize, Serialize};

use crate::error::ConnectionError;

/// Static description of one chain the listener talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// JSON-RPC endpoint (http(s) or ws(s)).
    pub rpc_url: String,
    /// Address of the bridge contract deployed on this chain.
    pub bridge_contract: Address,
    /// Accept block headers with oversized `extraData`.
    #[serde(default)]
    pub proof_of_authority: bool,
}

/// A log as returned by `eth_getLogs`, before decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    pub block_number: u64,
    pub transaction_hash: B256,
    pub log_index: u64,
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
}

impl RawLog {
    /// Converts an RPC log, returning `None` for pending logs that lack block placement.
    #[must_use]
    pub fn from_rpc(log: Log) -> Option<Self> {
        Some(RawLog {
            block_number: log.block_number?,
            transaction_hash: log.transaction_hash?,
            log_index: log.log_index?,
            address: log.inner.address,
            topics: log.inner.data.topics().to_vec(),
            data: log.inner.data.data.clone(),
        })
    }

    /// Sort key defining processing order.
    #[must_use]
    pub fn position(&self) -> (u64, u64) {
        (self.block_number, self.log_index)
    }
}

/// Capability to query one chain.
///
/// Implementations must bound every call with a timeout and report it as a
/// [`ConnectionError::Transient`].
pub trait ChainHandle {
    /// Chain id this handle is connected to.
    fn chain_id(&self) -> u64;

    /// Current head block number.
    fn latest_block(&self) -> impl Future<Output = Result<u64, ConnectionError>> + Send;

    /// Logs emitted by `contract` with `topic0 == event_signature` in `from..=to`.
    fn get_logs(
        &self,
        contract: Address,
        event_signature: B256,
        from: u64,
        to: u64,
    ) -> impl Future<Output = Result<Vec<RawLog>, ConnectionError>> + Send;
}
