use std::{fmt::Debug, time::Duration};

use alloy::{
    consensus::BlockHeader,
    eips::BlockNumberOrTag,
    network::{BlockResponse, Ethereum, Network},
    primitives::{Address, B256},
    providers::{Provider, RootProvider},
    rpc::types::Filter,
    transports::{RpcError, TransportErrorKind},
};
use backon::{ExponentialBuilder, Retryable};
use tokio::time::timeout;

use crate::{
    chain::{ChainConfig, ChainHandle, RawLog, header::check_extra_data},
    error::ConnectionError,
};

/// [`ChainHandle`] backed by a JSON-RPC endpoint.
///
/// Every call is retried with exponential backoff while the failure looks transient, and the
/// whole attempt (retries included) is bounded by `call_timeout`.
#[derive(Clone, Debug)]
pub struct RpcChainHandle<N: Network = Ethereum> {
    pub(crate) config: ChainConfig,
    pub(crate) provider: RootProvider<N>,
    pub(crate) call_timeout: Duration,
    pub(crate) max_retries: usize,
    pub(crate) min_delay: Duration,
}

impl<N: Network> RpcChainHandle<N> {
    /// The configuration this handle was built from.
    #[must_use]
    pub fn config(&self) -> &ChainConfig {
        &self.config
    }

    /// Get a reference to the underlying provider.
    #[must_use]
    pub fn provider(&self) -> &RootProvider<N> {
        &self.provider
    }

    /// Fetches the chain id reported by the endpoint.
    pub async fn remote_chain_id(&self) -> Result<u64, ConnectionError> {
        debug!(chain_id = self.config.chain_id, "eth_chainId called");
        self.try_operation(|provider| async move { provider.get_chain_id().await }).await
    }

    /// Fetches the latest block header and checks it against the configured consensus flavour.
    pub async fn check_latest_header(&self) -> Result<(), ConnectionError> {
        debug!(chain_id = self.config.chain_id, "eth_getBlockByNumber called");
        let block = self
            .try_operation(|provider| async move {
                provider.get_block_by_number(BlockNumberOrTag::Latest).await
            })
            .await?
            .ok_or_else(|| {
                ConnectionError::transient(self.config.chain_id, "latest block not found")
            })?;

        check_extra_data(
            self.config.chain_id,
            block.header().extra_data().len(),
            self.config.proof_of_authority,
        )
    }

    /// Execute `operation` with exponential backoff and a total timeout.
    ///
    /// Only failures classified as transient are retried. A timeout is reported as
    /// [`ConnectionError::Transient`].
    pub(crate) async fn try_operation<T: Debug, F, Fut>(
        &self,
        operation: F,
    ) -> Result<T, ConnectionError>
    where
        F: Fn(RootProvider<N>) -> Fut,
        Fut: Future<Output = Result<T, RpcError<TransportErrorKind>>>,
    {
        let chain_id = self.config.chain_id;
        let retry_strategy = ExponentialBuilder::default()
            .with_max_times(self.max_retries)
            .with_min_delay(self.min_delay);

        let result = timeout(
            self.call_timeout,
            (|| operation(self.provider.clone()))
                .retry(retry_strategy)
                .when(|err: &RpcError<TransportErrorKind>| {
                    ConnectionError::from_rpc(chain_id, err).is_transient()
                })
                .notify(|err: &RpcError<TransportErrorKind>, dur: Duration| {
                    info!(chain_id = chain_id, error = %err, "RPC error, retrying after {:?}", dur);
                })
                .sleep(tokio::time::sleep),
        )
        .await;

        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                let err = ConnectionError::from_rpc(chain_id, &err);
                error!(chain_id = chain_id, error = %err, "RPC call failed");
                Err(err)
            }
            Err(_elapsed) => {
                error!(chain_id = chain_id, timeout_ms = self.call_timeout.as_millis(), "RPC call timed out");
                Err(ConnectionError::transient(chain_id, "operation timed out"))
            }
        }
    }
}

impl<N: Network> ChainHandle for RpcChainHandle<N> {
    fn chain_id(&self) -> u64 {
        self.config.chain_id
    }

    async fn latest_block(&self) -> Result<u64, ConnectionError> {
        trace!(chain_id = self.config.chain_id, "eth_blockNumber called");
        self.try_operation(|provider| async move { provider.get_block_number().await }).await
    }

    async fn get_logs(
        &self,
        contract: Address,
        event_signature: B256,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, ConnectionError> {
        debug!(chain_id = self.config.chain_id, from = from, to = to, "eth_getLogs called");
        let filter =
            Filter::new().address(contract).event_signature(event_signature).from_block(from).to_block(to);

        let logs = self
            .try_operation(|provider| {
                let filter = filter.clone();
                async move { provider.get_logs(&filter).await }
            })
            .await?;

        Ok(logs
            .into_iter()
            .filter_map(|log| {
                let raw = RawLog::from_rpc(log);
                if raw.is_none() {
                    warn!(chain_id = self.config.chain_id, "Skipping pending log without block placement");
                }
                raw
            })
            .collect())
    }
}
