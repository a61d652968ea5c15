use std::time::Duration;

use alloy::{
    network::{Ethereum, Network},
    providers::RootProvider,
};

use crate::{
    chain::{ChainConfig, ChainHandle, RpcChainHandle},
    error::ConnectionError,
};

/// Default timeout used by `RpcChainHandle`
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
/// Default maximum number of retry attempts.
pub const DEFAULT_MAX_RETRIES: usize = 3;
/// Default base delay between retries.
pub const DEFAULT_MIN_DELAY: Duration = Duration::from_millis(500);

/// Builder for constructing a [`RpcChainHandle`].
///
/// Use this to configure timeouts and retry/backoff before connecting.
#[derive(Clone, Debug)]
pub struct RpcChainHandleBuilder {
    config: ChainConfig,
    call_timeout: Duration,
    max_retries: usize,
    min_delay: Duration,
}

impl RpcChainHandleBuilder {
    /// Create a builder with default settings for the given chain.
    #[must_use]
    pub fn new(config: ChainConfig) -> Self {
        Self {
            config,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            min_delay: DEFAULT_MIN_DELAY,
        }
    }

    /// Create a builder with no retry attempts and only timeout set.
    #[must_use]
    pub fn fragile(config: ChainConfig) -> Self {
        Self::new(config).max_retries(0).min_delay(Duration::ZERO)
    }

    /// Set the maximum timeout for RPC operations, retries included.
    #[must_use]
    pub fn call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the maximum number of retry attempts.
    #[must_use]
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay for exponential backoff retries.
    #[must_use]
    pub fn min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }

    /// Wraps an already constructed provider without probing the endpoint.
    #[must_use]
    pub fn with_provider<N: Network>(self, provider: RootProvider<N>) -> RpcChainHandle<N> {
        RpcChainHandle {
            config: self.config,
            provider,
            call_timeout: self.call_timeout,
            max_retries: self.max_retries,
            min_delay: self.min_delay,
        }
    }

    /// Connects to the configured endpoint and verifies it is usable.
    ///
    /// Verification fetches the current height, checks the latest header against the
    /// proof-of-authority flag and compares the reported chain id with the configured one.
    ///
    /// # Errors
    ///
    /// * [`ConnectionError::Fatal`] - invalid URL, wrong chain id, malformed header or a
    ///   rejected request.
    /// * [`ConnectionError::Transient`] - the endpoint is unreachable or timed out.
    pub async fn connect(self) -> Result<RpcChainHandle<Ethereum>, ConnectionError> {
        self.connect_network::<Ethereum>().await
    }

    /// Like [`connect`](Self::connect) for an arbitrary alloy [`Network`].
    pub async fn connect_network<N: Network>(self) -> Result<RpcChainHandle<N>, ConnectionError> {
        let chain_id = self.config.chain_id;
        debug!(
            chain_id = chain_id,
            rpc_url = %self.config.rpc_url,
            call_timeout_ms = self.call_timeout.as_millis(),
            max_retries = self.max_retries,
            proof_of_authority = self.config.proof_of_authority,
            "Connecting chain handle"
        );

        let url = self.config.rpc_url.clone();
        let provider = tokio::time::timeout(self.call_timeout, RootProvider::<N>::connect(&url))
            .await
            .map_err(|_| ConnectionError::transient(chain_id, "timed out connecting to endpoint"))?
            .map_err(|err| match ConnectionError::from_rpc(chain_id, &err) {
                ConnectionError::Transient { reason, .. } if url.starts_with("ws") => {
                    ConnectionError::transient(chain_id, reason)
                }
                other => ConnectionError::fatal(chain_id, other.to_string()),
            })?;

        let handle = self.with_provider(provider);
        handle.verify().await?;
        Ok(handle)
    }
}

impl<N: Network> RpcChainHandle<N> {
    async fn verify(&self) -> Result<(), ConnectionError> {
        let chain_id = self.config.chain_id;
        let latest = self.latest_block().await?;
        self.check_latest_header().await?;

        let remote = self.remote_chain_id().await?;
        if remote != chain_id {
            return Err(ConnectionError::fatal(
                chain_id,
                format!("endpoint reports chain id {remote}, expected {chain_id}"),
            ));
        }

        info!(chain_id = chain_id, latest_block = latest, "Connected to chain");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::{
        primitives::{Address, Bytes, U64},
        providers::mock::Asserter,
        rpc::{
            client::RpcClient,
            types::{Block, Header},
        },
    };

    fn config() -> ChainConfig {
        ChainConfig {
            chain_id: 5,
            rpc_url: "http://localhost:8545".to_string(),
            bridge_contract: Address::ZERO,
            proof_of_authority: true,
        }
    }

    #[test]
    fn builder_defaults() {
        let builder = RpcChainHandleBuilder::new(config());
        assert_eq!(builder.call_timeout, DEFAULT_CALL_TIMEOUT);
        assert_eq!(builder.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(builder.min_delay, DEFAULT_MIN_DELAY);
    }

    #[test]
    fn fragile_builder_disables_retries() {
        let builder = RpcChainHandleBuilder::fragile(config()).call_timeout(Duration::from_secs(2));
        assert_eq!(builder.max_retries, 0);
        assert_eq!(builder.min_delay, Duration::ZERO);
        assert_eq!(builder.call_timeout, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn with_provider_keeps_configuration() {
        let provider = RootProvider::<Ethereum>::new(RpcClient::mocked(Asserter::new()));
        let handle = RpcChainHandleBuilder::new(config()).max_retries(7).with_provider(provider);

        assert_eq!(handle.config(), &config());
        assert_eq!(handle.max_retries, 7);
    }

    #[tokio::test]
    async fn invalid_url_is_fatal() {
        let mut cfg = config();
        cfg.rpc_url = "not a url".to_string();

        let err = RpcChainHandleBuilder::fragile(cfg).connect().await.unwrap_err();

        assert!(!err.is_transient());
    }

    /// A handle whose endpoint answers `eth_blockNumber`, `eth_getBlockByNumber` and
    /// `eth_chainId` once each, in that order.
    fn scripted(chain: ChainConfig, extra_data_len: usize, remote_chain_id: u64) -> RpcChainHandle {
        let asserter = Asserter::new();
        asserter.push_success(&U64::from(100));
        let header = Header::new(alloy::consensus::Header {
            number: 100,
            extra_data: Bytes::from(vec![0xab; extra_data_len]),
            ..Default::default()
        });
        asserter.push_success(&Block::<alloy::rpc::types::Transaction>::empty(header));
        asserter.push_success(&U64::from(remote_chain_id));

        let provider = RootProvider::new(RpcClient::mocked(asserter));
        RpcChainHandleBuilder::fragile(chain).with_provider(provider)
    }

    #[tokio::test]
    async fn poa_header_accepted_with_flag() {
        let handle = scripted(config(), 97, 5);
        handle.verify().await.unwrap();
    }

    #[tokio::test]
    async fn poa_header_fatal_without_flag() {
        let mut cfg = config();
        cfg.proof_of_authority = false;
        let handle = scripted(cfg, 97, 5);

        let err = handle.verify().await.unwrap_err();

        assert!(!err.is_transient());
        assert_eq!(err.chain_id(), 5);
        assert!(err.to_string().contains("97 bytes"));
    }

    #[tokio::test]
    async fn regular_header_accepted_without_flag() {
        let mut cfg = config();
        cfg.proof_of_authority = false;
        let handle = scripted(cfg, 32, 5);

        handle.verify().await.unwrap();
    }

    #[tokio::test]
    async fn chain_id_mismatch_is_fatal() {
        let handle = scripted(config(), 97, 1);

        let err = handle.verify().await.unwrap_err();

        assert!(!err.is_transient());
        assert!(err.to_string().contains("endpoint reports chain id 1, expected 5"));
    }
}
