//! Scripted collaborators for exercising the listener without a node or an HTTP API.

pub mod macros;

use std::{
    collections::VecDeque,
    ops::RangeInclusive,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicUsize, Ordering},
    },
};

use alloy::{
    primitives::{Address, B256, Bytes, U256, address},
    sol_types::SolEvent,
};
use rust_decimal::Decimal;

use crate::{
    chain::{ChainHandle, RawLog},
    error::{ConnectionError, OracleError},
    event::TokensLocked,
    oracle::PriceOracle,
};

/// Sender used by [`tokens_locked_log`].
pub const SENDER: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
/// Recipient used by [`tokens_locked_log`].
pub const RECIPIENT: Address = address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");

#[derive(Debug, Default)]
struct ChainState {
    head: u64,
    logs: Vec<RawLog>,
    head_failures: VecDeque<ConnectionError>,
    log_failure: Option<(usize, ConnectionError)>,
    log_queries: Vec<RangeInclusive<u64>>,
}

/// In-memory [`ChainHandle`] with a settable head and scripted failures.
///
/// Clones share state, so a test can keep one copy while the code under test owns another.
#[derive(Debug, Clone)]
pub struct MockChain {
    chain_id: u64,
    state: Arc<Mutex<ChainState>>,
}

impl MockChain {
    #[must_use]
    pub fn new(chain_id: u64, head: u64) -> Self {
        Self { chain_id, state: Arc::new(Mutex::new(ChainState { head, ..ChainState::default() })) }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn head(&self) -> u64 {
        self.state().head
    }

    pub fn set_head(&self, head: u64) {
        self.state().head = head;
    }

    /// Adds a log, returned by any `get_logs` call whose range covers its block.
    pub fn push_log(&self, log: RawLog) {
        self.state().logs.push(log);
    }

    /// Makes the next `latest_block` call fail with `error`.
    pub fn fail_next_latest_block(&self, error: ConnectionError) {
        self.state().head_failures.push_back(error);
    }

    /// Makes the next `get_logs` call fail with `error`.
    pub fn fail_next_get_logs(&self, error: ConnectionError) {
        self.fail_get_logs_after(0, error);
    }

    /// Lets `successes` more `get_logs` calls through, then fails the one after with `error`.
    pub fn fail_get_logs_after(&self, successes: usize, error: ConnectionError) {
        self.state().log_failure = Some((successes, error));
    }

    /// Block ranges passed to `get_logs`, failed calls included.
    #[must_use]
    pub fn log_queries(&self) -> Vec<RangeInclusive<u64>> {
        self.state().log_queries.clone()
    }
}

impl ChainHandle for MockChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    async fn latest_block(&self) -> Result<u64, ConnectionError> {
        let mut state = self.state();
        match state.head_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state.head),
        }
    }

    async fn get_logs(
        &self,
        contract: Address,
        event_signature: B256,
        from: u64,
        to: u64,
    ) -> Result<Vec<RawLog>, ConnectionError> {
        let mut state = self.state();
        state.log_queries.push(from..=to);

        if let Some((remaining, error)) = state.log_failure.take() {
            if remaining == 0 {
                return Err(error);
            }
            state.log_failure = Some((remaining - 1, error));
        }

        // Insertion order, unsorted.
        Ok(state
            .logs
            .iter()
            .filter(|log| {
                log.address == contract
                    && log.topics.first() == Some(&event_signature)
                    && (from..=to).contains(&log.block_number)
            })
            .cloned()
            .collect())
    }
}

/// [`PriceOracle`] returning a fixed answer and counting calls.
#[derive(Debug, Clone)]
pub struct MockOracle {
    response: Result<Decimal, OracleError>,
    calls: Arc<AtomicUsize>,
}

impl MockOracle {
    #[must_use]
    pub fn price(price: Decimal) -> Self {
        Self { response: Ok(price), calls: Arc::default() }
    }

    #[must_use]
    pub fn failing(error: OracleError) -> Self {
        Self { response: Err(error), calls: Arc::default() }
    }

    /// Number of `get_price` calls so far, across clones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PriceOracle for MockOracle {
    async fn get_price(&self, _asset: &str) -> Result<Decimal, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

/// Transaction hash unique per `(block, log_index)`.
#[must_use]
pub fn transaction_hash(block: u64, log_index: u64) -> B256 {
    let mut hash = [0u8; 32];
    hash[..8].copy_from_slice(&block.to_be_bytes());
    hash[8..16].copy_from_slice(&log_index.to_be_bytes());
    hash[31] = 1;
    B256::from(hash)
}

/// A well-formed `TokensLocked` log from [`SENDER`] to [`RECIPIENT`].
#[must_use]
pub fn tokens_locked_log(
    contract: Address,
    block: u64,
    log_index: u64,
    amount: u128,
    nonce: u64,
) -> RawLog {
    let data = TokensLocked {
        from: SENDER,
        to: RECIPIENT,
        amount: U256::from(amount),
        nonce: U256::from(nonce),
    }
    .encode_log_data();

    RawLog {
        block_number: block,
        transaction_hash: transaction_hash(block, log_index),
        log_index,
        address: contract,
        topics: data.topics().to_vec(),
        data: data.data,
    }
}

/// A log carrying the `TokensLocked` signature but truncated arguments.
#[must_use]
pub fn malformed_log(contract: Address, block: u64, log_index: u64) -> RawLog {
    let mut log = tokens_locked_log(contract, block, log_index, 1, 0);
    log.data = Bytes::from(vec![0u8; 16]);
    log
}
