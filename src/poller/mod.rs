//! Block cursor over the source chain.
//!
//! The [`Poller`] turns the passing of time into a gap-free sequence of logs. It remembers the
//! last block it has fully credited and on each [`poll`](Poller::poll) fetches
//! `cursor + 1..=latest`, split into chunks of at most `max_block_range` blocks. The cursor
//! only moves once every chunk has been fetched, so a failed poll is retried in full on the
//! next call and no block is ever skipped.

mod range_iterator;

use alloy::primitives::{Address, B256};

use crate::{
    chain::{ChainHandle, RawLog},
    error::ConnectionError,
};

use range_iterator::RangeIterator;

/// Default upper bound on the number of blocks covered by one `eth_getLogs` request.
pub const DEFAULT_MAX_BLOCK_RANGE: u64 = 1000;

/// Polls one contract on one chain for one event signature.
#[derive(Debug)]
pub struct Poller<H> {
    handle: H,
    contract: Address,
    event_signature: B256,
    max_block_range: u64,
    cursor: u64,
}

impl<H: ChainHandle> Poller<H> {
    /// Creates a poller whose cursor starts at the chain's current head.
    ///
    /// Events emitted at or before that block are never returned.
    ///
    /// # Errors
    ///
    /// Returns the [`ConnectionError`] raised while fetching the head.
    pub async fn init(
        handle: H,
        contract: Address,
        event_signature: B256,
        max_block_range: u64,
    ) -> Result<Self, ConnectionError> {
        let cursor = handle.latest_block().await?;
        info!(chain_id = handle.chain_id(), cursor = cursor, contract = %contract, "Poller initialized");
        Ok(Self::starting_at(handle, contract, event_signature, max_block_range, cursor))
    }

    /// Creates a poller with an explicit starting cursor.
    #[must_use]
    pub fn starting_at(
        handle: H,
        contract: Address,
        event_signature: B256,
        max_block_range: u64,
        cursor: u64,
    ) -> Self {
        Self { handle, contract, event_signature, max_block_range: max_block_range.max(1), cursor }
    }

    /// Last block whose logs have been returned.
    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    #[must_use]
    pub fn handle(&self) -> &H {
        &self.handle
    }

    /// Fetches logs emitted since the last successful poll, ordered by
    /// `(block_number, log_index)`.
    ///
    /// Returns an empty batch when the head has not advanced, including when it appears to
    /// have moved backwards.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`] if the head or any chunk of logs cannot be fetched. The
    /// cursor is left unchanged in that case.
    pub async fn poll(&mut self) -> Result<Vec<RawLog>, ConnectionError> {
        let chain_id = self.handle.chain_id();
        let latest = self.handle.latest_block().await?;

        if latest < self.cursor {
            warn!(
                chain_id = chain_id,
                cursor = self.cursor,
                latest = latest,
                "Head is behind cursor, treating as no new blocks"
            );
            return Ok(Vec::new());
        }
        if latest == self.cursor {
            trace!(chain_id = chain_id, cursor = self.cursor, "No new blocks");
            return Ok(Vec::new());
        }

        let from = self.cursor + 1;
        let mut logs = Vec::new();
        for range in RangeIterator::new(from, latest, self.max_block_range) {
            let chunk = self
                .handle
                .get_logs(self.contract, self.event_signature, *range.start(), *range.end())
                .await?;
            logs.extend(chunk);
        }
        logs.sort_by_key(RawLog::position);

        debug!(chain_id = chain_id, from = from, to = latest, logs = logs.len(), "Polled block range");
        self.cursor = latest;
        Ok(logs)
    }
}
