//! The polling loop tying the listener together.
//!
//! Each tick polls the source chain once and then walks the returned logs in
//! `(block_number, log_index)` order. Every log not seen before ends in exactly one
//! [`Outcome`]: dropped when it does not decode, rejected when a validation check fails,
//! simulated otherwise. Outcomes are logged and sent to every subscribed stream.
//!
//! Ticks never overlap and events within a tick are processed one at a time. Shutdown is
//! only observed between ticks, so an event that has started processing always reaches its
//! terminal outcome.

use std::{collections::HashSet, time::Duration};

use alloy::primitives::Address;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use crate::{
    action::ActionSimulator,
    chain::{ChainHandle, RawLog, RpcChainHandle},
    config::BridgeConfig,
    error::{BridgeError, ConnectionError},
    event::{BridgeEvent, EventId},
    oracle::{HttpPriceOracle, PriceOracle},
    poller::Poller,
    types::{Outcome, OutcomeRecord, TryStream},
    validation::ValidationPipeline,
};

/// Default capacity of each outcome stream.
pub const DEFAULT_OUTCOME_BUFFER_CAPACITY: usize = 128;

/// Counts for one completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Cursor after the poll.
    pub cursor: u64,
    pub logs: usize,
    pub duplicates: usize,
    pub dropped: usize,
    pub rejected: usize,
    pub simulated: usize,
}

/// Drives polling, validation and action simulation.
///
/// `S` is the source chain, `D` the destination chain and `O` the price reference.
#[derive(Debug)]
pub struct BridgeOrchestrator<S, D, O> {
    poller: Poller<S>,
    destination: D,
    pipeline: ValidationPipeline<O>,
    simulator: ActionSimulator,
    validator: Address,
    polling_interval: Duration,
    processed: HashSet<EventId>,
    listeners: Vec<mpsc::Sender<OutcomeRecord>>,
    buffer_capacity: usize,
    shutdown: CancellationToken,
}

impl<S, D, O> BridgeOrchestrator<S, D, O>
where
    S: ChainHandle,
    D: ChainHandle,
    O: PriceOracle,
{
    /// Builds an orchestrator whose cursor starts at the source chain's current head.
    ///
    /// # Errors
    ///
    /// Returns a [`ConnectionError`] if the source head cannot be fetched.
    pub async fn new(
        config: &BridgeConfig,
        source: S,
        destination: D,
        oracle: O,
    ) -> Result<Self, ConnectionError> {
        let poller = Poller::init(
            source,
            config.source.bridge_contract,
            BridgeEvent::SIGNATURE_HASH,
            config.rpc.max_block_range,
        )
        .await?;

        Ok(Self::with_poller(config, poller, destination, oracle))
    }

    /// Builds an orchestrator around an existing poller.
    #[must_use]
    pub fn with_poller(config: &BridgeConfig, poller: Poller<S>, destination: D, oracle: O) -> Self {
        Self {
            poller,
            destination,
            pipeline: ValidationPipeline::new(config.validation_policy(), oracle),
            simulator: config.action_simulator(),
            validator: config.validator_address,
            polling_interval: config.polling_interval(),
            processed: HashSet::new(),
            listeners: Vec::new(),
            buffer_capacity: DEFAULT_OUTCOME_BUFFER_CAPACITY,
            shutdown: CancellationToken::new(),
        }
    }

    /// Sets the capacity of streams created by later [`subscribe`](Self::subscribe) calls.
    #[must_use]
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity.max(1);
        self
    }

    /// Returns a stream of every outcome produced from now on.
    ///
    /// The stream ends when the orchestrator is dropped or [`run`](Self::run) returns.
    /// Processing waits on a stream whose buffer is full; once `run`'s token is cancelled the
    /// outcome is skipped for that stream instead.
    pub fn subscribe(&mut self) -> ReceiverStream<OutcomeRecord> {
        let (tx, rx) = mpsc::channel(self.buffer_capacity);
        self.listeners.push(tx);
        ReceiverStream::new(rx)
    }

    #[must_use]
    pub fn cursor(&self) -> u64 {
        self.poller.cursor()
    }

    #[must_use]
    pub fn poller(&self) -> &Poller<S> {
        &self.poller
    }

    #[must_use]
    pub fn destination(&self) -> &D {
        &self.destination
    }

    #[must_use]
    pub fn pipeline(&self) -> &ValidationPipeline<O> {
        &self.pipeline
    }

    /// Number of distinct events seen so far.
    #[must_use]
    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Runs ticks every polling interval until `shutdown` is cancelled.
    ///
    /// Errors from a tick are logged and the next tick retries; only cancellation ends the
    /// loop. Outcome streams close when this returns.
    pub async fn run(mut self, shutdown: CancellationToken) {
        self.shutdown = shutdown.clone();
        info!(
            source_chain_id = self.poller.handle().chain_id(),
            destination_chain_id = self.destination.chain_id(),
            cursor = self.cursor(),
            interval_secs = self.polling_interval.as_secs(),
            "Bridge listener started"
        );

        while !shutdown.is_cancelled() {
            match self.tick().await {
                Ok(summary) if summary.logs > 0 => {
                    info!(
                        cursor = summary.cursor,
                        logs = summary.logs,
                        duplicates = summary.duplicates,
                        dropped = summary.dropped,
                        rejected = summary.rejected,
                        simulated = summary.simulated,
                        "Tick complete"
                    );
                }
                Ok(summary) => debug!(cursor = summary.cursor, "Tick complete, no new events"),
                Err(err) if err.is_transient() => {
                    warn!(error = %err, cursor = self.cursor(), "Poll failed, retrying next tick");
                }
                Err(err) => {
                    error!(error = %err, cursor = self.cursor(), "Poll failed, retrying next tick");
                }
            }

            tokio::select! {
                () = shutdown.cancelled() => {}
                () = tokio::time::sleep(self.polling_interval) => {}
            }
        }

        info!(cursor = self.cursor(), processed = self.processed.len(), "Bridge listener stopped");
    }

    /// Polls once and processes every new log.
    ///
    /// # Errors
    ///
    /// Returns the poll's [`ConnectionError`]; no log is processed and the cursor is
    /// unchanged in that case.
    pub async fn tick(&mut self) -> Result<TickSummary, ConnectionError> {
        let logs = self.poller.poll().await?;
        let mut summary = TickSummary { cursor: self.poller.cursor(), logs: logs.len(), ..TickSummary::default() };

        for log in &logs {
            match self.process(log).await {
                None => summary.duplicates += 1,
                Some(record) => {
                    match record.outcome {
                        Outcome::Dropped { .. } => summary.dropped += 1,
                        Outcome::Rejected { .. } => summary.rejected += 1,
                        Outcome::Simulated { .. } => summary.simulated += 1,
                    }
                    self.emit(record).await;
                }
            }
        }

        Ok(summary)
    }

    /// Takes one log to its terminal outcome, or returns `None` for an already seen event.
    async fn process(&mut self, log: &RawLog) -> Option<OutcomeRecord> {
        let event_id = EventId::from(log);
        if !self.processed.insert(event_id) {
            debug!(event_id = %event_id, "Skipping duplicate event");
            return None;
        }

        let source_chain_id = self.poller.handle().chain_id();
        let outcome = match BridgeEvent::decode(log, source_chain_id) {
            Err(err) => Outcome::Dropped { reason: err.to_string() },
            Ok(event) => {
                debug!(
                    event_id = %event_id,
                    sender = %event.sender,
                    recipient = %event.recipient,
                    amount = %event.amount,
                    nonce = %event.nonce,
                    "Detected bridge event"
                );
                let validation = self.pipeline.validate(&event).await;
                if validation.is_accepted() {
                    let action = self.simulator.simulate(&event, self.validator);
                    Outcome::Simulated { validation, action }
                } else {
                    Outcome::Rejected { validation }
                }
            }
        };

        Some(OutcomeRecord { event_id, block_number: log.block_number, outcome })
    }

    async fn emit(&mut self, record: OutcomeRecord) {
        match &record.outcome {
            Outcome::Dropped { reason } => {
                warn!(event_id = %record.event_id, block = record.block_number, reason = %reason, "Event dropped");
            }
            Outcome::Rejected { validation } => {
                warn!(
                    event_id = %record.event_id,
                    block = record.block_number,
                    check = ?validation.failed_check(),
                    reason = validation.rejection_reason().unwrap_or_default(),
                    "Event rejected"
                );
            }
            Outcome::Simulated { action, .. } => {
                info!(
                    event_id = %record.event_id,
                    block = record.block_number,
                    destination_chain_id = action.destination_chain_id,
                    recipient = %action.recipient,
                    amount = %action.amount,
                    source_nonce = %action.source_nonce,
                    validator = %action.validator,
                    "Mint simulated"
                );
            }
        }

        let mut open = Vec::with_capacity(self.listeners.len());
        for listener in self.listeners.drain(..) {
            let delivered = tokio::select! {
                biased;
                delivered = listener.try_stream(record.clone()) => delivered,
                () = self.shutdown.cancelled() => {
                    debug!(event_id = %record.event_id, "Shutting down, skipping full outcome stream");
                    true
                }
            };
            if delivered {
                open.push(listener);
            }
        }
        self.listeners = open;
    }
}

impl BridgeOrchestrator<RpcChainHandle, RpcChainHandle, HttpPriceOracle> {
    /// Validates `config`, connects both chains and the price oracle, and positions the cursor
    /// at the source head.
    ///
    /// # Errors
    ///
    /// Any configuration error, and any [`ConnectionError`] while connecting either chain.
    /// Both chains must be reachable before listening starts.
    pub async fn connect(config: &BridgeConfig) -> Result<Self, BridgeError> {
        config.validate()?;

        let source = config.chain_builder(&config.source).connect().await?;
        let destination = config.chain_builder(&config.destination).connect().await?;
        let oracle = config.price_oracle()?;

        Ok(Self::new(config, source, destination, oracle).await?)
    }
}
