//! Bridge-Listener is the off-chain half of a lock-and-mint token bridge.
//!
//! It watches a bridge contract on a source chain for `TokensLocked` events, validates each
//! one and records the `mint` a validator would submit on the destination chain. Nothing is
//! ever signed or broadcast.
//!
//! The main entry point is [`BridgeOrchestrator`], built from a [`BridgeConfig`], two
//! [`ChainHandle`]s and a [`PriceOracle`]. Call [`BridgeOrchestrator::subscribe`] for a stream of
//! [`OutcomeRecord`]s, then [`BridgeOrchestrator::run`] until a [`CancellationToken`] fires.
//!
//! # Processing
//!
//! Every tick the [`Poller`] fetches logs from the block after its cursor up to the current
//! head. Each new log is decoded into a [`BridgeEvent`], passed through the
//! [`ValidationPipeline`] and, when accepted, turned into a [`SimulatedAction`] by the
//! [`ActionSimulator`]. Each log ends in exactly one [`Outcome`].
//!
//! # Ordering
//!
//! Logs are processed strictly in `(block_number, log_index)` order, one at a time. Ticks never
//! overlap.
//!
//! # Failures
//!
//! * A [`ConnectionError`] while polling ends the tick early and leaves the cursor untouched, so
//!   the same block range is queried again on the next tick.
//! * A log that does not decode is [`Outcome::Dropped`].
//! * A failed check, including an unreachable price oracle, makes the event
//!   [`Outcome::Rejected`].
//!
//! # Reorgs and duplicates
//!
//! There is no confirmation depth: logs are processed as soon as they are returned. A head that
//! moves backwards is treated as "no new blocks". Events are de-duplicated by transaction hash
//! and log index for the lifetime of the process.
//!
//! [`CancellationToken`]: tokio_util::sync::CancellationToken

#[macro_use]
mod logging;

pub mod action;
pub mod chain;
pub mod config;
pub mod oracle;
pub mod orchestrator;
pub mod poller;
pub mod validation;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

mod error;
mod event;
mod types;

pub use action::{ActionSimulator, SimulatedAction};
pub use chain::{ChainConfig, ChainHandle, RawLog, RpcChainHandle, RpcChainHandleBuilder};
pub use config::{BridgeConfig, OracleConfig, RpcConfig};
pub use error::{BridgeError, ConfigError, ConnectionError, DecodeError, OracleError};
pub use event::{BridgeEvent, EventId, TokensLocked};
pub use oracle::{HttpPriceOracle, PriceOracle};
pub use orchestrator::{BridgeOrchestrator, DEFAULT_OUTCOME_BUFFER_CAPACITY, TickSummary};
pub use poller::{DEFAULT_MAX_BLOCK_RANGE, Poller};
pub use types::{Outcome, OutcomeRecord};
pub use validation::{
    Check, CheckRecord, ValidationOutcome, ValidationPipeline, ValidationPolicy, Verdict,
};
