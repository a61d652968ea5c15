use std::fmt;

use tokio::sync::mpsc;

use crate::{action::SimulatedAction, event::EventId, validation::ValidationOutcome};

/// Terminal state of one observed log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The log could not be decoded into a bridge event.
    Dropped { reason: String },
    /// A validation check failed.
    Rejected { validation: ValidationOutcome },
    /// All checks passed and the destination mint was simulated.
    Simulated { validation: ValidationOutcome, action: SimulatedAction },
}

impl Outcome {
    /// Short tag used in logs.
    #[must_use]
    pub fn tag(&self) -> &'static str {
        match self {
            Outcome::Dropped { .. } => "dropped",
            Outcome::Rejected { .. } => "rejected",
            Outcome::Simulated { .. } => "simulated",
        }
    }

    /// Messages explaining how the outcome was reached, in check order.
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        match self {
            Outcome::Dropped { reason } => vec![reason.as_str()],
            Outcome::Rejected { validation } | Outcome::Simulated { validation, .. } => {
                validation.records.iter().map(|record| record.message.as_str()).collect()
            }
        }
    }

    #[must_use]
    pub fn action(&self) -> Option<&SimulatedAction> {
        match self {
            Outcome::Simulated { action, .. } => Some(action),
            _ => None,
        }
    }
}

/// Record emitted for every log that reaches a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeRecord {
    pub event_id: EventId,
    pub block_number: u64,
    pub outcome: Outcome,
}

impl fmt::Display for OutcomeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at block {}: {}", self.event_id, self.block_number, self.outcome.tag())?;
        match &self.outcome {
            Outcome::Dropped { reason } => write!(f, " ({reason})"),
            Outcome::Rejected { validation } => {
                write!(f, " ({})", validation.rejection_reason().unwrap_or("no reason"))
            }
            Outcome::Simulated { action, .. } => write!(f, " ({})", action.description),
        }
    }
}

pub(crate) trait TryStream {
    /// Sends `record` downstream, returning `false` once the receiver is gone.
    async fn try_stream(&self, record: OutcomeRecord) -> bool;
}

impl TryStream for mpsc::Sender<OutcomeRecord> {
    async fn try_stream(&self, record: OutcomeRecord) -> bool {
        trace!(event_id = %record.event_id, outcome = record.outcome.tag(), "Sending outcome");
        if let Err(err) = self.send(record).await {
            warn!(event_id = %err.0.event_id, "Outcome receiver closed, dropping listener");
            return false;
        }
        true
    }
}
