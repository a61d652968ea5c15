use alloy::transports::{RpcError, TransportErrorKind};
use thiserror::Error;

/// Errors raised while talking to a chain's JSON-RPC endpoint.
///
/// The variant tells the caller whether retrying can help: a [`ConnectionError::Transient`]
/// failure is expected to clear up on its own (the orchestrator retries it on the next tick),
/// a [`ConnectionError::Fatal`] one points at misconfiguration and aborts startup.
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// Network failure, server-side error or timeout.
    #[error("transient RPC failure on chain {chain_id}: {reason}")]
    Transient { chain_id: u64, reason: String },

    /// Bad endpoint, rejected credentials, wrong chain or malformed responses.
    #[error("fatal RPC failure on chain {chain_id}: {reason}")]
    Fatal { chain_id: u64, reason: String },
}

impl ConnectionError {
    /// Builds a [`ConnectionError::Transient`].
    pub fn transient(chain_id: u64, reason: impl Into<String>) -> Self {
        ConnectionError::Transient { chain_id, reason: reason.into() }
    }

    /// Builds a [`ConnectionError::Fatal`].
    pub fn fatal(chain_id: u64, reason: impl Into<String>) -> Self {
        ConnectionError::Fatal { chain_id, reason: reason.into() }
    }

    /// Returns `true` if the failure may succeed when retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, ConnectionError::Transient { .. })
    }

    /// Returns the chain the failure was observed on.
    #[must_use]
    pub fn chain_id(&self) -> u64 {
        match self {
            ConnectionError::Transient { chain_id, .. } | ConnectionError::Fatal { chain_id, .. } => {
                *chain_id
            }
        }
    }

    /// Classifies an alloy transport error.
    ///
    /// Transport-level failures (connection refused, backend gone) and 5xx/429 responses are
    /// transient. Authentication failures, other HTTP errors and undecodable responses are
    /// fatal.
    pub(crate) fn from_rpc(chain_id: u64, error: &RpcError<TransportErrorKind>) -> Self {
        let reason = error.to_string();
        match error {
            RpcError::Transport(TransportErrorKind::HttpError(http)) => {
                if http.status == 429 || http.status >= 500 {
                    ConnectionError::transient(chain_id, reason)
                } else {
                    ConnectionError::fatal(chain_id, reason)
                }
            }
            RpcError::Transport(_) | RpcError::ErrorResp(_) | RpcError::NullResp => {
                ConnectionError::transient(chain_id, reason)
            }
            _ => ConnectionError::fatal(chain_id, reason),
        }
    }
}

/// A log whose topics or data do not match the expected `TokensLocked` shape.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("log has no topics")]
    MissingSignature,

    #[error("unexpected event signature {0}")]
    SignatureMismatch(String),

    #[error("log is missing {0}")]
    MissingField(&'static str),

    #[error("malformed event arguments: {0}")]
    Malformed(String),
}

/// The price reference could not be obtained.
///
/// Network failures, non-2xx responses and unparsable payloads are all reported through this
/// single type; the validation pipeline treats every one of them as a failed check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("price oracle error: {0}")]
pub struct OracleError(pub String);

impl From<reqwest::Error> for OracleError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            OracleError(format!("request timed out: {error}"))
        } else {
            OracleError(error.to_string())
        }
    }
}

/// Invalid or incomplete configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(error: serde_yaml::Error) -> Self {
        ConfigError::Parse(error.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(error: serde_json::Error) -> Self {
        ConfigError::Parse(error.to_string())
    }
}

/// Errors that stop the listener from starting.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}
