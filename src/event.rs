use std::fmt;

use alloy::{
    primitives::{Address, B256, U256},
    sol,
    sol_types::SolEvent,
};

use crate::{chain::RawLog, error::DecodeError};

sol! {
    /// Emitted by the source bridge contract when tokens are locked for bridging.
    #[derive(Debug, PartialEq, Eq)]
    event TokensLocked(address indexed from, address indexed to, uint256 amount, uint256 nonce);
}

/// Identity of a log: the transaction that emitted it and its position in the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId {
    pub transaction_hash: B256,
    pub log_index: u64,
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.transaction_hash, self.log_index)
    }
}

impl From<&RawLog> for EventId {
    fn from(log: &RawLog) -> Self {
        EventId { transaction_hash: log.transaction_hash, log_index: log.log_index }
    }
}

/// A decoded `TokensLocked` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeEvent {
    pub source_chain_id: u64,
    pub sender: Address,
    pub recipient: Address,
    /// Locked amount in base units.
    pub amount: U256,
    pub transaction_hash: B256,
    /// Per-source-chain sequence number, carried unchanged into the destination action.
    pub nonce: U256,
    pub block_number: u64,
    pub log_index: u64,
}

impl BridgeEvent {
    /// `topic0` of the event this listener consumes.
    pub const SIGNATURE_HASH: B256 = TokensLocked::SIGNATURE_HASH;
    /// Canonical signature of the event this listener consumes.
    pub const SIGNATURE: &'static str = TokensLocked::SIGNATURE;

    /// Decodes a raw log emitted on `source_chain_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the log is not a well-formed `TokensLocked` event.
    pub fn decode(log: &RawLog, source_chain_id: u64) -> Result<Self, DecodeError> {
        let Some(topic0) = log.topics.first() else {
            return Err(DecodeError::MissingSignature);
        };
        if *topic0 != Self::SIGNATURE_HASH {
            return Err(DecodeError::SignatureMismatch(topic0.to_string()));
        }
        match log.topics.len() {
            1 => return Err(DecodeError::MissingField("indexed sender")),
            2 => return Err(DecodeError::MissingField("indexed recipient")),
            3 => {}
            n => return Err(DecodeError::Malformed(format!("expected 3 topics, got {n}"))),
        }

        let decoded = TokensLocked::decode_raw_log(log.topics.iter().copied(), &log.data)
            .map_err(|err| DecodeError::Malformed(err.to_string()))?;

        Ok(BridgeEvent {
            source_chain_id,
            sender: decoded.from,
            recipient: decoded.to,
            amount: decoded.amount,
            transaction_hash: log.transaction_hash,
            nonce: decoded.nonce,
            block_number: log.block_number,
            log_index: log.log_index,
        })
    }

    #[must_use]
    pub fn id(&self) -> EventId {
        EventId { transaction_hash: self.transaction_hash, log_index: self.log_index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{Bytes, address};

    const FROM: Address = address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
    const TO: Address = address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");

    fn raw(topics: Vec<B256>, data: Bytes) -> RawLog {
        RawLog {
            block_number: 101,
            transaction_hash: B256::with_last_byte(0xab),
            log_index: 4,
            address: Address::ZERO,
            topics,
            data,
        }
    }

    fn locked(amount: u64, nonce: u64) -> RawLog {
        let event = TokensLocked {
            from: FROM,
            to: TO,
            amount: U256::from(amount),
            nonce: U256::from(nonce),
        };
        let data = event.encode_log_data();
        raw(data.topics().to_vec(), data.data)
    }

    #[test]
    fn decodes_tokens_locked() {
        let event = BridgeEvent::decode(&locked(5_000, 123), 5).unwrap();

        assert_eq!(event.source_chain_id, 5);
        assert_eq!(event.sender, FROM);
        assert_eq!(event.recipient, TO);
        assert_eq!(event.amount, U256::from(5_000));
        assert_eq!(event.nonce, U256::from(123));
        assert_eq!(event.block_number, 101);
        assert_eq!(event.id().log_index, 4);
    }

    #[test]
    fn rejects_missing_topics() {
        let log = raw(vec![], Bytes::new());
        assert_eq!(BridgeEvent::decode(&log, 5), Err(DecodeError::MissingSignature));
    }

    #[test]
    fn rejects_other_events() {
        let mut log = locked(1, 1);
        log.topics[0] = B256::repeat_byte(0x11);
        assert!(matches!(BridgeEvent::decode(&log, 5), Err(DecodeError::SignatureMismatch(_))));
    }

    #[test]
    fn rejects_missing_indexed_recipient() {
        let mut log = locked(1, 1);
        log.topics.truncate(2);
        assert_eq!(
            BridgeEvent::decode(&log, 5),
            Err(DecodeError::MissingField("indexed recipient"))
        );
    }

    #[test]
    fn rejects_truncated_data() {
        let mut log = locked(1, 1);
        log.data = Bytes::from(vec![0u8; 31]);
        assert!(matches!(BridgeEvent::decode(&log, 5), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn event_id_display() {
        let log = locked(1, 1);
        let id = EventId::from(&log);
        assert!(id.to_string().ends_with(":4"));
    }
}
