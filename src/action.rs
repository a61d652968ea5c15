use std::fmt;

use alloy::{
    primitives::{Address, Bytes, U256},
    sol,
    sol_types::SolCall,
};

use crate::{chain::ChainConfig, event::BridgeEvent};

sol! {
    /// Destination bridge entry point a validator would call for an accepted lock.
    function mint(address to, uint256 amount, uint256 sourceNonce);
}

/// The destination-chain mint a validator would submit for one accepted event.
///
/// Nothing here is ever signed or broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedAction {
    pub destination_chain_id: u64,
    pub destination_contract: Address,
    pub recipient: Address,
    pub amount: U256,
    /// Nonce of the source event, unchanged.
    pub source_nonce: U256,
    pub validator: Address,
    /// ABI-encoded `mint(to, amount, sourceNonce)` call.
    pub calldata: Bytes,
    pub description: String,
}

impl fmt::Display for SimulatedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[SIMULATION] ACTION: MINT on chain {}", self.destination_chain_id)?;
        writeln!(f, "  - Contract: {}", self.destination_contract)?;
        writeln!(f, "  - To: {}", self.recipient)?;
        writeln!(f, "  - Amount: {} wei", self.amount)?;
        writeln!(f, "  - Source Nonce: {}", self.source_nonce)?;
        write!(f, "  - Validator: {}", self.validator)
    }
}

/// Builds [`SimulatedAction`]s for a fixed destination chain.
#[derive(Debug, Clone)]
pub struct ActionSimulator {
    destination_chain_id: u64,
    destination_contract: Address,
}

impl ActionSimulator {
    #[must_use]
    pub fn new(destination: &ChainConfig) -> Self {
        Self {
            destination_chain_id: destination.chain_id,
            destination_contract: destination.bridge_contract,
        }
    }

    /// Describes the mint `validator` would submit for `event`. Pure.
    #[must_use]
    pub fn simulate(&self, event: &BridgeEvent, validator: Address) -> SimulatedAction {
        let calldata = mintCall {
            to: event.recipient,
            amount: event.amount,
            sourceNonce: event.nonce,
        }
        .abi_encode();

        SimulatedAction {
            destination_chain_id: self.destination_chain_id,
            destination_contract: self.destination_contract,
            recipient: event.recipient,
            amount: event.amount,
            source_nonce: event.nonce,
            validator,
            calldata: calldata.into(),
            description: format!(
                "mint {} to {} on chain {} for nonce {} locked on chain {}",
                event.amount,
                event.recipient,
                self.destination_chain_id,
                event.nonce,
                event.source_chain_id
            ),
        }
    }
}
