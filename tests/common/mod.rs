#![allow(dead_code)]

use alloy::primitives::{Address, U256, address};
use bridge_listener::{
    BridgeConfig, BridgeOrchestrator, ChainConfig, OracleConfig, RpcConfig,
    test_utils::{MockChain, MockOracle},
};
use rust_decimal::Decimal;

pub const SOURCE_CHAIN_ID: u64 = 5;
pub const DEST_CHAIN_ID: u64 = 80001;
pub const SOURCE_CONTRACT: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");
pub const DEST_CONTRACT: Address = address!("0xe7f1725E7734CE288F8367e1Bb143E90bb3F0512");
pub const VALIDATOR: Address = address!("0x90F79bf6EB2c4f870365E785982E1f101E93b906");
pub const ONE_ETHER: u128 = 1_000_000_000_000_000_000;

pub type MockOrchestrator = BridgeOrchestrator<MockChain, MockChain, MockOracle>;

/// Minimum of one token, price bounded to `[1000, 3000]`.
pub fn bridge_config() -> BridgeConfig {
    BridgeConfig {
        source: ChainConfig {
            chain_id: SOURCE_CHAIN_ID,
            rpc_url: "http://localhost:8545".to_string(),
            bridge_contract: SOURCE_CONTRACT,
            proof_of_authority: false,
        },
        destination: ChainConfig {
            chain_id: DEST_CHAIN_ID,
            rpc_url: "http://localhost:8546".to_string(),
            bridge_contract: DEST_CONTRACT,
            proof_of_authority: true,
        },
        event: "TokensLocked".to_string(),
        polling_interval_secs: 1,
        validator_address: VALIDATOR,
        min_amount: U256::from(ONE_ETHER),
        oracle: OracleConfig {
            min_price: Decimal::from(1000),
            max_price: Some(Decimal::from(3000)),
            ..OracleConfig::default()
        },
        rpc: RpcConfig::default(),
    }
}

/// Orchestrator over a source chain whose head is `head`.
pub async fn setup(head: u64, oracle: MockOracle) -> anyhow::Result<(MockOrchestrator, MockChain)> {
    let source = MockChain::new(SOURCE_CHAIN_ID, head);
    let destination = MockChain::new(DEST_CHAIN_ID, 0);
    let orchestrator =
        BridgeOrchestrator::new(&bridge_config(), source.clone(), destination, oracle).await?;
    Ok((orchestrator, source))
}
