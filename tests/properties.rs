mod common;

use alloy::primitives::U256;
use bridge_listener::{
    Check, OracleError, Outcome, assert_next, assert_outcome_sequence,
    test_utils::{MockOracle, malformed_log, tokens_locked_log},
};
use rust_decimal::Decimal;

use crate::common::{ONE_ETHER, SOURCE_CONTRACT, setup};

#[tokio::test]
async fn amounts_below_minimum_fail_threshold_check() -> anyhow::Result<()> {
    let oracle = MockOracle::price(Decimal::from(2000));
    let (mut orchestrator, source) = setup(100, oracle.clone()).await?;
    let mut stream = orchestrator.subscribe();

    let amounts = [1, 1_000, ONE_ETHER / 10, ONE_ETHER - 1];
    for (index, amount) in amounts.iter().enumerate() {
        source.push_log(tokens_locked_log(SOURCE_CONTRACT, 101, index as u64, *amount, index as u64));
    }
    source.set_head(101);
    orchestrator.tick().await?;

    for _ in amounts {
        match assert_next!(stream).outcome {
            Outcome::Rejected { validation } => {
                assert_eq!(validation.failed_check(), Some(Check::MinimumAmount));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }
    assert_eq!(oracle.calls(), 0);

    Ok(())
}

#[tokio::test]
async fn accepted_actions_carry_source_nonce() -> anyhow::Result<()> {
    let (mut orchestrator, source) = setup(100, MockOracle::price(Decimal::from(1000))).await?;
    let mut stream = orchestrator.subscribe();

    let nonces = [0, 1, 123, u64::MAX];
    for (index, nonce) in nonces.iter().enumerate() {
        source.push_log(tokens_locked_log(SOURCE_CONTRACT, 101, index as u64, 2 * ONE_ETHER, *nonce));
    }
    source.set_head(101);
    orchestrator.tick().await?;

    for nonce in nonces {
        let record = assert_next!(stream);
        let action = record.outcome.action().expect("simulated outcome");
        assert_eq!(action.source_nonce, U256::from(nonce));
    }

    Ok(())
}

#[tokio::test]
async fn repeated_log_across_ticks_is_processed_once() -> anyhow::Result<()> {
    let oracle = MockOracle::price(Decimal::from(2000));
    let (mut orchestrator, source) = setup(100, oracle.clone()).await?;
    let mut stream = orchestrator.subscribe();
    let log = tokens_locked_log(SOURCE_CONTRACT, 101, 0, 5 * ONE_ETHER, 9);

    source.push_log(log.clone());
    source.set_head(101);
    orchestrator.tick().await?;

    // Same log re-observed in a later block range.
    let mut replayed = log;
    replayed.block_number = 102;
    source.push_log(replayed);
    source.set_head(102);
    let summary = orchestrator.tick().await?;

    assert_eq!(summary.duplicates, 1);
    assert_eq!(orchestrator.processed_count(), 1);
    assert_eq!(oracle.calls(), 1);
    assert_eq!(assert_next!(stream).outcome.tag(), "simulated");
    bridge_listener::assert_empty!(stream);

    Ok(())
}

#[tokio::test]
async fn dropped_logs_are_not_reprocessed() -> anyhow::Result<()> {
    let (mut orchestrator, source) = setup(100, MockOracle::price(Decimal::from(2000))).await?;
    let mut stream = orchestrator.subscribe();
    let log = malformed_log(SOURCE_CONTRACT, 101, 0);

    source.push_log(log.clone());
    source.set_head(101);
    orchestrator.tick().await?;
    let mut replayed = log;
    replayed.block_number = 103;
    source.push_log(replayed);
    source.set_head(103);
    orchestrator.tick().await?;

    assert_eq!(assert_next!(stream).outcome.tag(), "dropped");
    bridge_listener::assert_empty!(stream);

    Ok(())
}

#[tokio::test]
async fn cursor_equals_highest_head_seen() -> anyhow::Result<()> {
    let (mut orchestrator, source) = setup(50, MockOracle::price(Decimal::from(2000))).await?;

    let heads = [50, 51, 60, 55, 60, 75];
    for head in heads {
        source.set_head(head);
        orchestrator.tick().await?;
        assert!(orchestrator.cursor() >= 50);
    }

    assert_eq!(orchestrator.cursor(), 75);
    assert_eq!(source.log_queries(), vec![51..=51, 52..=60, 61..=75]);

    Ok(())
}

#[tokio::test]
async fn oracle_failure_never_simulates() -> anyhow::Result<()> {
    let oracle = MockOracle::failing(OracleError("unexpected status 429".to_string()));
    let (mut orchestrator, source) = setup(100, oracle.clone()).await?;
    let mut stream = orchestrator.subscribe();

    for index in 0..3 {
        source.push_log(tokens_locked_log(SOURCE_CONTRACT, 101, index, 5 * ONE_ETHER, index));
    }
    source.set_head(101);
    let summary = orchestrator.tick().await?;

    assert_eq!((summary.rejected, summary.simulated), (3, 0));
    let records = assert_outcome_sequence!(stream, ["rejected", "rejected", "rejected"]);
    for record in records {
        let Outcome::Rejected { validation } = &record.outcome else {
            panic!("expected rejection, got {record}");
        };
        assert_eq!(validation.failed_check(), Some(Check::PriceReference));
    }
    assert_eq!(oracle.calls(), 3);

    Ok(())
}

#[tokio::test]
async fn events_are_processed_in_chain_order() -> anyhow::Result<()> {
    let (mut orchestrator, source) = setup(100, MockOracle::price(Decimal::from(2000))).await?;
    let mut stream = orchestrator.subscribe();

    source.push_log(tokens_locked_log(SOURCE_CONTRACT, 103, 0, 5 * ONE_ETHER, 3));
    source.push_log(tokens_locked_log(SOURCE_CONTRACT, 101, 5, 5 * ONE_ETHER, 2));
    source.push_log(tokens_locked_log(SOURCE_CONTRACT, 101, 1, 5 * ONE_ETHER, 1));
    source.set_head(103);
    orchestrator.tick().await?;

    let records = assert_outcome_sequence!(stream, ["simulated", "simulated", "simulated"]);
    let positions: Vec<_> =
        records.iter().map(|r| (r.block_number, r.event_id.log_index)).collect();
    assert_eq!(positions, vec![(101, 1), (101, 5), (103, 0)]);

    Ok(())
}
