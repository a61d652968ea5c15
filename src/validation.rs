//! Ordered accept/reject checks for decoded bridge events.
//!
//! The pipeline always runs the same three checks in the same order and stops at the first
//! failure:
//!
//! 1. [`Check::Shape`]: amount is positive, sender and recipient are non-zero addresses.
//! 2. [`Check::MinimumAmount`]: amount is at least the configured minimum.
//! 3. [`Check::PriceReference`]: the oracle price of the bridged asset lies within the
//!    configured bounds. An oracle that cannot answer fails the check; the pipeline never
//!    approves a transfer on missing data.

use std::fmt;

use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;

use crate::{event::BridgeEvent, oracle::PriceOracle};

/// The individual checks, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Check {
    Shape,
    MinimumAmount,
    PriceReference,
}

impl Check {
    /// Stable name used in logs and outcome records.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Check::Shape => "shape",
            Check::MinimumAmount => "minimum_amount",
            Check::PriceReference => "price_reference",
        }
    }
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRecord {
    pub check: Check,
    pub passed: bool,
    pub message: String,
}

impl CheckRecord {
    fn pass(check: Check, message: impl Into<String>) -> Self {
        Self { check, passed: true, message: message.into() }
    }

    fn fail(check: Check, message: impl Into<String>) -> Self {
        Self { check, passed: false, message: message.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
}

/// Verdict plus the records of every check that ran.
///
/// On rejection the last record is the failing check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub verdict: Verdict,
    pub records: Vec<CheckRecord>,
}

impl ValidationOutcome {
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.verdict == Verdict::Accept
    }

    /// The check that caused a rejection.
    #[must_use]
    pub fn failed_check(&self) -> Option<Check> {
        self.records.iter().find(|record| !record.passed).map(|record| record.check)
    }

    /// Message of the failing check, or `None` when accepted.
    #[must_use]
    pub fn rejection_reason(&self) -> Option<&str> {
        self.records.iter().find(|record| !record.passed).map(|record| record.message.as_str())
    }
}

/// Thresholds applied by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationPolicy {
    /// Smallest accepted amount, in base units.
    pub min_amount: U256,
    /// Oracle asset id of the bridged token (e.g. `ethereum`).
    pub asset: String,
    /// Lowest acceptable reference price.
    pub min_price: Decimal,
    /// Highest acceptable reference price, if bounded above.
    pub max_price: Option<Decimal>,
}

/// Runs the fixed sequence of checks against a [`PriceOracle`].
#[derive(Debug, Clone)]
pub struct ValidationPipeline<O> {
    policy: ValidationPolicy,
    oracle: O,
}

impl<O: PriceOracle> ValidationPipeline<O> {
    #[must_use]
    pub fn new(policy: ValidationPolicy, oracle: O) -> Self {
        Self { policy, oracle }
    }

    #[must_use]
    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    #[must_use]
    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Validates `event`, short-circuiting on the first failing check.
    pub async fn validate(&self, event: &BridgeEvent) -> ValidationOutcome {
        let mut records = Vec::with_capacity(3);

        for check in [Check::Shape, Check::MinimumAmount, Check::PriceReference] {
            let record = match check {
                Check::Shape => self.check_shape(event),
                Check::MinimumAmount => self.check_minimum_amount(event),
                Check::PriceReference => self.check_price().await,
            };
            let passed = record.passed;

            if passed {
                debug!(event_id = %event.id(), check = %check, message = %record.message, "Check passed");
            } else {
                warn!(event_id = %event.id(), check = %check, message = %record.message, "Check failed");
            }
            records.push(record);

            if !passed {
                return ValidationOutcome { verdict: Verdict::Reject, records };
            }
        }

        ValidationOutcome { verdict: Verdict::Accept, records }
    }

    fn check_shape(&self, event: &BridgeEvent) -> CheckRecord {
        if event.amount.is_zero() {
            return CheckRecord::fail(Check::Shape, "amount must be greater than zero");
        }
        if event.sender == Address::ZERO {
            return CheckRecord::fail(Check::Shape, "sender is the zero address");
        }
        if event.recipient == Address::ZERO {
            return CheckRecord::fail(Check::Shape, "recipient is the zero address");
        }
        CheckRecord::pass(
            Check::Shape,
            format!("amount {} from {} to {}", event.amount, event.sender, event.recipient),
        )
    }

    fn check_minimum_amount(&self, event: &BridgeEvent) -> CheckRecord {
        let min = self.policy.min_amount;
        if event.amount < min {
            CheckRecord::fail(
                Check::MinimumAmount,
                format!("amount {} is below threshold {min}", event.amount),
            )
        } else {
            CheckRecord::pass(
                Check::MinimumAmount,
                format!("amount {} meets threshold {min}", event.amount),
            )
        }
    }

    async fn check_price(&self) -> CheckRecord {
        let asset = &self.policy.asset;
        let price = match self.oracle.get_price(asset).await {
            Ok(price) => price,
            Err(err) => {
                return CheckRecord::fail(
                    Check::PriceReference,
                    format!("price reference unavailable for {asset}: {err}"),
                );
            }
        };

        if price < self.policy.min_price {
            return CheckRecord::fail(
                Check::PriceReference,
                format!("{asset} price {price} is below {}", self.policy.min_price),
            );
        }
        if let Some(max) = self.policy.max_price
            && price > max
        {
            return CheckRecord::fail(
                Check::PriceReference,
                format!("{asset} price {price} is above {max}"),
            );
        }

        CheckRecord::pass(Check::PriceReference, format!("{asset} price {price} within bounds"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::OracleError, test_utils::MockOracle};
    use alloy::primitives::{B256, address};

    fn policy() -> ValidationPolicy {
        ValidationPolicy {
            min_amount: U256::from(1_000),
            asset: "ethereum".to_string(),
            min_price: Decimal::from(1000),
            max_price: Some(Decimal::from(3000)),
        }
    }

    fn event(amount: u64) -> BridgeEvent {
        BridgeEvent {
            source_chain_id: 5,
            sender: address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
            recipient: address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"),
            amount: U256::from(amount),
            transaction_hash: B256::with_last_byte(1),
            nonce: U256::from(7),
            block_number: 10,
            log_index: 0,
        }
    }

    #[tokio::test]
    async fn accepts_and_records_every_check() {
        let pipeline = ValidationPipeline::new(policy(), MockOracle::price(Decimal::new(15805, 1)));

        let outcome = pipeline.validate(&event(5_000)).await;

        assert!(outcome.is_accepted());
        let checks: Vec<_> = outcome.records.iter().map(|r| r.check).collect();
        assert_eq!(checks, vec![Check::Shape, Check::MinimumAmount, Check::PriceReference]);
        assert!(outcome.records.iter().all(|r| r.passed));
        assert_eq!(outcome.failed_check(), None);
    }

    #[tokio::test]
    async fn zero_amount_fails_shape_check() {
        let oracle = MockOracle::price(Decimal::from(2000));
        let pipeline = ValidationPipeline::new(policy(), oracle.clone());

        let outcome = pipeline.validate(&event(0)).await;

        assert_eq!(outcome.verdict, Verdict::Reject);
        assert_eq!(outcome.failed_check(), Some(Check::Shape));
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn zero_recipient_fails_shape_check() {
        let pipeline = ValidationPipeline::new(policy(), MockOracle::price(Decimal::from(2000)));
        let mut event = event(5_000);
        event.recipient = Address::ZERO;

        let outcome = pipeline.validate(&event).await;

        assert_eq!(outcome.failed_check(), Some(Check::Shape));
        assert_eq!(outcome.rejection_reason(), Some("recipient is the zero address"));
    }

    #[tokio::test]
    async fn below_minimum_short_circuits_before_oracle() {
        let oracle = MockOracle::price(Decimal::from(2000));
        let pipeline = ValidationPipeline::new(policy(), oracle.clone());

        let outcome = pipeline.validate(&event(999)).await;

        assert_eq!(outcome.failed_check(), Some(Check::MinimumAmount));
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn amount_equal_to_minimum_passes_threshold() {
        let pipeline = ValidationPipeline::new(policy(), MockOracle::price(Decimal::from(2000)));

        let outcome = pipeline.validate(&event(1_000)).await;

        assert!(outcome.is_accepted());
    }

    #[tokio::test]
    async fn price_below_bound_rejects() {
        let pipeline = ValidationPipeline::new(policy(), MockOracle::price(Decimal::from(999)));

        let outcome = pipeline.validate(&event(5_000)).await;

        assert_eq!(outcome.failed_check(), Some(Check::PriceReference));
    }

    #[tokio::test]
    async fn price_above_bound_rejects() {
        let pipeline = ValidationPipeline::new(policy(), MockOracle::price(Decimal::from(3001)));

        let outcome = pipeline.validate(&event(5_000)).await;

        assert_eq!(outcome.failed_check(), Some(Check::PriceReference));
    }

    #[tokio::test]
    async fn unbounded_maximum_accepts_high_prices() {
        let mut policy = policy();
        policy.max_price = None;
        let pipeline = ValidationPipeline::new(policy, MockOracle::price(Decimal::from(1_000_000)));

        assert!(pipeline.validate(&event(5_000)).await.is_accepted());
    }

    #[tokio::test]
    async fn oracle_failure_fails_closed() {
        let oracle = MockOracle::failing(OracleError("rate limited".to_string()));
        let pipeline = ValidationPipeline::new(policy(), oracle.clone());

        let outcome = pipeline.validate(&event(5_000)).await;

        assert_eq!(outcome.verdict, Verdict::Reject);
        assert_eq!(outcome.failed_check(), Some(Check::PriceReference));
        assert!(outcome.rejection_reason().unwrap().contains("rate limited"));
        assert_eq!(oracle.calls(), 1);
    }
}
