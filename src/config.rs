//! Listener configuration.
//!
//! A [`BridgeConfig`] is captured once at startup, either from a YAML/JSON file
//! ([`BridgeConfig::from_file`]) or from environment variables ([`BridgeConfig::from_env`],
//! which also honours a `.env` file), and is immutable afterwards.

use std::{collections::HashMap, fmt, path::Path, str::FromStr, time::Duration};

use alloy::primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{self, Unexpected, Visitor},
};

use crate::{
    action::ActionSimulator,
    chain::{
        ChainConfig, DEFAULT_CALL_TIMEOUT, DEFAULT_MAX_RETRIES, DEFAULT_MIN_DELAY,
        RpcChainHandleBuilder,
    },
    error::{ConfigError, OracleError},
    event::BridgeEvent,
    oracle::{DEFAULT_ORACLE_TIMEOUT, DEFAULT_ORACLE_URL, HttpPriceOracle},
    poller::DEFAULT_MAX_BLOCK_RANGE,
    validation::ValidationPolicy,
};

/// Event consumed when none is configured.
pub const DEFAULT_EVENT: &str = "TokensLocked";
/// Seconds between polling ticks when none is configured.
pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 12;
/// 0.01 tokens with 18 decimals.
pub const DEFAULT_MIN_AMOUNT: U256 = U256::from_limbs([10_000_000_000_000_000, 0, 0, 0]);

const PLACEHOLDER_MARKERS: [&str; 2] = ["your_infura_id", "your_project_id"];

/// Everything the listener needs to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub source: ChainConfig,
    pub destination: ChainConfig,
    /// Name of the source event to listen for.
    #[serde(default = "default_event")]
    pub event: String,
    #[serde(default = "default_polling_interval_secs")]
    pub polling_interval_secs: u64,
    /// Address the simulated destination mint would be sent from.
    pub validator_address: Address,
    /// Smallest accepted transfer, in base units.
    #[serde(default = "default_min_amount", deserialize_with = "deserialize_u256")]
    pub min_amount: U256,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub rpc: RpcConfig,
}

/// Price reference settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub base_url: String,
    /// Oracle id of the bridged asset.
    pub asset_id: String,
    /// Quote currency prices are expressed in.
    pub quote: String,
    pub min_price: Decimal,
    pub max_price: Option<Decimal>,
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ORACLE_URL.to_string(),
            asset_id: "ethereum".to_string(),
            quote: "usd".to_string(),
            min_price: Decimal::from(1000),
            max_price: None,
            timeout_secs: DEFAULT_ORACLE_TIMEOUT.as_secs(),
        }
    }
}

/// Chain RPC tuning, shared by both chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub call_timeout_secs: u64,
    pub max_retries: usize,
    pub min_delay_ms: u64,
    /// Largest block span requested by one `eth_getLogs` call.
    pub max_block_range: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: DEFAULT_CALL_TIMEOUT.as_secs(),
            max_retries: DEFAULT_MAX_RETRIES,
            min_delay_ms: u64::try_from(DEFAULT_MIN_DELAY.as_millis()).unwrap_or(u64::MAX),
            max_block_range: DEFAULT_MAX_BLOCK_RANGE,
        }
    }
}

fn default_event() -> String {
    DEFAULT_EVENT.to_string()
}

fn default_polling_interval_secs() -> u64 {
    DEFAULT_POLLING_INTERVAL_SECS
}

fn default_min_amount() -> U256 {
    DEFAULT_MIN_AMOUNT
}

/// Accepts amounts as JSON/YAML integers or as decimal/`0x` strings.
///
/// YAML integers up to `u128::MAX` are read exactly. JSON parsers hand anything above
/// `u64::MAX` over as a float, so such amounts have to be quoted in JSON files.
fn deserialize_u256<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
    deserializer.deserialize_any(AmountVisitor)
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = U256;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a non-negative integer amount or a decimal/0x string")
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<U256, E> {
        Ok(U256::from(value))
    }

    fn visit_u128<E: de::Error>(self, value: u128) -> Result<U256, E> {
        Ok(U256::from(value))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<U256, E> {
        u64::try_from(value)
            .map(U256::from)
            .map_err(|_| E::invalid_value(Unexpected::Signed(value), &self))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<U256, E> {
        Err(E::custom(format!("{value} is not an exact amount, quote large amounts as strings")))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<U256, E> {
        U256::from_str(value.trim()).map_err(E::custom)
    }
}

impl BridgeConfig {
    /// Reads a config file. Files ending in `.json` are parsed as JSON, anything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json")) {
            serde_json::from_str(&contents)?
        } else {
            serde_yaml::from_str(&contents)?
        };
        debug!(path = %path.display(), "Loaded config file");
        Ok(config)
    }

    /// Reads the process environment, after loading a `.env` file if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenv::dotenv() {
            debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_vars(&std::env::vars().collect())
    }

    /// Builds a config from a variable map using the same keys as [`from_env`](Self::from_env).
    ///
    /// `SOURCE_RPC`, `SOURCE_BRIDGE_CONTRACT`, `DEST_RPC`, `DEST_BRIDGE_CONTRACT` and
    /// `VALIDATOR_ADDRESS` are required; everything else has a default.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = OracleConfig::default();

        Ok(Self {
            source: ChainConfig {
                chain_id: optional(vars, "SOURCE_CHAIN_ID")?.unwrap_or(5),
                rpc_url: required(vars, "SOURCE_RPC")?,
                bridge_contract: required(vars, "SOURCE_BRIDGE_CONTRACT")?,
                proof_of_authority: optional(vars, "SOURCE_POA")?.unwrap_or(true),
            },
            destination: ChainConfig {
                chain_id: optional(vars, "DEST_CHAIN_ID")?.unwrap_or(80001),
                rpc_url: required(vars, "DEST_RPC")?,
                bridge_contract: required(vars, "DEST_BRIDGE_CONTRACT")?,
                proof_of_authority: optional(vars, "DEST_POA")?.unwrap_or(true),
            },
            event: optional(vars, "EVENT_TO_LISTEN")?.unwrap_or_else(default_event),
            polling_interval_secs: optional(vars, "POLLING_INTERVAL")?
                .unwrap_or(DEFAULT_POLLING_INTERVAL_SECS),
            validator_address: required(vars, "VALIDATOR_ADDRESS")?,
            min_amount: optional(vars, "MIN_TRANSFER_AMOUNT")?.unwrap_or(DEFAULT_MIN_AMOUNT),
            oracle: OracleConfig {
                base_url: optional(vars, "ORACLE_URL")?.unwrap_or(defaults.base_url),
                asset_id: optional(vars, "ORACLE_ASSET")?.unwrap_or(defaults.asset_id),
                quote: optional(vars, "ORACLE_QUOTE")?.unwrap_or(defaults.quote),
                min_price: optional(vars, "ORACLE_MIN_PRICE")?.unwrap_or(defaults.min_price),
                max_price: optional(vars, "ORACLE_MAX_PRICE")?,
                timeout_secs: defaults.timeout_secs,
            },
            rpc: RpcConfig::default(),
        })
    }

    /// Checks values serde cannot express as types.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event != DEFAULT_EVENT {
            return Err(invalid(
                "event",
                format!("unsupported event {}, only {} is handled", self.event, BridgeEvent::SIGNATURE),
            ));
        }
        if self.polling_interval_secs == 0 {
            return Err(invalid("polling_interval_secs", "must be greater than zero"));
        }
        for (key, chain) in [("source.rpc_url", &self.source), ("destination.rpc_url", &self.destination)] {
            if chain.rpc_url.trim().is_empty() {
                return Err(invalid(key, "must not be empty"));
            }
            if PLACEHOLDER_MARKERS.iter().any(|marker| chain.rpc_url.contains(marker)) {
                return Err(invalid(key, format!("{} still contains a placeholder", chain.rpc_url)));
            }
        }
        if self.source.chain_id == self.destination.chain_id {
            return Err(invalid("destination.chain_id", "must differ from source.chain_id"));
        }
        if self.validator_address == Address::ZERO {
            return Err(invalid("validator_address", "must not be the zero address"));
        }
        if let Some(max) = self.oracle.max_price
            && max < self.oracle.min_price
        {
            return Err(invalid(
                "oracle.max_price",
                format!("{max} is below oracle.min_price {}", self.oracle.min_price),
            ));
        }
        if self.oracle.timeout_secs == 0 {
            return Err(invalid("oracle.timeout_secs", "must be greater than zero"));
        }
        if self.rpc.max_block_range == 0 {
            return Err(invalid("rpc.max_block_range", "must be greater than zero"));
        }
        Ok(())
    }

    #[must_use]
    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    #[must_use]
    pub fn validation_policy(&self) -> ValidationPolicy {
        ValidationPolicy {
            min_amount: self.min_amount,
            asset: self.oracle.asset_id.clone(),
            min_price: self.oracle.min_price,
            max_price: self.oracle.max_price,
        }
    }

    #[must_use]
    pub fn action_simulator(&self) -> ActionSimulator {
        ActionSimulator::new(&self.destination)
    }

    /// Handle builder for `chain`, tuned by the `rpc` section.
    #[must_use]
    pub fn chain_builder(&self, chain: &ChainConfig) -> RpcChainHandleBuilder {
        RpcChainHandleBuilder::new(chain.clone())
            .call_timeout(Duration::from_secs(self.rpc.call_timeout_secs))
            .max_retries(self.rpc.max_retries)
            .min_delay(Duration::from_millis(self.rpc.min_delay_ms))
    }

    pub fn price_oracle(&self) -> Result<HttpPriceOracle, OracleError> {
        HttpPriceOracle::new(
            self.oracle.base_url.clone(),
            self.oracle.quote.clone(),
            Duration::from_secs(self.oracle.timeout_secs),
        )
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue { key, reason: reason.into() }
}

fn optional<T>(vars: &HashMap<String, String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match vars.get(key).map(|value| value.trim()).filter(|value| !value.is_empty()) {
        Some(value) => value.parse().map(Some).map_err(|err| invalid(key, format!("{value}: {err}"))),
        None => Ok(None),
    }
}

fn required<T>(vars: &HashMap<String, String>, key: &'static str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional(vars, key)?.ok_or_else(|| invalid(key, "missing"))
}
