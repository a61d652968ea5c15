//! External price reference.
//!
//! The validation pipeline asks a [`PriceOracle`] for the current price of the bridged asset
//! before approving a transfer. [`HttpPriceOracle`] queries a CoinGecko-compatible
//! `simple/price` endpoint; any failure (network, timeout, non-2xx status, unexpected payload)
//! surfaces as a single [`OracleError`]. The client never retries.

use std::{str::FromStr, time::Duration};

use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::OracleError;

/// Public CoinGecko API root.
pub const DEFAULT_ORACLE_URL: &str = "https://api.coingecko.com/api/v3";
/// Default timeout for a price request.
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of a reference price for an asset.
pub trait PriceOracle {
    /// Current price of `asset` in the oracle's quote currency.
    fn get_price(&self, asset: &str) -> impl Future<Output = Result<Decimal, OracleError>> + Send;
}

/// [`PriceOracle`] backed by an HTTP `simple/price` endpoint.
#[derive(Clone, Debug)]
pub struct HttpPriceOracle {
    client: reqwest::Client,
    base_url: String,
    quote: String,
}

impl HttpPriceOracle {
    /// Creates a client for `base_url`, pricing assets in `quote` (e.g. `usd`).
    ///
    /// # Errors
    ///
    /// Returns an [`OracleError`] if the HTTP client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        quote: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            quote: quote.into(),
        })
    }

    #[must_use]
    pub fn quote(&self) -> &str {
        &self.quote
    }
}

impl PriceOracle for HttpPriceOracle {
    async fn get_price(&self, asset: &str) -> Result<Decimal, OracleError> {
        let url = format!("{}/simple/price", self.base_url);
        debug!(url = %url, asset = asset, quote = %self.quote, "Requesting reference price");

        let response = self
            .client
            .get(&url)
            .query(&[("ids", asset), ("vs_currencies", self.quote.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleError(format!("unexpected status {status}")));
        }

        let body: Value = response.json().await?;
        parse_price(&body, asset, &self.quote)
    }
}

/// Extracts `body[asset][quote]` as a decimal.
///
/// Accepts both JSON numbers and numeric strings.
pub(crate) fn parse_price(body: &Value, asset: &str, quote: &str) -> Result<Decimal, OracleError> {
    let value = body
        .get(asset)
        .and_then(|prices| prices.get(quote))
        .ok_or_else(|| OracleError(format!("response has no {asset}/{quote} price")))?;

    let price = match value {
        Value::Number(number) => Decimal::from_str(&number.to_string())
            .or_else(|_| Decimal::from_scientific(&number.to_string())),
        Value::String(text) => Decimal::from_str(text),
        other => return Err(OracleError(format!("price is not numeric: {other}"))),
    };

    price.map_err(|err| OracleError(format!("unparsable price {value}: {err}")))
}
