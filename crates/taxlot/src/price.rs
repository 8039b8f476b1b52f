//! Market price sources.
//!
//! Quotes come from Yahoo Finance's chart endpoint. Instruments are assumed
//! to trade on the Prague exchange, so a bare name is queried with the
//! `.PR` suffix unless an explicit symbol mapping says otherwise.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use taxlot_core::PriceLookup;
use tracing::debug;

/// Suffix Yahoo Finance uses for Prague Stock Exchange listings.
pub const PRAGUE_SUFFIX: &str = ".PR";

/// Outcome of one price fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum PriceStatus {
    /// A current price was found.
    Available(Decimal),
    /// The source answered but had no price for the symbol.
    Unavailable,
    /// The fetch failed.
    Error(String),
}

impl PriceStatus {
    /// The price, if one was found.
    pub const fn price(&self) -> Option<Decimal> {
        match self {
            Self::Available(price) => Some(*price),
            _ => None,
        }
    }
}

/// Price source trait for different data providers.
pub trait PriceSource {
    /// Fetch the current price for a market symbol.
    fn fetch_price(&self, symbol: &str) -> Result<Option<Decimal>>;

    /// Source name.
    fn name(&self) -> &'static str;

    /// Fetch a symbol and classify the outcome.
    fn fetch_status(&self, symbol: &str) -> PriceStatus {
        match self.fetch_price(symbol) {
            Ok(Some(price)) => PriceStatus::Available(price),
            Ok(None) => PriceStatus::Unavailable,
            Err(e) => PriceStatus::Error(format!("{e:#}")),
        }
    }
}

/// Yahoo Finance price source.
#[derive(Debug, Clone, Default)]
pub struct YahooFinance;

impl YahooFinance {
    /// Create a new Yahoo Finance price source.
    pub const fn new() -> Self {
        Self
    }

    fn build_url(symbol: &str) -> String {
        format!("https://query1.finance.yahoo.com/v8/finance/chart/{symbol}?interval=1d&range=1d")
    }
}

impl PriceSource for YahooFinance {
    fn fetch_price(&self, symbol: &str) -> Result<Option<Decimal>> {
        let url = Self::build_url(symbol);
        debug!(%symbol, %url, "fetching price");

        let mut response = ureq::get(&url)
            .header("User-Agent", "Mozilla/5.0 (compatible; taxlot/0.1)")
            .call()
            .with_context(|| format!("Failed to fetch price for {symbol}"))?;

        let json: serde_json::Value = response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse response for {symbol}"))?;

        chart_price(&json)
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}

/// Extract the latest price from a chart API response.
///
/// Falls back to the previous close when the market price is missing.
pub fn chart_price(json: &serde_json::Value) -> Result<Option<Decimal>> {
    let meta = json
        .get("chart")
        .and_then(|c| c.get("result"))
        .and_then(|r| r.get(0))
        .and_then(|r| r.get("meta"));

    let price = meta.and_then(|m| {
        ["regularMarketPrice", "previousClose", "chartPreviousClose"]
            .iter()
            .find_map(|field| m.get(*field).and_then(serde_json::Value::as_f64))
            .filter(|p| *p > 0.0)
    });

    match price {
        Some(p) => {
            let decimal = Decimal::from_str(&format!("{p:.4}"))
                .with_context(|| format!("Failed to convert price {p} to decimal"))?;
            Ok(Some(decimal.normalize()))
        }
        None => Ok(None),
    }
}

/// The market symbol to query for an instrument.
///
/// An explicit mapping wins; otherwise the Prague suffix is appended unless
/// already present.
pub fn market_symbol(instrument: &str, mapping: &BTreeMap<String, String>) -> String {
    if let Some(symbol) = mapping.get(instrument) {
        return symbol.clone();
    }
    if instrument.ends_with(PRAGUE_SUFFIX) {
        instrument.to_string()
    } else {
        format!("{instrument}{PRAGUE_SUFFIX}")
    }
}

/// Parse `FROM:TO` mapping arguments.
pub fn parse_mappings(args: &[String]) -> Result<BTreeMap<String, String>> {
    args.iter()
        .map(|arg| {
            arg.split_once(':')
                .map(|(from, to)| (from.trim().to_string(), to.trim().to_string()))
                .filter(|(from, to)| !from.is_empty() && !to.is_empty())
                .with_context(|| format!("invalid symbol mapping '{arg}', expected FROM:TO"))
        })
        .collect()
}

/// Fixed instrument prices, as written by `taxlot-price --json`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceMap(BTreeMap<String, Decimal>);

impl PriceMap {
    /// Load a JSON object mapping instrument to price.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read prices {}", path.display()))?;
        let prices = serde_json::from_str(&content)
            .with_context(|| format!("invalid price file {}", path.display()))?;
        Ok(Self(prices))
    }

    /// Collect the available prices from fetch results.
    pub fn from_statuses<'a, I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = (&'a String, &'a PriceStatus)>,
    {
        Self(
            statuses
                .into_iter()
                .filter_map(|(instrument, status)| Some((instrument.clone(), status.price()?)))
                .collect(),
        )
    }

    /// The underlying map.
    pub const fn as_map(&self) -> &BTreeMap<String, Decimal> {
        &self.0
    }
}

impl PriceLookup for PriceMap {
    fn price(&self, instrument: &str) -> Option<Decimal> {
        self.0.price(instrument)
    }
}
