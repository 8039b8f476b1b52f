//! Holdings aggregation.
//!
//! Rolls open lots up into one [`HoldingsSummary`] per instrument. The
//! long-holding view is anchored on an explicit evaluation date passed by
//! the caller, never on the current clock.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Lot, PriceLookup, TaxConfig};

/// Aggregated position in one instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingsSummary {
    /// Instrument held
    pub instrument: String,
    /// Shares held across all lots
    pub quantity: u64,
    /// Sum of lot cost bases
    pub total_cost: Decimal,
    /// `total_cost / quantity`
    pub average_cost: Decimal,
    /// Shares in lots meeting the exemption threshold at the evaluation date
    pub exempt_quantity: u64,
    /// Contributing lots, oldest first
    pub lots: Vec<Lot>,
}

impl HoldingsSummary {
    /// Cost basis of the exempt shares.
    #[must_use]
    pub fn exempt_cost(&self, as_of: NaiveDate, config: &TaxConfig) -> Decimal {
        self.lots
            .iter()
            .filter(|l| l.is_long_held(as_of, config.exemption_threshold_days))
            .map(Lot::book_value)
            .sum()
    }
}

/// A holding joined with its market price.
///
/// Every market-derived field is `None` when the price is unknown, or when
/// the price is too large for the value to be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingValuation {
    /// The underlying holding
    pub holding: HoldingsSummary,
    /// Current price per share
    pub market_price: Option<Decimal>,
    /// `market_price * quantity`
    pub market_value: Option<Decimal>,
    /// `market_value - total_cost`
    pub unrealized_gain: Option<Decimal>,
}

fn aggregate<'a, I>(lots: I, as_of: NaiveDate, config: &TaxConfig) -> Vec<HoldingsSummary>
where
    I: IntoIterator<Item = &'a Lot>,
{
    let mut by_instrument: BTreeMap<&str, Vec<&Lot>> = BTreeMap::new();
    for lot in lots {
        if !lot.is_depleted() {
            by_instrument
                .entry(lot.instrument.as_str())
                .or_default()
                .push(lot);
        }
    }

    by_instrument
        .into_iter()
        .map(|(instrument, mut group)| {
            group.sort_by_key(|l| l.fifo_key());

            let quantity: u64 = group.iter().map(|l| l.remaining_quantity).sum();
            let total_cost: Decimal = group.iter().map(|l| l.book_value()).sum();
            let exempt_quantity = group
                .iter()
                .filter(|l| l.is_long_held(as_of, config.exemption_threshold_days))
                .map(|l| l.remaining_quantity)
                .sum();

            HoldingsSummary {
                instrument: instrument.to_string(),
                quantity,
                total_cost,
                average_cost: total_cost / Decimal::from(quantity),
                exempt_quantity,
                lots: group.into_iter().cloned().collect(),
            }
        })
        .collect()
}

/// Aggregate open lots per instrument.
///
/// `as_of` only affects [`HoldingsSummary::exempt_quantity`]. Instruments
/// with no remaining shares are omitted.
pub fn summarize(lots: &[Lot], as_of: NaiveDate, config: &TaxConfig) -> Vec<HoldingsSummary> {
    aggregate(lots, as_of, config)
}

/// Aggregate only the lots held at least the exemption threshold on `as_of`.
pub fn exempt_holdings(lots: &[Lot], as_of: NaiveDate, config: &TaxConfig) -> Vec<HoldingsSummary> {
    let threshold = config.exemption_threshold_days;
    aggregate(
        lots.iter().filter(|l| l.is_long_held(as_of, threshold)),
        as_of,
        config,
    )
}

/// Join holdings with market prices.
pub fn value_holdings<P: PriceLookup>(
    holdings: &[HoldingsSummary],
    prices: &P,
) -> Vec<HoldingValuation> {
    holdings
        .iter()
        .map(|holding| {
            let market_price = prices.price(&holding.instrument);
            let market_value =
                market_price.and_then(|p| p.checked_mul(Decimal::from(holding.quantity)));
            HoldingValuation {
                holding: holding.clone(),
                market_price,
                market_value,
                unrealized_gain: market_value.and_then(|v| v.checked_sub(holding.total_cost)),
            }
        })
        .collect()
}

/// Total market value, or `None` if any holding lacks a value or the sum
/// overflows.
pub fn market_value_total(valuations: &[HoldingValuation]) -> Option<Decimal> {
    valuations
        .iter()
        .try_fold(Decimal::ZERO, |total, v| total.checked_add(v.market_value?))
}
