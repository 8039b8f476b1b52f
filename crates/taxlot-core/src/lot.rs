//! Lot type representing a surviving slice of a past buy.
//!
//! A [`Lot`] is created only by a buy and is only ever reduced by FIFO
//! consumption during a replay. Fees paid on the buy are folded into the
//! per-share cost at creation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::period;
use crate::Transaction;

/// Shares still held from one buy.
///
/// # Examples
///
/// ```
/// use taxlot_core::{Lot, Transaction, TransactionKind};
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let buy = Transaction::new(
///     1,
///     TransactionKind::Buy,
///     "CEZ",
///     NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
///     dec!(50),
///     10,
/// )
/// .with_fees(dec!(20));
///
/// let lot = Lot::open(&buy);
/// assert_eq!(lot.effective_unit_cost, dec!(52));
/// assert_eq!(lot.book_value(), dec!(520));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lot {
    /// Instrument held
    pub instrument: String,
    /// Id of the buy that opened this lot
    pub source_id: i64,
    /// Insertion key of the opening buy
    pub sequence: u64,
    /// Date the shares were bought
    pub acquisition_date: NaiveDate,
    /// Cost per share including amortized buy fees
    pub effective_unit_cost: Decimal,
    /// Shares not yet consumed by sells
    pub remaining_quantity: u64,
}

impl Lot {
    /// Open a lot from a buy.
    ///
    /// The effective unit cost is `(unit_price * quantity + fees) / quantity`.
    #[must_use]
    pub fn open(buy: &Transaction) -> Self {
        let effective_unit_cost = if buy.quantity == 0 {
            buy.unit_price
        } else {
            (buy.gross_value() + buy.fees) / Decimal::from(buy.quantity)
        };

        Self {
            instrument: buy.instrument.clone(),
            source_id: buy.id,
            sequence: buy.sequence,
            acquisition_date: buy.date,
            effective_unit_cost,
            remaining_quantity: buy.quantity,
        }
    }

    /// Check if every share of this lot has been consumed.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// Total cost basis of the remaining shares.
    #[must_use]
    pub fn book_value(&self) -> Decimal {
        self.effective_unit_cost * Decimal::from(self.remaining_quantity)
    }

    /// Days held as of `anchor`.
    #[must_use]
    pub fn holding_days(&self, anchor: NaiveDate) -> i64 {
        period::holding_days(self.acquisition_date, anchor)
    }

    /// Whether this lot meets the exemption threshold at `anchor`.
    #[must_use]
    pub fn is_long_held(&self, anchor: NaiveDate, threshold_days: i64) -> bool {
        period::is_long_held(self.acquisition_date, anchor, threshold_days)
    }

    /// Ordering key for FIFO: acquisition date, then the opening buy's insertion key.
    #[must_use]
    pub const fn fifo_key(&self) -> (NaiveDate, u64) {
        (self.acquisition_date, self.sequence)
    }

    /// Take up to `quantity` shares, returning how many were taken.
    pub(crate) fn take(&mut self, quantity: u64) -> u64 {
        let taken = quantity.min(self.remaining_quantity);
        self.remaining_quantity -= taken;
        taken
    }
}

impl fmt::Display for Lot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {{{}, {}}}",
            self.remaining_quantity, self.instrument, self.effective_unit_cost, self.acquisition_date
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransactionKind;
    use rust_decimal_macros::dec;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn buy(quantity: u64, price: Decimal, fees: Decimal) -> Transaction {
        Transaction::new(1, TransactionKind::Buy, "CEZ", date(2023, 1, 1), price, quantity)
            .with_fees(fees)
    }

    #[test]
    fn test_fee_folding() {
        let lot = Lot::open(&buy(10, dec!(50), dec!(20)));
        assert_eq!(lot.effective_unit_cost, dec!(52.0));
        assert_eq!(lot.remaining_quantity, 10);
        assert_eq!(lot.acquisition_date, date(2023, 1, 1));
    }

    #[test]
    fn test_no_fees_keeps_price() {
        let lot = Lot::open(&buy(10, dec!(120), Decimal::ZERO));
        assert_eq!(lot.effective_unit_cost, dec!(120));
    }

    #[test]
    fn test_take() {
        let mut lot = Lot::open(&buy(10, dec!(100), dec!(10)));

        assert_eq!(lot.take(4), 4);
        assert_eq!(lot.remaining_quantity, 6);
        assert_eq!(lot.book_value(), dec!(606));

        // Over-take is capped at what remains
        assert_eq!(lot.take(20), 6);
        assert!(lot.is_depleted());
    }

    #[test]
    fn test_holding_period() {
        let lot = Lot::open(&buy(1, dec!(1), Decimal::ZERO));
        assert_eq!(lot.holding_days(date(2023, 1, 31)), 30);
        // 2023-01-01 + 1095 days (2024 is a leap year) = 2025-12-31
        assert!(lot.is_long_held(date(2025, 12, 31), 1095));
        assert!(!lot.is_long_held(date(2025, 12, 30), 1095));
    }

    #[test]
    fn test_display() {
        let lot = Lot::open(&buy(5, dec!(120), Decimal::ZERO));
        assert_eq!(format!("{lot}"), "5 CEZ {120, 2023-01-01}");
    }
}
