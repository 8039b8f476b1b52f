//! Exemption apportionment of realized sales.
//!
//! Each sell's net value (`unit_price * quantity - fees`) is split between a
//! taxable and an exempt portion in proportion to how many of the sold shares
//! came from lots held for at least the exemption threshold on the sale date.
//! The split rides on the same [`replay`] walk as lot accounting, tagging each
//! draw with its age instead of discarding it.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{period, replay, Lot, LotConsumptionEvent, LotDraw, TaxConfig, Transaction};

/// A lot draw tagged with its age at the sale date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedDraw {
    /// The underlying draw
    pub draw: LotDraw,
    /// Days the shares were held when sold
    pub holding_days: i64,
    /// Whether the shares met the exemption threshold
    pub exempt: bool,
}

/// Taxable/exempt split of one sell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleApportionment {
    /// Id of the sell
    pub transaction_id: i64,
    /// Instrument sold
    pub instrument: String,
    /// Sale date
    pub date: NaiveDate,
    /// Shares sold
    pub quantity: u64,
    /// Proceeds after fees
    pub net_value: Decimal,
    /// Shares drawn from lots held at least the threshold
    pub exempt_quantity: u64,
    /// Shares drawn from younger lots, plus any shares no lot covered
    pub taxable_quantity: u64,
    /// Share of `net_value` attributed to taxable shares
    pub taxable_portion: Decimal,
    /// Share of `net_value` attributed to exempt shares
    pub exempt_portion: Decimal,
    /// Cost basis of the shares matched against lots
    pub cost_basis: Decimal,
    /// Lots consumed, oldest first
    pub draws: Vec<TaggedDraw>,
    /// Shares no lot covered (zero for a validated ledger)
    pub unfilled: u64,
}

impl SaleApportionment {
    /// Tag the draws of one consumption event and split its net value.
    ///
    /// Fees are not assigned to either bucket; they reduce the net value
    /// before it is split by share count.
    #[must_use]
    pub fn from_event(event: &LotConsumptionEvent<'_>, config: &TaxConfig) -> Self {
        let sale = event.sale;
        let threshold = config.exemption_threshold_days;

        let draws: Vec<TaggedDraw> = event
            .draws
            .iter()
            .map(|draw| TaggedDraw {
                draw: draw.clone(),
                holding_days: draw.holding_days(sale.date),
                exempt: period::is_long_held(draw.acquisition_date, sale.date, threshold),
            })
            .collect();

        let exempt_quantity: u64 = draws
            .iter()
            .filter(|d| d.exempt)
            .map(|d| d.draw.quantity)
            .sum();
        let taxable_quantity = sale.quantity - exempt_quantity.min(sale.quantity);

        let net_value = sale.net_value();
        let taxable_portion = if sale.quantity == 0 || taxable_quantity == sale.quantity {
            net_value
        } else {
            // Fraction first: the product never exceeds the net value.
            net_value * (Decimal::from(taxable_quantity) / Decimal::from(sale.quantity))
        };
        let exempt_portion = net_value - taxable_portion;

        Self {
            transaction_id: sale.id,
            instrument: sale.instrument.clone(),
            date: sale.date,
            quantity: sale.quantity,
            net_value,
            exempt_quantity,
            taxable_quantity,
            taxable_portion,
            exempt_portion,
            cost_basis: event.cost_basis(),
            draws,
            unfilled: event.unfilled,
        }
    }

    /// Tax year of the sale.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Net proceeds minus the cost basis of the matched shares.
    #[must_use]
    pub fn realized_gain(&self) -> Decimal {
        self.net_value - self.cost_basis
    }
}

/// Result of one apportioning replay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apportionment {
    /// Every sell in the snapshot, chronologically
    pub sales: Vec<SaleApportionment>,
    /// Lots left open after the replay
    pub lots: Vec<Lot>,
}

impl Apportionment {
    /// Sales falling in `year`.
    pub fn sales_in(&self, year: i32) -> impl Iterator<Item = &SaleApportionment> {
        self.sales.iter().filter(move |s| s.year() == year)
    }
}

/// Replay the snapshot once, apportioning every sell.
///
/// The surviving lots come from the same walk, so they are identical to
/// what [`crate::surviving_lots`] returns for the same input.
pub fn apportion(transactions: &[Transaction], config: &TaxConfig) -> Apportionment {
    let mut sales = Vec::new();
    let state = replay(transactions, |event| {
        sales.push(SaleApportionment::from_event(&event, config));
    });

    Apportionment {
        sales,
        lots: state.into_lots(),
    }
}

/// Apportion only the sells dated in `year`.
///
/// Earlier years are still replayed; they determine which lots are open.
pub fn apportion_year(
    transactions: &[Transaction],
    config: &TaxConfig,
    year: i32,
) -> Vec<SaleApportionment> {
    apportion(transactions, config)
        .sales
        .into_iter()
        .filter(|s| s.year() == year)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransactionKind;
    use rust_decimal_macros::dec;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn buy(id: i64, d: NaiveDate, quantity: u64) -> Transaction {
        Transaction::new(id, TransactionKind::Buy, "CEZ", d, dec!(100), quantity)
    }

    fn sell(id: i64, d: NaiveDate, quantity: u64, price: Decimal, fees: Decimal) -> Transaction {
        Transaction::new(id, TransactionKind::Sell, "CEZ", d, price, quantity).with_fees(fees)
    }

    #[test]
    fn test_all_young_is_fully_taxable() {
        let txns = vec![
            buy(1, date(2023, 1, 1), 10),
            sell(2, date(2024, 1, 1), 5, dec!(150), dec!(5)),
        ];

        let sales = apportion_year(&txns, &TaxConfig::default(), 2024);
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].net_value, dec!(745));
        assert_eq!(sales[0].taxable_portion, dec!(745));
        assert_eq!(sales[0].exempt_portion, Decimal::ZERO);
        assert_eq!(sales[0].draws[0].holding_days, 365);
    }

    #[test]
    fn test_mixed_ages_split_pro_rata() {
        // Lot 1 is four years old at the sale, lot 2 one year old
        let txns = vec![
            buy(1, date(2020, 1, 1), 6),
            buy(2, date(2023, 1, 1), 10),
            sell(3, date(2024, 1, 1), 10, dec!(100), dec!(20)),
        ];

        let sales = apportion_year(&txns, &TaxConfig::default(), 2024);
        let sale = &sales[0];
        assert_eq!(sale.exempt_quantity, 6);
        assert_eq!(sale.taxable_quantity, 4);
        // Net 980, fees split 60/40 with the shares
        assert_eq!(sale.exempt_portion, dec!(588));
        assert_eq!(sale.taxable_portion, dec!(392));
        assert_eq!(sale.taxable_portion + sale.exempt_portion, sale.net_value);
    }

    #[test]
    fn test_large_quantities_split_without_overflow() {
        let half = 5_000_000_000_000_000_000;
        let txns = vec![
            buy(1, date(2018, 1, 1), half),
            buy(2, date(2023, 1, 1), half),
            sell(3, date(2024, 1, 1), 2 * half, dec!(1), dec!(0)),
        ];

        let sale = &apportion(&txns, &TaxConfig::default()).sales[0];
        assert_eq!(sale.net_value, Decimal::from(2 * half));
        assert_eq!(sale.taxable_portion, Decimal::from(half));
        assert_eq!(sale.exempt_portion, Decimal::from(half));
    }

    #[test]
    fn test_threshold_boundary() {
        let acquired = date(2020, 1, 1);
        let exact = acquired + chrono::Duration::days(1095);

        let on_boundary = vec![buy(1, acquired, 1), sell(2, exact, 1, dec!(10), dec!(0))];
        let sale = &apportion(&on_boundary, &TaxConfig::default()).sales[0];
        assert_eq!(sale.exempt_portion, dec!(10));

        let day_short = vec![
            buy(1, acquired, 1),
            sell(2, exact - chrono::Duration::days(1), 1, dec!(10), dec!(0)),
        ];
        let sale = &apportion(&day_short, &TaxConfig::default()).sales[0];
        assert_eq!(sale.taxable_portion, dec!(10));
    }

    #[test]
    fn test_custom_threshold() {
        let txns = vec![
            buy(1, date(2023, 1, 1), 2),
            sell(2, date(2024, 1, 1), 2, dec!(50), dec!(0)),
        ];

        let config = TaxConfig::default().with_threshold_days(365);
        let sale = &apportion(&txns, &config).sales[0];
        assert_eq!(sale.exempt_quantity, 2);
        assert_eq!(sale.exempt_portion, dec!(100));
    }

    #[test]
    fn test_unfilled_shares_are_taxable() {
        let txns = vec![
            buy(1, date(2018, 1, 1), 2),
            sell(2, date(2024, 1, 1), 4, dec!(10), dec!(0)),
        ];

        let sale = &apportion(&txns, &TaxConfig::default()).sales[0];
        assert_eq!(sale.unfilled, 2);
        assert_eq!(sale.exempt_quantity, 2);
        assert_eq!(sale.taxable_quantity, 2);
        assert_eq!(sale.taxable_portion, dec!(20));
    }

    #[test]
    fn test_realized_gain() {
        let txns = vec![
            Transaction::new(1, TransactionKind::Buy, "CEZ", date(2023, 1, 1), dec!(100), 10)
                .with_fees(dec!(10)),
            sell(2, date(2024, 1, 1), 10, dec!(150), dec!(5)),
        ];

        let sale = &apportion(&txns, &TaxConfig::default()).sales[0];
        assert_eq!(sale.cost_basis, dec!(1010));
        assert_eq!(sale.realized_gain(), dec!(485));
    }

    #[test]
    fn test_earlier_years_excluded_but_replayed() {
        let txns = vec![
            buy(1, date(2019, 1, 1), 10),
            buy(2, date(2023, 6, 1), 10),
            sell(3, date(2023, 7, 1), 10, dec!(10), dec!(0)),
            sell(4, date(2024, 7, 1), 10, dec!(10), dec!(0)),
        ];

        let sales = apportion_year(&txns, &TaxConfig::default(), 2024);
        assert_eq!(sales.len(), 1);
        // The old lot went in 2023, so 2024's sale is all young
        assert_eq!(sales[0].draws[0].draw.source_id, 2);
        assert_eq!(sales[0].exempt_quantity, 0);
    }
}
