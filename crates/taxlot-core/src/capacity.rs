//! Annual exemption capacity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{SaleApportionment, TaxConfig};

/// Room left under the annual exemption limit.
///
/// Never negative: once taxable sales exceed the limit the capacity is zero.
#[must_use]
pub fn remaining_capacity(annual_exemption_limit: Decimal, taxable_sales_total: Decimal) -> Decimal {
    (annual_exemption_limit - taxable_sales_total).max(Decimal::ZERO)
}

/// Apportionment totals for one tax year (January 1 to December 31).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlyTaxReport {
    /// Tax year
    pub year: i32,
    /// Net value of every sale in the year
    pub total_sales: Decimal,
    /// Taxable portions summed over the year's sales
    pub taxable_sales_total: Decimal,
    /// Exempt portions summed over the year's sales
    pub exempt_sales_total: Decimal,
    /// Remaining room before the annual exemption is exhausted
    pub remaining_exemption_capacity: Decimal,
    /// The limit the capacity was measured against
    pub annual_exemption_limit: Decimal,
    /// The year's sales, chronologically
    pub sales: Vec<SaleApportionment>,
}

impl YearlyTaxReport {
    /// Build the report for `year` from apportioned sales.
    ///
    /// Sales dated in other years are ignored.
    #[must_use]
    pub fn from_sales<'a, I>(year: i32, sales: I, config: &TaxConfig) -> Self
    where
        I: IntoIterator<Item = &'a SaleApportionment>,
    {
        let sales: Vec<SaleApportionment> = sales
            .into_iter()
            .filter(|s| s.year() == year)
            .cloned()
            .collect();

        let total_sales = sales.iter().map(|s| s.net_value).sum();
        let taxable_sales_total: Decimal = sales.iter().map(|s| s.taxable_portion).sum();
        let exempt_sales_total = sales.iter().map(|s| s.exempt_portion).sum();

        Self {
            year,
            total_sales,
            taxable_sales_total,
            exempt_sales_total,
            remaining_exemption_capacity: remaining_capacity(
                config.annual_exemption_limit,
                taxable_sales_total,
            ),
            annual_exemption_limit: config.annual_exemption_limit,
            sales,
        }
    }

    /// Whether this year's taxable sales stay within the annual exemption.
    #[must_use]
    pub fn within_exemption(&self) -> bool {
        self.taxable_sales_total <= self.annual_exemption_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{apportion, Transaction, TransactionKind};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_remaining_capacity() {
        assert_eq!(remaining_capacity(dec!(100000), dec!(2245)), dec!(97755));
        assert_eq!(remaining_capacity(dec!(100000), dec!(100000)), Decimal::ZERO);
        assert_eq!(remaining_capacity(dec!(100000), dec!(250000)), Decimal::ZERO);
    }

    #[test]
    fn test_report_for_year() {
        let txns = vec![
            Transaction::new(1, TransactionKind::Buy, "CEZ", date(2019, 1, 1), dec!(100), 10),
            Transaction::new(2, TransactionKind::Buy, "CEZ", date(2023, 1, 1), dec!(100), 10),
            Transaction::new(3, TransactionKind::Sell, "CEZ", date(2023, 5, 1), dec!(200), 2),
            Transaction::new(4, TransactionKind::Sell, "CEZ", date(2024, 5, 1), dec!(200), 10)
                .with_fees(dec!(20)),
        ];
        let config = TaxConfig::default();
        let result = apportion(&txns, &config);

        let report = YearlyTaxReport::from_sales(2024, &result.sales, &config);
        assert_eq!(report.sales.len(), 1);
        assert_eq!(report.total_sales, dec!(1980));
        // 8 old shares, 2 young
        assert_eq!(report.exempt_sales_total, dec!(1584));
        assert_eq!(report.taxable_sales_total, dec!(396));
        assert_eq!(report.remaining_exemption_capacity, dec!(99604));
        assert!(report.within_exemption());
    }

    #[test]
    fn test_report_over_limit() {
        let txns = vec![
            Transaction::new(1, TransactionKind::Buy, "CEZ", date(2024, 1, 1), dec!(1000), 200),
            Transaction::new(2, TransactionKind::Sell, "CEZ", date(2024, 3, 1), dec!(1000), 150),
        ];
        let config = TaxConfig::default();
        let report = YearlyTaxReport::from_sales(2024, &apportion(&txns, &config).sales, &config);

        assert_eq!(report.taxable_sales_total, dec!(150000));
        assert_eq!(report.remaining_exemption_capacity, Decimal::ZERO);
        assert!(!report.within_exemption());
    }

    #[test]
    fn test_empty_year() {
        let report = YearlyTaxReport::from_sales(2030, &[], &TaxConfig::default());
        assert_eq!(report.taxable_sales_total, Decimal::ZERO);
        assert_eq!(report.remaining_exemption_capacity, dec!(100000));
    }
}
