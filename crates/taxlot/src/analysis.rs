//! The analysis pipeline.
//!
//! Every computation is gated on a clean ledger: field validation first,
//! then the oversell replay. A ledger that fails either gate produces an
//! error and no report, never a partial one.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use taxlot_core::{
    apportion, exempt_holdings, market_value_total, summarize, surviving_lots_as_of,
    value_holdings, HoldingValuation, Lot, PriceLookup, TaxConfig, Transaction, YearlyTaxReport,
};
use taxlot_validate::{check_oversell, validate_fields, ValidationError, ValidationOptions};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Why a ledger could not be analyzed.
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    /// One or more transactions are malformed.
    #[error("ledger has {} invalid transaction(s)", .0.len())]
    Invalid(Vec<ValidationError>),
    /// A sell exceeds the position held at its date.
    #[error("{0}")]
    Oversell(ValidationError),
}

impl AnalysisError {
    /// The individual problems behind this error.
    pub fn diagnostics(&self) -> &[ValidationError] {
        match self {
            Self::Invalid(errors) => errors,
            Self::Oversell(error) => std::slice::from_ref(error),
        }
    }
}

/// Everything the reports show about a ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioReport {
    /// Evaluation date for holdings
    pub as_of: NaiveDate,
    /// Open lots on `as_of`, by instrument then acquisition
    pub lots: Vec<Lot>,
    /// Holdings per instrument with market data where known
    pub holdings: Vec<HoldingValuation>,
    /// Market value of all holdings, unknown if any price is missing
    pub portfolio_market_value: Option<Decimal>,
    /// Holdings restricted to lots past the exemption threshold on `as_of`
    pub exempt_holdings: Vec<HoldingValuation>,
    /// Market value of the exempt holdings, unknown if any price is missing
    pub exempt_market_value: Option<Decimal>,
    /// Cost basis of the exempt holdings
    pub exempt_cost_total: Decimal,
    /// Sales apportionment and remaining capacity for the tax year
    pub tax: YearlyTaxReport,
}

/// Run both gates over a ledger.
pub fn gate(transactions: &[Transaction], options: &ValidationOptions) -> Result<(), AnalysisError> {
    let errors = validate_fields(transactions, options);
    if !errors.is_empty() {
        debug!(count = errors.len(), "field validation failed");
        return Err(AnalysisError::Invalid(errors));
    }

    check_oversell(transactions).map_err(|e| {
        debug!(error = %e, "oversell detected");
        AnalysisError::Oversell(e)
    })
}

/// Analyze a ledger snapshot.
///
/// `year` selects the tax year for the apportionment report; `as_of` anchors
/// the holdings view. Only transactions dated on or before `as_of` contribute
/// to lots and holdings.
#[tracing::instrument(skip_all, fields(transactions = transactions.len(), year = year, as_of = %as_of))]
pub fn analyze<P: PriceLookup>(
    transactions: &[Transaction],
    config: &TaxConfig,
    options: &ValidationOptions,
    year: i32,
    as_of: NaiveDate,
    prices: &P,
) -> Result<PortfolioReport, AnalysisError> {
    gate(transactions, options)?;
    debug!("ledger passed validation");

    let lots = surviving_lots_as_of(transactions, as_of);
    debug!(lots = lots.len(), "replayed lots");

    let holdings = value_holdings(&summarize(&lots, as_of, config), prices);
    for valuation in holdings.iter().filter(|v| v.market_price.is_none()) {
        warn!(instrument = %valuation.holding.instrument, "no market price");
    }

    let exempt = exempt_holdings(&lots, as_of, config);
    let exempt_cost_total: Decimal = exempt.iter().map(|h| h.total_cost).sum();
    let exempt = value_holdings(&exempt, prices);

    let apportionment = apportion(transactions, config);
    let tax = YearlyTaxReport::from_sales(year, &apportionment.sales, config);
    debug!(sales = tax.sales.len(), "apportioned sales");

    let report = PortfolioReport {
        as_of,
        lots,
        portfolio_market_value: market_value_total(&holdings),
        exempt_market_value: market_value_total(&exempt),
        holdings,
        exempt_holdings: exempt,
        exempt_cost_total,
        tax,
    };

    info!(
        instruments = report.holdings.len(),
        taxable = %report.tax.taxable_sales_total,
        capacity = %report.tax.remaining_exemption_capacity,
        "analysis complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;
    use taxlot_core::TransactionKind;
    use taxlot_validate::ErrorCode;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn ledger() -> Vec<Transaction> {
        vec![
            Transaction::new(1, TransactionKind::Buy, "CEZ", date(2020, 1, 2), dec!(500), 10)
                .with_fees(dec!(50)),
            Transaction::new(2, TransactionKind::Buy, "KOMB", date(2023, 6, 1), dec!(800), 5),
            Transaction::new(3, TransactionKind::Sell, "CEZ", date(2024, 3, 1), dec!(1000), 4)
                .with_fees(dec!(40)),
        ]
    }

    #[test]
    fn test_full_report() {
        let prices: BTreeMap<String, Decimal> =
            [("CEZ".to_string(), dec!(1100)), ("KOMB".to_string(), dec!(900))].into();

        let report = analyze(
            &ledger(),
            &TaxConfig::default(),
            &ValidationOptions::default(),
            2024,
            date(2024, 6, 1),
            &prices,
        )
        .unwrap();

        assert_eq!(report.lots.len(), 2);
        assert_eq!(report.holdings[0].holding.quantity, 6);
        assert_eq!(report.holdings[0].holding.average_cost, dec!(505));
        assert_eq!(report.portfolio_market_value, Some(dec!(11100)));

        assert_eq!(report.exempt_holdings.len(), 1);
        assert_eq!(report.exempt_holdings[0].holding.instrument, "CEZ");
        assert_eq!(report.exempt_cost_total, dec!(3030));
        assert_eq!(report.exempt_market_value, Some(dec!(6600)));

        assert_eq!(report.tax.total_sales, dec!(3960));
        assert_eq!(report.tax.exempt_sales_total, dec!(3960));
        assert_eq!(report.tax.taxable_sales_total, Decimal::ZERO);
        assert_eq!(report.tax.remaining_exemption_capacity, dec!(100000));
    }

    #[test]
    fn test_unknown_price_makes_total_unknown() {
        let prices: BTreeMap<String, Decimal> = [("CEZ".to_string(), dec!(1100))].into();
        let report = analyze(
            &ledger(),
            &TaxConfig::default(),
            &ValidationOptions::default(),
            2024,
            date(2024, 6, 1),
            &prices,
        )
        .unwrap();

        assert_eq!(report.portfolio_market_value, None);
        // Only CEZ is exempt, and its price is known
        assert_eq!(report.exempt_market_value, Some(dec!(6600)));
    }

    #[test]
    fn test_oversell_blocks_report() {
        let mut txns = ledger();
        txns.push(Transaction::new(
            4,
            TransactionKind::Sell,
            "KOMB",
            date(2024, 4, 1),
            dec!(1),
            6,
        ));

        let err = analyze(
            &txns,
            &TaxConfig::default(),
            &ValidationOptions::default(),
            2024,
            date(2024, 6, 1),
            &(),
        )
        .unwrap_err();
        let AnalysisError::Oversell(e) = &err else {
            panic!("expected oversell, got {err:?}");
        };
        assert_eq!(e.transaction_id, Some(4));
        assert_eq!(err.diagnostics().len(), 1);
    }

    #[test]
    fn test_invalid_fields_reported_before_oversell() {
        let txns = vec![
            Transaction::new(1, TransactionKind::Buy, "CEZ", date(2024, 1, 1), dec!(0), 1),
            Transaction::new(2, TransactionKind::Sell, "CEZ", date(2024, 1, 2), dec!(1), 5),
        ];
        let err = gate(&txns, &ValidationOptions::default()).unwrap_err();
        assert!(matches!(
            &err,
            AnalysisError::Invalid(errors) if errors[0].code == ErrorCode::InvalidPrice
        ));
    }

    #[test]
    fn test_unrepresentable_value_blocks_report() {
        let txns = vec![Transaction::new(
            1,
            TransactionKind::Buy,
            "CEZ",
            date(2024, 1, 1),
            Decimal::from_i128_with_scale(10i128.pow(20), 0),
            10_000_000_000,
        )];
        let options = ValidationOptions::default();

        assert!(matches!(
            gate(&txns, &options),
            Err(AnalysisError::Invalid(errors)) if errors[0].code == ErrorCode::LimitExceeded
        ));

        let result = analyze(
            &txns,
            &TaxConfig::default(),
            &options,
            2024,
            date(2024, 6, 1),
            &(),
        );
        assert!(matches!(result, Err(AnalysisError::Invalid(_))));
    }

    #[test]
    fn test_as_of_excludes_later_buys() {
        let report = analyze(
            &ledger(),
            &TaxConfig::default(),
            &ValidationOptions::default(),
            2023,
            date(2023, 1, 1),
            &(),
        )
        .unwrap();
        assert_eq!(report.lots.len(), 1);
        assert_eq!(report.lots[0].remaining_quantity, 10);
        assert!(report.tax.sales.is_empty());
    }
}
