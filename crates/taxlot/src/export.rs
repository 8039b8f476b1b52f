//! CSV export of report tables.

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;
use taxlot_core::{HoldingValuation, Lot, Transaction};

#[derive(Serialize)]
struct LotRow<'a> {
    instrument: &'a str,
    source_id: i64,
    acquisition_date: NaiveDate,
    remaining_quantity: u64,
    effective_unit_cost: Decimal,
    book_value: Decimal,
    holding_days: i64,
    exempt: bool,
}

#[derive(Serialize)]
struct HoldingRow<'a> {
    instrument: &'a str,
    quantity: u64,
    average_cost: Decimal,
    total_cost: Decimal,
    exempt_quantity: u64,
    market_price: Option<Decimal>,
    market_value: Option<Decimal>,
    unrealized_gain: Option<Decimal>,
}

#[derive(Serialize)]
struct TransactionRow<'a> {
    id: i64,
    #[serde(rename = "type")]
    kind: &'static str,
    stock_name: &'a str,
    date: NaiveDate,
    price: Decimal,
    quantity: u64,
    fees: Decimal,
    net_value: Decimal,
}

/// Write open lots, with their age and exemption status on `as_of`.
pub fn write_lots<W: Write>(
    lots: &[Lot],
    as_of: NaiveDate,
    threshold_days: i64,
    writer: W,
) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for lot in lots {
        csv.serialize(LotRow {
            instrument: &lot.instrument,
            source_id: lot.source_id,
            acquisition_date: lot.acquisition_date,
            remaining_quantity: lot.remaining_quantity,
            effective_unit_cost: lot.effective_unit_cost.normalize(),
            book_value: lot.book_value().normalize(),
            holding_days: lot.holding_days(as_of),
            exempt: lot.is_long_held(as_of, threshold_days),
        })?;
    }
    csv.flush()?;
    Ok(())
}

/// Write one row per holding.
///
/// Unknown market figures are left blank rather than written as zero.
pub fn write_holdings<W: Write>(holdings: &[HoldingValuation], writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for valuation in holdings {
        let holding = &valuation.holding;
        csv.serialize(HoldingRow {
            instrument: &holding.instrument,
            quantity: holding.quantity,
            average_cost: holding.average_cost.normalize(),
            total_cost: holding.total_cost.normalize(),
            exempt_quantity: holding.exempt_quantity,
            market_price: valuation.market_price,
            market_value: valuation.market_value,
            unrealized_gain: valuation.unrealized_gain,
        })?;
    }
    csv.flush()?;
    Ok(())
}

/// Write transactions in the import format, plus their net value.
pub fn write_transactions<'a, W, I>(transactions: I, writer: W) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut csv = csv::Writer::from_writer(writer);
    for txn in transactions {
        csv.serialize(TransactionRow {
            id: txn.id,
            kind: if txn.is_buy() { "buy" } else { "sell" },
            stock_name: &txn.instrument,
            date: txn.date,
            price: txn.unit_price,
            quantity: txn.quantity,
            fees: txn.fees,
            net_value: txn.net_value(),
        })?;
    }
    csv.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use taxlot_core::{summarize, surviving_lots, value_holdings, TaxConfig, TransactionKind};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn ledger() -> Vec<Transaction> {
        vec![
            Transaction::new(1, TransactionKind::Buy, "CEZ", date(2020, 1, 1), dec!(100), 10)
                .with_fees(dec!(10)),
            Transaction::new(2, TransactionKind::Sell, "CEZ", date(2021, 1, 1), dec!(120), 4),
        ]
    }

    #[test]
    fn test_write_lots() {
        let mut out = Vec::new();
        write_lots(&surviving_lots(&ledger()), date(2024, 1, 1), 1095, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines[0],
            "instrument,source_id,acquisition_date,remaining_quantity,effective_unit_cost,book_value,holding_days,exempt"
        );
        assert_eq!(lines[1], "CEZ,1,2020-01-01,6,101,606,1461,true");
    }

    #[test]
    fn test_write_holdings_blank_when_unpriced() {
        let lots = surviving_lots(&ledger());
        let summary = summarize(&lots, date(2024, 1, 1), &TaxConfig::default());
        let holdings = value_holdings(&summary, &());

        let mut out = Vec::new();
        write_holdings(&holdings, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().nth(1), Some("CEZ,6,101,606,6,,,"));
    }

    #[test]
    fn test_write_transactions() {
        let mut out = Vec::new();
        write_transactions(&ledger(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "id,type,stock_name,date,price,quantity,fees,net_value");
        assert_eq!(lines[1], "1,buy,CEZ,2020-01-01,100,10,10,1010");
        assert_eq!(lines[2], "2,sell,CEZ,2021-01-01,120,4,0,480");
    }
}
