//! Conversion of raw text fields into transactions.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use taxlot_core::Transaction;
use taxlot_validate::{parse_kind, ErrorCode, ValidationError};

use crate::sanitize::sanitize_instrument;

/// One source record with every field still as text.
#[derive(Debug, Clone, Default)]
pub(crate) struct RawRow {
    pub id: Option<String>,
    pub kind: String,
    pub instrument: String,
    pub date: String,
    pub price: String,
    pub quantity: String,
    pub fees: Option<String>,
    pub sequence: Option<String>,
}

/// Settings shared by every row of one import.
pub(crate) struct RowFormat<'a> {
    pub date_format: &'a str,
    pub max_instrument_len: usize,
}

/// Build a transaction from the record at zero-based `index`.
///
/// Missing ids fall back to the 1-based row number and missing insertion
/// keys to `index`. Every bad field is reported, not just the first.
pub(crate) fn build_transaction(
    raw: &RawRow,
    index: usize,
    format: &RowFormat<'_>,
) -> Result<Transaction, Vec<ValidationError>> {
    let row = index + 1;
    let mut errors = Vec::new();
    let mut fail = |code: ErrorCode, message: String| {
        errors.push(ValidationError::new(code, message).with_context(format!("row {row}")));
    };

    let id = match non_blank(raw.id.as_deref()) {
        None => Some(row as i64),
        Some(s) => s
            .parse::<i64>()
            .map_err(|_| fail(ErrorCode::InvalidId, format!("Invalid id '{s}'")))
            .ok(),
    };

    let sequence = match non_blank(raw.sequence.as_deref()) {
        None => Some(index as u64),
        Some(s) => s
            .parse::<u64>()
            .map_err(|_| fail(ErrorCode::InvalidId, format!("Invalid sequence '{s}'")))
            .ok(),
    };

    let kind = parse_kind(&raw.kind).map_err(|e| fail(e.code, e.message)).ok();

    let instrument = sanitize_instrument(&raw.instrument, format.max_instrument_len);
    if instrument.is_empty() {
        fail(ErrorCode::MissingInstrument, "Stock name is required".to_string());
    }

    let date_text = raw.date.trim();
    let date = NaiveDate::parse_from_str(date_text, format.date_format)
        .map_err(|_| {
            fail(
                ErrorCode::InvalidDate,
                format!("Invalid date '{date_text}', expected format '{}'", format.date_format),
            );
        })
        .ok();

    let price_text = raw.price.trim();
    let price = Decimal::from_str(price_text)
        .map_err(|_| fail(ErrorCode::InvalidPrice, format!("Invalid price '{price_text}'")))
        .ok();

    let quantity_text = raw.quantity.trim();
    let quantity = quantity_text
        .parse::<u64>()
        .map_err(|_| {
            fail(
                ErrorCode::InvalidQuantity,
                format!("Invalid quantity '{quantity_text}', expected a whole number of shares"),
            );
        })
        .ok();

    let fees = match non_blank(raw.fees.as_deref()) {
        None => Some(Decimal::ZERO),
        Some(s) => Decimal::from_str(s)
            .map_err(|_| fail(ErrorCode::InvalidFees, format!("Invalid fees '{s}'")))
            .ok(),
    };

    match (id, sequence, kind, date, price, quantity, fees) {
        (Some(id), Some(sequence), Some(kind), Some(date), Some(price), Some(quantity), Some(fees))
            if errors.is_empty() =>
        {
            Ok(Transaction::new(id, kind, instrument, date, price, quantity)
                .with_fees(fees)
                .with_sequence(sequence))
        }
        _ => Err(errors),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use taxlot_core::TransactionKind;

    const FORMAT: RowFormat<'static> = RowFormat {
        date_format: "%Y-%m-%d",
        max_instrument_len: 50,
    };

    fn raw() -> RawRow {
        RawRow {
            id: Some("7".to_string()),
            kind: "buy".to_string(),
            instrument: "CEZ".to_string(),
            date: "2024-01-15".to_string(),
            price: "1000.50".to_string(),
            quantity: "10".to_string(),
            fees: Some("15".to_string()),
            sequence: None,
        }
    }

    #[test]
    fn test_build_complete_row() {
        let txn = build_transaction(&raw(), 3, &FORMAT).unwrap();
        assert_eq!(txn.id, 7);
        assert_eq!(txn.kind, TransactionKind::Buy);
        assert_eq!(txn.unit_price, dec!(1000.50));
        assert_eq!(txn.quantity, 10);
        assert_eq!(txn.fees, dec!(15));
        assert_eq!(txn.sequence, 3);
    }

    #[test]
    fn test_defaults_for_blank_optional_fields() {
        let row = RawRow {
            id: None,
            fees: Some("  ".to_string()),
            ..raw()
        };
        let txn = build_transaction(&row, 4, &FORMAT).unwrap();
        assert_eq!(txn.id, 5);
        assert_eq!(txn.fees, Decimal::ZERO);
    }

    #[test]
    fn test_unparseable_fees() {
        let row = RawRow {
            fees: Some("ten".to_string()),
            ..raw()
        };
        let errors = build_transaction(&row, 0, &FORMAT).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, ErrorCode::InvalidFees);
        assert!(errors[0].message.contains("'ten'"));
    }

    #[test]
    fn test_every_bad_field_reported() {
        let row = RawRow {
            kind: "gift".to_string(),
            instrument: "<>".to_string(),
            date: "15.1.2024".to_string(),
            price: "cheap".to_string(),
            quantity: "-3".to_string(),
            ..raw()
        };
        let errors = build_transaction(&row, 0, &FORMAT).unwrap_err();
        let codes: Vec<_> = errors.iter().map(|e| e.code).collect();
        assert_eq!(
            codes,
            vec![
                ErrorCode::UnknownKind,
                ErrorCode::MissingInstrument,
                ErrorCode::InvalidDate,
                ErrorCode::InvalidPrice,
                ErrorCode::InvalidQuantity,
            ]
        );
        assert!(errors.iter().all(|e| e.context.as_deref() == Some("row 1")));
    }
}
