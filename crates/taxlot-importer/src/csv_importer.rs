//! CSV ledger importer.

use crate::config::{CsvConfig, ImporterConfig};
use crate::row::{build_transaction, RawRow, RowFormat};
use crate::ImportResult;
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::path::Path;

/// CSV ledger importer.
pub struct CsvImporter<'a> {
    config: &'a ImporterConfig,
}

/// Resolved positions of the configured columns.
struct Columns {
    id: Option<usize>,
    kind: usize,
    instrument: usize,
    date: usize,
    price: usize,
    quantity: usize,
    fees: Option<usize>,
    sequence: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord, csv_config: &CsvConfig) -> Result<Self> {
        let header_map: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        let find = |name: &str| header_map.get(&name.to_lowercase()).copied();
        let require = |name: &str| find(name).with_context(|| format!("Column '{name}' not found in header"));

        let Some(instrument) = csv_config.instrument_columns.iter().find_map(|name| find(name)) else {
            bail!(
                "Instrument column not found in header (expected one of: {})",
                csv_config.instrument_columns.join(", ")
            );
        };

        Ok(Self {
            id: csv_config.id_column.as_deref().and_then(find),
            kind: require(&csv_config.kind_column)?,
            instrument,
            date: require(&csv_config.date_column)?,
            price: require(&csv_config.price_column)?,
            quantity: require(&csv_config.quantity_column)?,
            fees: find(&csv_config.fees_column),
            sequence: csv_config.sequence_column.as_deref().map(require).transpose()?,
        })
    }

    fn raw_row(&self, record: &csv::StringRecord) -> RawRow {
        let get = |i: usize| record.get(i).unwrap_or_default().to_string();
        RawRow {
            id: self.id.map(get),
            kind: get(self.kind),
            instrument: get(self.instrument),
            date: get(self.date),
            price: get(self.price),
            quantity: get(self.quantity),
            fees: self.fees.map(get),
            sequence: self.sequence.map(get),
        }
    }
}

impl<'a> CsvImporter<'a> {
    /// Create a new CSV importer with the given configuration.
    pub const fn new(config: &'a ImporterConfig) -> Self {
        Self { config }
    }

    /// Import transactions from a file.
    pub fn extract_file(&self, path: &Path, csv_config: &CsvConfig) -> Result<ImportResult> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        self.extract_string(&content, csv_config)
    }

    /// Import transactions from string content.
    ///
    /// A missing required column or a structurally broken record fails the
    /// whole import. Field-level problems are collected per row.
    pub fn extract_string(&self, content: &str, csv_config: &CsvConfig) -> Result<ImportResult> {
        let delimiter = u8::try_from(csv_config.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .with_context(|| {
                format!("Delimiter '{}' is not a single ASCII character", csv_config.delimiter)
            })?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .from_reader(content.as_bytes());

        let columns = Columns::resolve(reader.headers()?, csv_config)?;
        let format = RowFormat {
            date_format: &csv_config.date_format,
            max_instrument_len: self.config.max_instrument_len,
        };

        let mut result = ImportResult::empty();
        let mut index = 0;

        for (line, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("Line {}: malformed record", line + 2))?;

            // Skip empty rows
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }

            match build_transaction(&columns.raw_row(&record), index, &format) {
                Ok(txn) => result.transactions.push(txn),
                Err(errors) => result.errors.extend(errors),
            }
            index += 1;
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use taxlot_core::TransactionKind;
    use taxlot_validate::ErrorCode;

    fn extract(content: &str) -> Result<ImportResult> {
        ImporterConfig::csv().build().extract_from_string(content)
    }

    #[test]
    fn test_basic_ledger() {
        let content = "\
id,type,stock_name,date,price,quantity,fees
1,buy,CEZ,2023-01-01,100,10,10
2,sell,CEZ,2024-01-01,150,4,
";
        let result = extract(content).unwrap();
        assert!(result.is_clean());
        assert_eq!(result.transactions.len(), 2);

        let sell = &result.transactions[1];
        assert_eq!(sell.kind, TransactionKind::Sell);
        assert_eq!(sell.fees, Decimal::ZERO);
        assert_eq!(sell.sequence, 1);
    }

    #[test]
    fn test_instrument_alias_and_header_case() {
        let content = "ID,Type,Instrument,Date,Price,Quantity\n5,BUY,KOMB,2024-02-01,812.5,3\n";
        let result = extract(content).unwrap();
        let txn = &result.transactions[0];
        assert_eq!(txn.id, 5);
        assert_eq!(txn.instrument, "KOMB");
        assert_eq!(txn.unit_price, dec!(812.5));
    }

    #[test]
    fn test_row_order_is_insertion_order() {
        let content = "\
id,type,stock_name,date,price,quantity
9,buy,CEZ,2024-01-01,100,1
3,sell,CEZ,2024-01-01,100,1
";
        let result = extract(content).unwrap();
        let keys: Vec<_> = result.transactions.iter().map(|t| (t.id, t.sequence)).collect();
        assert_eq!(keys, vec![(9, 0), (3, 1)]);
    }

    #[test]
    fn test_sequence_column() {
        let config = ImporterConfig::csv().sequence_column("seq").build();
        let content = "id,type,stock_name,date,price,quantity,seq\n1,buy,CEZ,2024-01-01,1,1,42\n";
        let result = config.extract_from_string(content).unwrap();
        assert_eq!(result.transactions[0].sequence, 42);
    }

    #[test]
    fn test_bad_rows_become_errors() {
        let content = "\
id,type,stock_name,date,price,quantity,fees
1,buy,CEZ,2023-01-01,100,10,0
2,sell,CEZ,2023-13-01,150,4,0
3,hold,CEZ,2023-02-01,150,4,0
";
        let result = extract(content).unwrap();
        assert_eq!(result.transactions.len(), 1);
        assert!(!result.is_clean());

        let found: Vec<_> = result
            .errors
            .iter()
            .map(|e| (e.code, e.context.clone().unwrap_or_default()))
            .collect();
        assert_eq!(
            found,
            vec![
                (ErrorCode::InvalidDate, "row 2".to_string()),
                (ErrorCode::UnknownKind, "row 3".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_column_fails_import() {
        let err = extract("id,type,date,price,quantity\n").unwrap_err();
        assert!(err.to_string().contains("Instrument column"));

        let err = extract("id,type,stock_name,date,quantity\n").unwrap_err();
        assert!(err.to_string().contains("'price'"));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let content = "id,type,stock_name,date,price,quantity\n,,,,,\n1,buy,CEZ,2024-01-01,1,1\n";
        let result = extract(content).unwrap();
        assert_eq!(result.transactions.len(), 1);
        assert_eq!(result.transactions[0].sequence, 0);
    }

    #[test]
    fn test_non_ascii_delimiter_rejected() {
        let config = ImporterConfig::csv().delimiter('§').build();
        let err = config
            .extract_from_string("id§type§stock_name§date§price§quantity\n")
            .unwrap_err();
        assert!(err.to_string().contains("not a single ASCII character"));
    }

    #[test]
    fn test_custom_delimiter_and_date_format() {
        let config = ImporterConfig::csv()
            .delimiter(';')
            .date_format("%d.%m.%Y")
            .build();
        let content = "id;type;stock_name;date;price;quantity\n1;buy;CEZ;15.01.2024;1;1\n";
        let result = config.extract_from_string(content).unwrap();
        assert_eq!(
            result.transactions[0].date,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }
}
