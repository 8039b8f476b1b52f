//! JSON ledger importer.
//!
//! Accepts an array of objects using the same field names as the CSV
//! header. Numbers may be given as JSON numbers or strings.

use crate::config::ImporterConfig;
use crate::row::{build_transaction, RawRow, RowFormat};
use crate::ImportResult;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::Path;

/// JSON ledger importer.
pub struct JsonImporter<'a> {
    config: &'a ImporterConfig,
}

impl<'a> JsonImporter<'a> {
    /// Create a new JSON importer with the given configuration.
    pub const fn new(config: &'a ImporterConfig) -> Self {
        Self { config }
    }

    /// Import transactions from a file.
    pub fn extract_file(&self, path: &Path) -> Result<ImportResult> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        self.extract_string(&content)
    }

    /// Import transactions from string content.
    pub fn extract_string(&self, content: &str) -> Result<ImportResult> {
        let records: Vec<Map<String, Value>> =
            serde_json::from_str(content).context("Expected a JSON array of transaction objects")?;

        let format = RowFormat {
            date_format: taxlot_validate::DATE_FORMAT,
            max_instrument_len: self.config.max_instrument_len,
        };

        let mut result = ImportResult::empty();
        for (index, record) in records.iter().enumerate() {
            match build_transaction(&raw_row(record), index, &format) {
                Ok(txn) => result.transactions.push(txn),
                Err(errors) => result.errors.extend(errors),
            }
        }
        Ok(result)
    }
}

fn raw_row(record: &Map<String, Value>) -> RawRow {
    let field = |names: &[&str]| names.iter().find_map(|name| record.get(*name)).and_then(text);
    RawRow {
        id: field(&["id"]),
        kind: field(&["type", "kind"]).unwrap_or_default(),
        instrument: field(&["stock_name", "instrument"]).unwrap_or_default(),
        date: field(&["date"]).unwrap_or_default(),
        price: field(&["price", "unit_price"]).unwrap_or_default(),
        quantity: field(&["quantity"]).unwrap_or_default(),
        fees: field(&["fees"]),
        sequence: field(&["sequence"]),
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
