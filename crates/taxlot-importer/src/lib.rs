//! Ledger import for taxlot
//!
//! Reads transaction snapshots from CSV exports or JSON arrays. Import only
//! turns text into [`Transaction`]s; business rules (positive prices,
//! oversells) are checked afterwards by `taxlot-validate`.
//!
//! Rows that cannot be parsed are never dropped silently: each bad field
//! becomes a [`ValidationError`] tagged with its row number.
//!
//! # Example
//!
//! ```
//! use taxlot_importer::{extract_from_string, ImporterConfig};
//!
//! let config = ImporterConfig::csv().build();
//! let csv = "id,type,stock_name,date,price,quantity,fees\n\
//!            1,buy,CEZ,2024-01-15,1000,10,15\n";
//!
//! let result = extract_from_string(csv, &config).unwrap();
//! assert!(result.is_clean());
//! assert_eq!(result.transactions[0].instrument, "CEZ");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod csv_importer;
pub mod json_importer;
mod row;
pub mod sanitize;

use anyhow::Result;
use std::path::Path;
use taxlot_core::Transaction;
use taxlot_validate::ValidationError;

pub use config::{CsvConfig, ImporterConfig, ImporterType};
pub use csv_importer::CsvImporter;
pub use json_importer::JsonImporter;
pub use sanitize::{sanitize_instrument, DEFAULT_MAX_INSTRUMENT_LEN};

/// Result of an import operation.
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    /// Transactions parsed successfully, in source order.
    pub transactions: Vec<Transaction>,
    /// Field errors from rows that could not be parsed.
    pub errors: Vec<ValidationError>,
}

impl ImportResult {
    /// Create an empty import result.
    pub const fn empty() -> Self {
        Self {
            transactions: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Whether every row was parsed.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Import transactions from a file using the given configuration.
pub fn extract_from_file(path: &Path, config: &ImporterConfig) -> Result<ImportResult> {
    config.extract(path)
}

/// Import transactions from file contents (useful for testing).
pub fn extract_from_string(content: &str, config: &ImporterConfig) -> Result<ImportResult> {
    config.extract_from_string(content)
}

/// Import a file, choosing CSV or JSON from its extension.
pub fn import_path(path: &Path) -> Result<ImportResult> {
    ImporterConfig::for_path(path).extract(path)
}
