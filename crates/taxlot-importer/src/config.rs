//! Configuration for ledger importers.

use crate::csv_importer::CsvImporter;
use crate::json_importer::JsonImporter;
use crate::sanitize::DEFAULT_MAX_INSTRUMENT_LEN;
use crate::ImportResult;
use anyhow::Result;
use std::path::Path;

/// Configuration for an importer.
#[derive(Debug, Clone)]
pub struct ImporterConfig {
    /// Longest instrument name kept after sanitizing.
    pub max_instrument_len: usize,
    /// The importer type and its specific configuration.
    pub importer_type: ImporterType,
}

/// Type of importer with its specific configuration.
#[derive(Debug, Clone)]
pub enum ImporterType {
    /// CSV file importer.
    Csv(CsvConfig),
    /// JSON array importer.
    Json,
}

/// Configuration specific to CSV imports.
#[derive(Debug, Clone)]
pub struct CsvConfig {
    /// Column holding the transaction id. Row number is used when absent.
    pub id_column: Option<String>,
    /// Column holding `buy` or `sell`.
    pub kind_column: String,
    /// Accepted names for the instrument column, first match wins.
    pub instrument_columns: Vec<String>,
    /// Column holding the trade date.
    pub date_column: String,
    /// The date format (strftime-style).
    pub date_format: String,
    /// Column holding the unit price.
    pub price_column: String,
    /// Column holding the share count.
    pub quantity_column: String,
    /// Column holding fees. Missing column or blank cell means zero.
    pub fees_column: String,
    /// Column holding the insertion key. Row order is used when absent.
    pub sequence_column: Option<String>,
    /// The field delimiter.
    pub delimiter: char,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            id_column: Some("id".to_string()),
            kind_column: "type".to_string(),
            instrument_columns: vec!["stock_name".to_string(), "instrument".to_string()],
            date_column: "date".to_string(),
            date_format: taxlot_validate::DATE_FORMAT.to_string(),
            price_column: "price".to_string(),
            quantity_column: "quantity".to_string(),
            fees_column: "fees".to_string(),
            sequence_column: None,
            delimiter: ',',
        }
    }
}

impl ImporterConfig {
    /// Start building a CSV importer configuration.
    pub fn csv() -> CsvConfigBuilder {
        CsvConfigBuilder::new()
    }

    /// A JSON importer configuration.
    pub const fn json() -> Self {
        Self {
            max_instrument_len: DEFAULT_MAX_INSTRUMENT_LEN,
            importer_type: ImporterType::Json,
        }
    }

    /// Pick an importer from the file extension (`.json` or anything else as CSV).
    pub fn for_path(path: &Path) -> Self {
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::json()
        } else {
            Self::csv().build()
        }
    }

    /// Import transactions from a file.
    pub fn extract(&self, path: &Path) -> Result<ImportResult> {
        match &self.importer_type {
            ImporterType::Csv(csv_config) => CsvImporter::new(self).extract_file(path, csv_config),
            ImporterType::Json => JsonImporter::new(self).extract_file(path),
        }
    }

    /// Import transactions from string content.
    pub fn extract_from_string(&self, content: &str) -> Result<ImportResult> {
        match &self.importer_type {
            ImporterType::Csv(csv_config) => {
                CsvImporter::new(self).extract_string(content, csv_config)
            }
            ImporterType::Json => JsonImporter::new(self).extract_string(content),
        }
    }
}

/// Builder for CSV importer configuration.
pub struct CsvConfigBuilder {
    max_instrument_len: usize,
    config: CsvConfig,
}

impl CsvConfigBuilder {
    /// Create a new CSV config builder with the default column names.
    pub fn new() -> Self {
        Self {
            max_instrument_len: DEFAULT_MAX_INSTRUMENT_LEN,
            config: CsvConfig::default(),
        }
    }

    /// Set the id column, or `None` to number rows instead.
    pub fn id_column(mut self, name: Option<&str>) -> Self {
        self.config.id_column = name.map(str::to_string);
        self
    }

    /// Set the kind column.
    pub fn kind_column(mut self, name: impl Into<String>) -> Self {
        self.config.kind_column = name.into();
        self
    }

    /// Replace the accepted instrument column names with a single name.
    pub fn instrument_column(mut self, name: impl Into<String>) -> Self {
        self.config.instrument_columns = vec![name.into()];
        self
    }

    /// Set the date column.
    pub fn date_column(mut self, name: impl Into<String>) -> Self {
        self.config.date_column = name.into();
        self
    }

    /// Set the date format (strftime-style).
    pub fn date_format(mut self, format: impl Into<String>) -> Self {
        self.config.date_format = format.into();
        self
    }

    /// Set the price column.
    pub fn price_column(mut self, name: impl Into<String>) -> Self {
        self.config.price_column = name.into();
        self
    }

    /// Set the quantity column.
    pub fn quantity_column(mut self, name: impl Into<String>) -> Self {
        self.config.quantity_column = name.into();
        self
    }

    /// Set the fees column.
    pub fn fees_column(mut self, name: impl Into<String>) -> Self {
        self.config.fees_column = name.into();
        self
    }

    /// Take insertion keys from a column instead of row order.
    pub fn sequence_column(mut self, name: impl Into<String>) -> Self {
        self.config.sequence_column = Some(name.into());
        self
    }

    /// Set the field delimiter.
    pub const fn delimiter(mut self, delimiter: char) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    /// Set the longest instrument name kept after sanitizing.
    pub const fn max_instrument_len(mut self, len: usize) -> Self {
        self.max_instrument_len = len;
        self
    }

    /// Build the importer configuration.
    pub fn build(self) -> ImporterConfig {
        ImporterConfig {
            max_instrument_len: self.max_instrument_len,
            importer_type: ImporterType::Csv(self.config),
        }
    }
}

impl Default for CsvConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_defaults() {
        let config = ImporterConfig::csv().build();
        let ImporterType::Csv(csv) = config.importer_type else {
            panic!("expected csv config");
        };
        assert_eq!(csv.instrument_columns, vec!["stock_name", "instrument"]);
        assert_eq!(csv.kind_column, "type");
        assert!(csv.sequence_column.is_none());
        assert_eq!(config.max_instrument_len, 50);
    }

    #[test]
    fn test_builder_overrides() {
        let config = ImporterConfig::csv()
            .id_column(None)
            .instrument_column("Ticker")
            .sequence_column("seq")
            .delimiter(';')
            .max_instrument_len(10)
            .build();
        let ImporterType::Csv(csv) = config.importer_type else {
            panic!("expected csv config");
        };
        assert!(csv.id_column.is_none());
        assert_eq!(csv.instrument_columns, vec!["Ticker"]);
        assert_eq!(csv.sequence_column.as_deref(), Some("seq"));
        assert_eq!(csv.delimiter, ';');
        assert_eq!(config.max_instrument_len, 10);
    }

    #[test]
    fn test_for_path() {
        assert!(matches!(
            ImporterConfig::for_path(Path::new("ledger.JSON")).importer_type,
            ImporterType::Json
        ));
        assert!(matches!(
            ImporterConfig::for_path(Path::new("ledger.csv")).importer_type,
            ImporterType::Csv(_)
        ));
        assert!(matches!(
            ImporterConfig::for_path(Path::new("ledger")).importer_type,
            ImporterType::Csv(_)
        ));
    }
}
