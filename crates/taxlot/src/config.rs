//! CLI configuration.
//!
//! Settings are layered, lowest precedence first: built-in defaults, an
//! optional JSON config file, then command-line flags.
//!
//! ```json
//! {
//!   "exemption_threshold_days": 1095,
//!   "annual_exemption_limit": "100000",
//!   "max_price": "1000000",
//!   "symbols": { "CEZ": "CEZ.PR" }
//! }
//! ```

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use taxlot_core::TaxConfig;
use taxlot_validate::ValidationOptions;

/// Contents of a config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Minimum holding period (days) for the exemption.
    pub exemption_threshold_days: Option<i64>,
    /// Annual exemption limit.
    pub annual_exemption_limit: Option<Decimal>,
    /// Largest accepted unit price.
    pub max_price: Option<Decimal>,
    /// Largest accepted quantity.
    pub max_quantity: Option<u64>,
    /// Largest accepted fees.
    pub max_fees: Option<Decimal>,
    /// Instrument to market-symbol overrides for price lookups.
    pub symbols: BTreeMap<String, String>,
}

impl Settings {
    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("invalid config {}", path.display()))
    }
}

/// Configuration flags shared by the commands.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// JSON config file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Holding period in days after which sold shares are exempt
    #[arg(long, value_name = "DAYS", global = true)]
    pub threshold_days: Option<i64>,

    /// Annual exemption limit
    #[arg(long, value_name = "AMOUNT", global = true)]
    pub annual_limit: Option<Decimal>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct Resolved {
    /// Parameters for the core computations
    pub tax: TaxConfig,
    /// Parameters for ledger validation
    pub validation: ValidationOptions,
    /// Instrument to market-symbol overrides
    pub symbols: BTreeMap<String, String>,
}

impl ConfigArgs {
    /// Merge defaults, the config file and flags.
    ///
    /// `today` becomes the latest accepted transaction date.
    pub fn resolve(&self, today: NaiveDate) -> Result<Resolved> {
        let settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        self.merge(settings, today)
    }

    fn merge(&self, settings: Settings, today: NaiveDate) -> Result<Resolved> {
        let mut tax = TaxConfig::default();
        if let Some(days) = self.threshold_days.or(settings.exemption_threshold_days) {
            if days < 0 {
                bail!("threshold days cannot be negative, got {days}");
            }
            tax = tax.with_threshold_days(days);
        }
        if let Some(limit) = self.annual_limit.or(settings.annual_exemption_limit) {
            if limit < Decimal::ZERO {
                bail!("annual exemption limit cannot be negative, got {limit}");
            }
            tax = tax.with_annual_limit(limit);
        }

        let validation = ValidationOptions {
            max_price: settings.max_price,
            max_quantity: settings.max_quantity,
            max_fees: settings.max_fees,
            latest_date: Some(today),
            ..Default::default()
        };

        Ok(Resolved {
            tax,
            validation,
            symbols: settings.symbols,
        })
    }
}
