//! Tax configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default holding period for the long-holding exemption (three years).
pub const DEFAULT_EXEMPTION_THRESHOLD_DAYS: i64 = 3 * 365;

/// Default annual exemption limit, in reporting-currency units.
pub const DEFAULT_ANNUAL_EXEMPTION_LIMIT: Decimal = Decimal::from_parts(100_000, 0, 0, false, 0);

/// Parameters every core computation receives explicitly.
///
/// Missing fields fall back to their defaults when deserializing, so a
/// config file may override just one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxConfig {
    /// Minimum holding period (days) for a lot to be exempt.
    pub exemption_threshold_days: i64,
    /// Sales up to this amount per year are exempt regardless of holding period.
    pub annual_exemption_limit: Decimal,
}

impl Default for TaxConfig {
    fn default() -> Self {
        Self {
            exemption_threshold_days: DEFAULT_EXEMPTION_THRESHOLD_DAYS,
            annual_exemption_limit: DEFAULT_ANNUAL_EXEMPTION_LIMIT,
        }
    }
}

impl TaxConfig {
    /// Set the exemption threshold in days.
    #[must_use]
    pub const fn with_threshold_days(mut self, days: i64) -> Self {
        self.exemption_threshold_days = days;
        self
    }

    /// Set the annual exemption limit.
    #[must_use]
    pub const fn with_annual_limit(mut self, limit: Decimal) -> Self {
        self.annual_exemption_limit = limit;
        self
    }
}
