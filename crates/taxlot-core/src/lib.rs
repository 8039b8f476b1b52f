//! Core types and computations for taxlot
//!
//! This crate provides the lot-accounting and tax-apportionment engine:
//!
//! - [`Transaction`] - An immutable buy or sell fact from the ledger
//! - [`Lot`] - A surviving slice of a past buy, with fees folded into its cost
//! - [`replay`] - The single FIFO walk every other computation is built on
//! - [`surviving_lots`] - Lots left after replaying every sell
//! - [`apportion`] - Taxable/exempt split of each sale by source-lot age
//! - [`summarize`] / [`exempt_holdings`] - Per-instrument holdings
//! - [`YearlyTaxReport`] - Annual exemption capacity for one tax year
//!
//! Every function is a pure computation over an input snapshot and a
//! [`TaxConfig`]. Nothing here reads the clock or any global state.
//!
//! # Example
//!
//! ```
//! use taxlot_core::{apportion, surviving_lots, TaxConfig, Transaction, TransactionKind};
//! use rust_decimal_macros::dec;
//! use chrono::NaiveDate;
//!
//! let date = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
//! let ledger = vec![
//!     Transaction::new(1, TransactionKind::Buy, "CEZ", date(2023, 1, 1), dec!(100), 10)
//!         .with_fees(dec!(10)),
//!     Transaction::new(2, TransactionKind::Sell, "CEZ", date(2024, 1, 1), dec!(150), 4),
//! ];
//!
//! let lots = surviving_lots(&ledger);
//! assert_eq!(lots[0].remaining_quantity, 6);
//! assert_eq!(lots[0].effective_unit_cost, dec!(101));
//!
//! let result = apportion(&ledger, &TaxConfig::default());
//! assert_eq!(result.sales[0].taxable_portion, dec!(600));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod apportion;
pub mod capacity;
pub mod config;
pub mod engine;
pub mod holdings;
pub mod lot;
pub mod period;
pub mod price;
pub mod replay;
pub mod transaction;

pub use apportion::{apportion, apportion_year, Apportionment, SaleApportionment, TaggedDraw};
pub use capacity::{remaining_capacity, YearlyTaxReport};
pub use config::TaxConfig;
pub use engine::{surviving_lots, surviving_lots_as_of};
pub use holdings::{
    exempt_holdings, market_value_total, summarize, value_holdings, HoldingValuation,
    HoldingsSummary,
};
pub use lot::Lot;
pub use period::{holding_days, is_long_held};
pub use price::PriceLookup;
pub use replay::{replay, LotConsumptionEvent, LotDraw, LotQueue, Replay};
pub use transaction::{chronological, ParseKindError, Transaction, TransactionKind};

// Re-export commonly used external types
pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;
