//! Portfolio tax tools.
//!
//! This crate ties the taxlot libraries into an analysis pipeline and
//! provides the command-line tools built on it:
//!
//! - `taxlot-check`: Validate a ledger and detect oversells
//! - `taxlot-report`: Lots, holdings, exempt holdings and yearly tax reports
//! - `taxlot-price`: Fetch current market prices
//!
//! # Example Usage
//!
//! ```bash
//! taxlot-check ledger.csv
//! taxlot-report ledger.csv tax --year 2024
//! taxlot-price CEZ KOMB --json > prices.json
//! taxlot-report ledger.csv exempt --prices prices.json
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod analysis;
pub mod cmd;
pub mod config;
pub mod export;
pub mod price;
pub mod report;

pub use analysis::{analyze, gate, AnalysisError, PortfolioReport};
