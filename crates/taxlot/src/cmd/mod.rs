//! Command implementations for CLI tools.
//!
//! Each module contains the full implementation for a command,
//! which can be invoked by thin wrapper binaries.

pub mod check;
pub mod completions;
pub mod price_cmd;
pub mod report_cmd;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use std::path::Path;
use taxlot_importer::{import_path, ImportResult};
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Install the tracing subscriber.
///
/// `--verbose` logs everything at DEBUG with span timings; otherwise
/// `RUST_LOG` decides, defaulting to warnings only.
pub fn init_logging(verbose: bool) {
    let result = if verbose {
        tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .with_span_events(FmtSpan::CLOSE)
            .with_writer(std::io::stderr)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .try_init()
    };
    // A subscriber may already be installed (tests); keep it.
    if let Err(e) = result {
        tracing::debug!(error = %e, "tracing subscriber already installed");
    }
}

/// Today's date on the local clock.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Import a ledger file, failing if it does not exist.
pub fn load_ledger(path: &Path) -> Result<ImportResult> {
    if !path.exists() {
        anyhow::bail!("file not found: {}", path.display());
    }
    tracing::debug!(path = %path.display(), "importing ledger");
    import_path(path)
}
