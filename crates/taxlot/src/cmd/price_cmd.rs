//! Price fetching command.
//!
//! Fetches current prices for ledger instruments from Yahoo Finance and
//! prints them, or writes a JSON price map for `taxlot-report --prices`.

use crate::cmd::completions::ShellType;
use crate::cmd::{init_logging, load_ledger};
use crate::config::Settings;
use crate::price::{
    market_symbol, parse_mappings, PriceMap, PriceSource, PriceStatus, YahooFinance,
};
use anyhow::Result;
use clap::Parser;
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use taxlot_core::surviving_lots;
use tracing::{debug, warn};

/// Fetch current prices for instruments.
#[derive(Parser, Debug)]
#[command(name = "taxlot-price", about = "Fetch current prices for instruments")]
pub struct Args {
    /// Generate shell completions for the specified shell.
    #[arg(long, value_name = "SHELL", hide = true)]
    generate_completions: Option<ShellType>,

    #[command(flatten)]
    price_args: PriceArgs,
}

/// Price-specific arguments.
#[derive(Parser, Debug)]
pub struct PriceArgs {
    /// Ledger file to read held instruments from (optional).
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Specific instruments to fetch (e.g., CEZ, KOMB).
    #[arg(value_name = "SYMBOL")]
    pub symbols: Vec<String>,

    /// Symbol mapping overriding the `.PR` convention (e.g., ERSTE:EBS.VI).
    #[arg(short = 'm', long = "map", value_delimiter = ',')]
    pub mapping: Vec<String>,

    /// JSON config file (its `symbols` table is used as mapping).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output a JSON price map of the available prices.
    #[arg(long)]
    pub json: bool,

    /// Show verbose output.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Main entry point for the price command.
pub fn main() -> ExitCode {
    main_with_name("taxlot-price")
}

/// Main entry point with custom binary name.
pub fn main_with_name(bin_name: &str) -> ExitCode {
    let args = Args::parse();

    // Handle shell completion generation
    if let Some(shell) = args.generate_completions {
        crate::cmd::completions::generate_completions::<Args>(shell, bin_name);
        return ExitCode::SUCCESS;
    }

    init_logging(args.price_args.verbose);

    let mut stdout = io::stdout().lock();
    match run(&args.price_args, &YahooFinance::new(), &mut stdout) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Instruments to price: explicit symbols first, then those still held in the ledger.
fn instruments(args: &PriceArgs) -> Result<Vec<String>> {
    let mut instruments = args.symbols.clone();

    if let Some(file) = &args.file {
        let ledger = load_ledger(file)?;
        if !ledger.is_clean() {
            warn!(errors = ledger.errors.len(), "ledger has unreadable rows");
        }
        for lot in surviving_lots(&ledger.transactions) {
            if !instruments.contains(&lot.instrument) {
                instruments.push(lot.instrument);
            }
        }
    }

    Ok(instruments)
}

/// Run the price command against `source`.
pub fn run<S: PriceSource, W: Write>(args: &PriceArgs, source: &S, writer: &mut W) -> Result<()> {
    let mut mapping = match &args.config {
        Some(path) => Settings::load(path)?.symbols,
        None => BTreeMap::new(),
    };
    mapping.extend(parse_mappings(&args.mapping)?);

    let instruments = instruments(args)?;
    if instruments.is_empty() {
        eprintln!("No instruments to fetch. Provide symbols as arguments or use -f with a ledger.");
        return Ok(());
    }

    let mut statuses: BTreeMap<String, PriceStatus> = BTreeMap::new();
    for instrument in &instruments {
        let symbol = market_symbol(instrument, &mapping);
        debug!(%instrument, %symbol, source = source.name(), "fetching");

        let status = source.fetch_status(&symbol);
        if let PriceStatus::Error(message) = &status {
            warn!(%instrument, %symbol, %message, "price fetch failed");
        }
        statuses.insert(instrument.clone(), status);
    }

    if args.json {
        let prices = PriceMap::from_statuses(&statuses);
        writeln!(writer, "{}", serde_json::to_string_pretty(prices.as_map())?)?;
        return Ok(());
    }

    for instrument in &instruments {
        let symbol = market_symbol(instrument, &mapping);
        match &statuses[instrument] {
            PriceStatus::Available(price) => writeln!(writer, "{instrument}: {price} ({symbol})")?,
            PriceStatus::Unavailable => writeln!(writer, "{instrument}: unavailable ({symbol})")?,
            PriceStatus::Error(message) => {
                writeln!(writer, "{instrument}: error ({symbol}): {message}")?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::cell::RefCell;

    /// Serves canned prices and records which symbols were asked for.
    #[derive(Default)]
    struct Canned {
        prices: BTreeMap<&'static str, Decimal>,
        asked: RefCell<Vec<String>>,
    }

    impl PriceSource for Canned {
        fn fetch_price(&self, symbol: &str) -> Result<Option<Decimal>> {
            self.asked.borrow_mut().push(symbol.to_string());
            if symbol.starts_with("BAD") {
                anyhow::bail!("connection refused");
            }
            Ok(self.prices.get(symbol).copied())
        }

        fn name(&self) -> &'static str {
            "canned"
        }
    }

    fn price_args(argv: &[&str]) -> PriceArgs {
        let mut full = vec!["taxlot-price"];
        full.extend_from_slice(argv);
        Args::parse_from(full).price_args
    }

    #[test]
    fn test_price_args_parsing() {
        let args = price_args(&["CEZ", "KOMB", "-m", "ERSTE:EBS.VI,X:Y", "--json"]);
        assert_eq!(args.symbols, vec!["CEZ", "KOMB"]);
        assert_eq!(args.mapping.len(), 2);
        assert!(args.json);
    }

    #[test]
    fn test_text_output_with_statuses() {
        let source = Canned {
            prices: [("CEZ.PR", dec!(1020.5))].into(),
            ..Default::default()
        };
        let args = price_args(&["CEZ", "KOMB", "BAD", "-m", "KOMB:KOMB.XX"]);

        let mut out = Vec::new();
        run(&args, &source, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(*source.asked.borrow(), vec!["CEZ.PR", "KOMB.XX", "BAD.PR"]);
        assert!(text.contains("CEZ: 1020.5 (CEZ.PR)\n"));
        assert!(text.contains("KOMB: unavailable (KOMB.XX)\n"));
        assert!(text.contains("BAD: error (BAD.PR): connection refused\n"));
    }

    #[test]
    fn test_json_output_only_available() {
        let source = Canned {
            prices: [("CEZ.PR", dec!(1020.5))].into(),
            ..Default::default()
        };
        let args = price_args(&["CEZ", "KOMB", "--json"]);

        let mut out = Vec::new();
        run(&args, &source, &mut out).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json, serde_json::json!({"CEZ": "1020.5"}));
    }
}
