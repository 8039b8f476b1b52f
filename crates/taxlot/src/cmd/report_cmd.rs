//! taxlot-report - Lot, holdings and tax reports for a ledger.
//!
//! # Usage
//!
//! ```bash
//! taxlot-report ledger.csv lots
//! taxlot-report ledger.csv holdings --prices prices.json
//! taxlot-report ledger.csv exempt --as-of 2024-12-31
//! taxlot-report ledger.csv tax --year 2024
//! taxlot-report ledger.csv transactions --format csv
//! ```
//!
//! # Reports
//!
//! - `lots` - Open lots with age and exemption status
//! - `holdings` - Per-instrument holdings with market value where known
//! - `exempt` - Holdings past the exemption threshold
//! - `tax` - Sales apportionment and remaining exemption capacity
//! - `transactions` - The ledger in chronological order

use crate::cmd::completions::ShellType;
use crate::cmd::{init_logging, load_ledger, today};
use crate::config::ConfigArgs;
use crate::export;
use crate::price::PriceMap;
use crate::report::report_validation_errors;
use crate::{analyze, PortfolioReport};
use anyhow::{bail, Context, Result};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use taxlot_core::{chronological, HoldingValuation, TaxConfig, Transaction};

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable tables (default)
    #[default]
    Text,
    /// JSON
    Json,
    /// CSV (lots, holdings, exempt and transactions only)
    Csv,
}

/// Generate reports from a ledger.
#[derive(Parser, Debug)]
#[command(name = "taxlot-report")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The ledger file to process (CSV or JSON)
    #[arg(value_name = "FILE", required_unless_present = "generate_completions")]
    pub file: Option<PathBuf>,

    /// The report to generate
    #[command(subcommand)]
    pub report: Option<Report>,

    /// Generate shell completions and exit
    #[arg(long, value_name = "SHELL", hide = true)]
    pub generate_completions: Option<ShellType>,

    /// Evaluation date for holdings (defaults to today)
    #[arg(long, value_name = "DATE", global = true)]
    pub as_of: Option<NaiveDate>,

    /// JSON file mapping instrument to current price
    #[arg(long, value_name = "FILE", global = true)]
    pub prices: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub format: ReportFormat,

    /// Show verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Available reports.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// Open lots with age and exemption status
    Lots,
    /// Per-instrument holdings
    Holdings,
    /// Holdings past the exemption threshold
    Exempt,
    /// Sales apportionment and remaining exemption capacity
    Tax {
        /// Tax year (defaults to the year of the evaluation date)
        #[arg(short, long)]
        year: Option<i32>,
    },
    /// The ledger in chronological order
    Transactions {
        /// Only show this instrument
        #[arg(short, long)]
        instrument: Option<String>,
    },
}

/// Main entry point for the report command.
pub fn main() -> ExitCode {
    main_with_name("taxlot-report")
}

/// Main entry point with custom binary name.
pub fn main_with_name(bin_name: &str) -> ExitCode {
    let args = Args::parse();

    if let Some(shell) = args.generate_completions {
        crate::cmd::completions::generate_completions::<Args>(shell, bin_name);
        return ExitCode::SUCCESS;
    }

    init_logging(args.verbose);

    let mut stdout = io::stdout().lock();
    match run(&args, &mut stdout) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Run the report command, writing the report to `writer`.
///
/// A ledger that fails validation produces its diagnostics and exit code 1
/// instead of a report.
pub fn run<W: Write>(args: &Args, writer: &mut W) -> Result<ExitCode> {
    let file = args.file.as_ref().context("no ledger file given")?;
    let report = args
        .report
        .as_ref()
        .context("no report given (lots, holdings, exempt, tax or transactions)")?;

    let today = today();
    let resolved = args.config.resolve(today)?;
    let as_of = args.as_of.unwrap_or(today);
    let year = match report {
        Report::Tax { year: Some(year) } => *year,
        _ => as_of.year(),
    };
    let prices = match &args.prices {
        Some(path) => PriceMap::load(path)?,
        None => PriceMap::default(),
    };

    if args.format == ReportFormat::Csv && matches!(report, Report::Tax { .. }) {
        bail!("CSV output is not available for the tax report");
    }

    let import = load_ledger(file)?;
    if !import.is_clean() {
        report_validation_errors(&import.errors, writer)?;
        return Ok(ExitCode::from(1));
    }

    let analysis = match analyze(
        &import.transactions,
        &resolved.tax,
        &resolved.validation,
        year,
        as_of,
        &prices,
    ) {
        Ok(analysis) => analysis,
        Err(e) => {
            writeln!(writer, "error: {e}")?;
            report_validation_errors(e.diagnostics(), writer)?;
            return Ok(ExitCode::from(1));
        }
    };

    match report {
        Report::Lots => report_lots(&analysis, &resolved.tax, args.format, writer)?,
        Report::Holdings => report_holdings(&analysis, args.format, writer)?,
        Report::Exempt => report_exempt(&analysis, &resolved.tax, args.format, writer)?,
        Report::Tax { .. } => report_tax(&analysis, args.format, writer)?,
        Report::Transactions { instrument } => {
            let rows: Vec<&Transaction> = chronological(&import.transactions)
                .into_iter()
                .filter(|t| instrument.as_deref().map_or(true, |i| t.instrument == i))
                .collect();
            report_transactions(&rows, args.format, writer)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn money(value: Decimal) -> String {
    format!("{value:.2}")
}

fn known(value: Option<Decimal>) -> String {
    value.map_or_else(|| "n/a".to_string(), money)
}

fn json<W: Write, T: Serialize + ?Sized>(value: &T, writer: &mut W) -> Result<()> {
    writeln!(writer, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn heading<W: Write>(writer: &mut W, title: &str, width: usize) -> Result<()> {
    writeln!(writer, "{title}")?;
    writeln!(writer, "{}", "=".repeat(width))?;
    writeln!(writer)?;
    Ok(())
}

/// Generate the open lots report.
fn report_lots<W: Write>(
    analysis: &PortfolioReport,
    config: &TaxConfig,
    format: ReportFormat,
    writer: &mut W,
) -> Result<()> {
    let threshold = config.exemption_threshold_days;
    match format {
        ReportFormat::Json => return json(&analysis.lots, writer),
        ReportFormat::Csv => {
            return export::write_lots(&analysis.lots, analysis.as_of, threshold, writer)
        }
        ReportFormat::Text => {}
    }

    heading(writer, &format!("Open Lots as of {}", analysis.as_of), 72)?;

    if analysis.lots.is_empty() {
        writeln!(writer, "No open lots.")?;
        return Ok(());
    }

    let mut current = "";
    for lot in &analysis.lots {
        if lot.instrument != current {
            if !current.is_empty() {
                writeln!(writer)?;
            }
            writeln!(writer, "{}:", lot.instrument)?;
            current = lot.instrument.as_str();
        }
        let status = if lot.is_long_held(analysis.as_of, threshold) {
            "exempt"
        } else {
            ""
        };
        writeln!(
            writer,
            "  {}  #{:<6} {:>8} @ {:>12}  cost {:>14}  {:>6} days  {status}",
            lot.acquisition_date,
            lot.source_id,
            lot.remaining_quantity,
            money(lot.effective_unit_cost),
            money(lot.book_value()),
            lot.holding_days(analysis.as_of),
        )?;
    }

    Ok(())
}

fn holdings_table<W: Write>(holdings: &[HoldingValuation], writer: &mut W) -> Result<()> {
    writeln!(
        writer,
        "{:<16} {:>10} {:>12} {:>14} {:>12} {:>14} {:>14} {:>10}",
        "Instrument", "Quantity", "Avg cost", "Total cost", "Price", "Value", "P/L", "Exempt"
    )?;
    for valuation in holdings {
        let holding = &valuation.holding;
        writeln!(
            writer,
            "{:<16} {:>10} {:>12} {:>14} {:>12} {:>14} {:>14} {:>10}",
            holding.instrument,
            holding.quantity,
            money(holding.average_cost),
            money(holding.total_cost),
            known(valuation.market_price),
            known(valuation.market_value),
            known(valuation.unrealized_gain),
            holding.exempt_quantity,
        )?;
    }
    Ok(())
}

#[derive(Serialize)]
struct HoldingsOutput<'a> {
    as_of: NaiveDate,
    holdings: &'a [HoldingValuation],
    market_value: Option<Decimal>,
}

/// Generate the holdings report.
fn report_holdings<W: Write>(
    analysis: &PortfolioReport,
    format: ReportFormat,
    writer: &mut W,
) -> Result<()> {
    match format {
        ReportFormat::Json => json(
            &HoldingsOutput {
                as_of: analysis.as_of,
                holdings: &analysis.holdings,
                market_value: analysis.portfolio_market_value,
            },
            writer,
        ),
        ReportFormat::Csv => export::write_holdings(&analysis.holdings, writer),
        ReportFormat::Text => {
            heading(writer, &format!("Holdings as of {}", analysis.as_of), 110)?;
            if analysis.holdings.is_empty() {
                writeln!(writer, "No holdings.")?;
                return Ok(());
            }
            holdings_table(&analysis.holdings, writer)?;
            writeln!(writer)?;
            writeln!(
                writer,
                "Total market value: {}",
                known(analysis.portfolio_market_value)
            )?;
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct ExemptOutput<'a> {
    as_of: NaiveDate,
    threshold_days: i64,
    holdings: &'a [HoldingValuation],
    cost_total: Decimal,
    market_value: Option<Decimal>,
}

/// Generate the exempt holdings report.
fn report_exempt<W: Write>(
    analysis: &PortfolioReport,
    config: &TaxConfig,
    format: ReportFormat,
    writer: &mut W,
) -> Result<()> {
    match format {
        ReportFormat::Json => json(
            &ExemptOutput {
                as_of: analysis.as_of,
                threshold_days: config.exemption_threshold_days,
                holdings: &analysis.exempt_holdings,
                cost_total: analysis.exempt_cost_total,
                market_value: analysis.exempt_market_value,
            },
            writer,
        ),
        ReportFormat::Csv => export::write_holdings(&analysis.exempt_holdings, writer),
        ReportFormat::Text => {
            heading(
                writer,
                &format!(
                    "Holdings Held {}+ Days as of {}",
                    config.exemption_threshold_days, analysis.as_of
                ),
                110,
            )?;
            if analysis.exempt_holdings.is_empty() {
                writeln!(writer, "No holdings past the exemption threshold.")?;
                return Ok(());
            }
            holdings_table(&analysis.exempt_holdings, writer)?;
            writeln!(writer)?;
            writeln!(writer, "Exempt cost basis:   {}", money(analysis.exempt_cost_total))?;
            match analysis.exempt_market_value {
                Some(value) => writeln!(writer, "Exempt market value: {}", money(value))?,
                None => writeln!(writer, "Exempt market value: unknown (missing prices)")?,
            }
            Ok(())
        }
    }
}

/// Generate the yearly tax report.
fn report_tax<W: Write>(
    analysis: &PortfolioReport,
    format: ReportFormat,
    writer: &mut W,
) -> Result<()> {
    let tax = &analysis.tax;
    if format == ReportFormat::Json {
        return json(tax, writer);
    }

    heading(writer, &format!("Tax Year {}", tax.year), 60)?;
    writeln!(writer, "Sales (net of fees):  {:>16}", money(tax.total_sales))?;
    writeln!(writer, "Exempt portion:       {:>16}", money(tax.exempt_sales_total))?;
    writeln!(writer, "Taxable portion:      {:>16}", money(tax.taxable_sales_total))?;
    writeln!(writer, "Annual limit:         {:>16}", money(tax.annual_exemption_limit))?;
    writeln!(
        writer,
        "Remaining capacity:   {:>16}",
        money(tax.remaining_exemption_capacity)
    )?;
    if !tax.within_exemption() {
        writeln!(writer, "Taxable sales exceed the annual exemption limit.")?;
    }
    writeln!(writer)?;

    if tax.sales.is_empty() {
        writeln!(writer, "No sales in {}.", tax.year)?;
        return Ok(());
    }

    writeln!(writer, "Sales:")?;
    for sale in &tax.sales {
        writeln!(
            writer,
            "  {}  #{:<6} {:<16} {:>8} shares  net {:>14}  exempt {:>14}  taxable {:>14}",
            sale.date,
            sale.transaction_id,
            sale.instrument,
            sale.quantity,
            money(sale.net_value),
            money(sale.exempt_portion),
            money(sale.taxable_portion),
        )?;
        for tagged in &sale.draws {
            writeln!(
                writer,
                "      from #{:<6} {}  {:>8} @ {:>12}  {:>6} days{}",
                tagged.draw.source_id,
                tagged.draw.acquisition_date,
                tagged.draw.quantity,
                money(tagged.draw.effective_unit_cost),
                tagged.holding_days,
                if tagged.exempt { "  exempt" } else { "" },
            )?;
        }
    }

    Ok(())
}

/// Generate the transactions list.
fn report_transactions<W: Write>(
    transactions: &[&Transaction],
    format: ReportFormat,
    writer: &mut W,
) -> Result<()> {
    match format {
        ReportFormat::Json => json(transactions, writer),
        ReportFormat::Csv => export::write_transactions(transactions.iter().copied(), writer),
        ReportFormat::Text => {
            heading(writer, &format!("Transactions ({} total)", transactions.len()), 60)?;
            for txn in transactions {
                writeln!(writer, "{txn}  net {}", money(txn.net_value()))?;
            }
            Ok(())
        }
    }
}
