//! Implementation of the `taxlot-check` command.

use crate::cmd::completions::ShellType;
use crate::cmd::{init_logging, load_ledger, today};
use crate::config::ConfigArgs;
use crate::gate;
use crate::report::{self, JsonDiagnostic, JsonOutput};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use taxlot_validate::validate_fields;
use tracing::info;

/// Output format for diagnostics.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output (default)
    #[default]
    Text,
    /// JSON output for tooling integration
    Json,
}

/// Validate a ledger and detect oversells.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// The ledger file to check (CSV or JSON)
    #[arg(value_name = "FILE", required_unless_present = "generate_completions")]
    pub file: Option<PathBuf>,

    /// Generate shell completions and exit
    #[arg(long, value_name = "SHELL", hide = true)]
    pub generate_completions: Option<ShellType>,

    /// Show verbose output including timing information
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all output (just use exit code)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format (text or json)
    #[arg(long, short = 'f', value_enum, default_value = "text")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Run the check and write diagnostics to `writer`.
///
/// Returns exit code 1 when the ledger has any problem.
pub fn run<W: Write>(args: &Args, writer: &mut W) -> Result<ExitCode> {
    let start = std::time::Instant::now();
    let file = args.file.as_ref().context("no ledger file given")?;
    let resolved = args.config.resolve(today())?;

    let import = load_ledger(file)?;
    let mut errors = import.errors;

    // Positions built from a partially imported ledger mean nothing, so the
    // oversell replay only runs when every row parsed.
    if errors.is_empty() {
        if let Err(e) = gate(&import.transactions, &resolved.validation) {
            errors.extend(e.diagnostics().iter().cloned());
        }
    } else {
        errors.extend(validate_fields(&import.transactions, &resolved.validation));
    }

    info!(
        transactions = import.transactions.len(),
        errors = errors.len(),
        "check finished"
    );

    match args.format {
        OutputFormat::Json => {
            let output = JsonOutput {
                diagnostics: errors.iter().map(JsonDiagnostic::from).collect(),
                error_count: errors.len(),
                transaction_count: import.transactions.len(),
            };
            writeln!(writer, "{}", serde_json::to_string_pretty(&output)?)?;
        }
        OutputFormat::Text if !args.quiet => {
            report::report_validation_errors(&errors, writer)?;
            if args.verbose {
                writeln!(
                    writer,
                    "Checked {} transactions in {:.2}ms",
                    import.transactions.len(),
                    start.elapsed().as_secs_f64() * 1000.0
                )?;
            }
            report::print_summary(errors.len(), writer)?;
        }
        OutputFormat::Text => {}
    }

    if errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(1))
    }
}

/// Main entry point for the check command.
pub fn main() -> ExitCode {
    main_with_name("taxlot-check")
}

/// Main entry point with custom binary name.
pub fn main_with_name(bin_name: &str) -> ExitCode {
    let args = Args::parse();

    // Handle shell completion generation
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
