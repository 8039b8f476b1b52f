//! Diagnostic output shared by the commands.

use serde::Serialize;
use std::io::Write;
use taxlot_validate::{ErrorKind, ValidationError};

/// A diagnostic message in JSON format.
#[derive(Debug, Serialize)]
pub struct JsonDiagnostic {
    /// Error code (e.g., "E1001", "E2001")
    pub code: String,
    /// "validation" or "oversell"
    pub kind: &'static str,
    /// Error message
    pub message: String,
    /// Offending transaction id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<i64>,
    /// Offending instrument
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instrument: Option<String>,
    /// Offending transaction date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Optional context information (e.g. source row)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl From<&ValidationError> for JsonDiagnostic {
    fn from(error: &ValidationError) -> Self {
        Self {
            code: error.code.code().to_string(),
            kind: match error.kind() {
                ErrorKind::Validation => "validation",
                ErrorKind::Oversell => "oversell",
            },
            message: error.message.clone(),
            transaction_id: error.transaction_id,
            instrument: error.instrument.clone(),
            date: error.date.map(|d| d.to_string()),
            context: error.context.clone(),
        }
    }
}

/// JSON output structure for all diagnostics.
#[derive(Debug, Serialize)]
pub struct JsonOutput {
    /// List of diagnostics
    pub diagnostics: Vec<JsonDiagnostic>,
    /// Total error count
    pub error_count: usize,
    /// Number of transactions read
    pub transaction_count: usize,
}

/// Report validation errors to the given writer.
pub fn report_validation_errors<W: Write>(
    errors: &[ValidationError],
    writer: &mut W,
) -> std::io::Result<usize> {
    for error in errors {
        write!(writer, "error[{}]: {}", error.code, error.message)?;

        let location: Vec<String> = [
            error.instrument.clone(),
            error.date.map(|d| d.to_string()),
            error.transaction_id.map(|id| format!("#{id}")),
        ]
        .into_iter()
        .flatten()
        .collect();
        if location.is_empty() {
            writeln!(writer)?;
        } else {
            writeln!(writer, " ({})", location.join(", "))?;
        }

        if let Some(ctx) = &error.context {
            writeln!(writer, "  context: {ctx}")?;
        }
        writeln!(writer)?;
    }

    Ok(errors.len())
}

/// Print a summary of errors.
pub fn print_summary<W: Write>(errors: usize, writer: &mut W) -> std::io::Result<()> {
    if errors == 0 {
        writeln!(writer, "\x1b[32m\u{2713}\x1b[0m No errors found")
    } else {
        let error_text = if errors == 1 { "error" } else { "errors" };
        writeln!(writer, "\x1b[31m\u{2717}\x1b[0m {errors} {error_text}")
    }
}
