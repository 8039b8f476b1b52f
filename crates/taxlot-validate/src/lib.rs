//! Ledger validation rules.
//!
//! This crate implements the checks a transaction snapshot must pass before
//! any lot or tax computation runs:
//!
//! - Field validation (positive price and quantity, non-negative fees,
//!   a usable instrument name and date)
//! - Insertion-key uniqueness
//! - Value bounds, so no later computation can overflow
//! - Oversell detection (no instrument's position ever goes negative)
//!
//! # Error Codes
//!
//! | Code | Description |
//! |------|-------------|
//! | E1001 | Price not positive |
//! | E1002 | Quantity not positive |
//! | E1003 | Negative fees |
//! | E1004 | Missing instrument name |
//! | E1005 | Unparseable date |
//! | E1006 | Date out of accepted range |
//! | E1007 | Value above configured limit |
//! | E1008 | Duplicate insertion key |
//! | E1009 | Unknown transaction kind |
//! | E1010 | Unparseable id or insertion key |
//! | E1011 | Unparseable fees |
//! | E2001 | Oversell |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use taxlot_core::{chronological, Transaction, TransactionKind};
use thiserror::Error;

/// Date format accepted for transaction dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Ceiling on the summed value (`price * quantity + fees`) of a ledger.
///
/// 2^92, a sixteenth of `Decimal::MAX`. Every cost, proceeds and capacity
/// total derived from a ledger under this ceiling fits in a `Decimal`.
pub const MAX_LEDGER_VALUE: Decimal = Decimal::from_parts(0, 0, 0x1000_0000, false, 0);

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // === Field Errors (E1xxx) ===
    /// E1001: Unit price is zero or negative.
    InvalidPrice,
    /// E1002: Quantity is zero.
    InvalidQuantity,
    /// E1003: Fees are negative.
    NegativeFees,
    /// E1004: Instrument name is empty.
    MissingInstrument,
    /// E1005: Date could not be parsed.
    InvalidDate,
    /// E1006: Date before the earliest or after the latest accepted date.
    DateOutOfRange,
    /// E1007: Price, quantity or fees above the configured limit.
    LimitExceeded,
    /// E1008: Two transactions share an insertion key.
    DuplicateSequence,
    /// E1009: Transaction kind is neither buy nor sell.
    UnknownKind,
    /// E1010: Id or insertion key is not an integer.
    InvalidId,
    /// E1011: Fees could not be parsed as a number.
    InvalidFees,

    // === Position Errors (E2xxx) ===
    /// E2001: A sell would take the position below zero.
    Oversell,
}

impl ErrorCode {
    /// Get the error code string (e.g., "E1001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidPrice => "E1001",
            Self::InvalidQuantity => "E1002",
            Self::NegativeFees => "E1003",
            Self::MissingInstrument => "E1004",
            Self::InvalidDate => "E1005",
            Self::DateOutOfRange => "E1006",
            Self::LimitExceeded => "E1007",
            Self::DuplicateSequence => "E1008",
            Self::UnknownKind => "E1009",
            Self::InvalidId => "E1010",
            Self::InvalidFees => "E1011",
            Self::Oversell => "E2001",
        }
    }

    /// Which class of failure this code belongs to.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Oversell => ErrorKind::Oversell,
            _ => ErrorKind::Validation,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Class of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A malformed transaction.
    Validation,
    /// A position that would go negative.
    Oversell,
}

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("[{code}] {message}")]
pub struct ValidationError {
    /// Error code.
    pub code: ErrorCode,
    /// Error message.
    pub message: String,
    /// Id of the offending transaction, if it got that far.
    pub transaction_id: Option<i64>,
    /// Instrument of the offending transaction.
    pub instrument: Option<String>,
    /// Date of the offending transaction.
    pub date: Option<NaiveDate>,
    /// Additional context (e.g. source row).
    pub context: Option<String>,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            transaction_id: None,
            instrument: None,
            date: None,
            context: None,
        }
    }

    /// Attach the offending transaction.
    #[must_use]
    pub fn for_transaction(mut self, txn: &Transaction) -> Self {
        self.transaction_id = Some(txn.id);
        self.instrument = Some(txn.instrument.clone());
        self.date = Some(txn.date);
        self
    }

    /// Add context to this error.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Class of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.code.kind()
    }
}

/// Validation options.
#[derive(Debug, Clone)]
pub struct ValidationOptions {
    /// Maximum accepted unit price.
    pub max_price: Option<Decimal>,
    /// Maximum accepted quantity.
    pub max_quantity: Option<u64>,
    /// Maximum accepted fees.
    pub max_fees: Option<Decimal>,
    /// Earliest accepted transaction date.
    pub earliest_date: NaiveDate,
    /// Latest accepted transaction date (usually today).
    pub latest_date: Option<NaiveDate>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            max_price: None,
            max_quantity: None,
            max_fees: None,
            earliest_date: NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or(NaiveDate::MIN),
            latest_date: None,
        }
    }
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| {
        ValidationError::new(
            ErrorCode::InvalidDate,
            format!("Invalid date '{}'. Use YYYY-MM-DD", s.trim()),
        )
    })
}

/// Parse a transaction kind (`buy` or `sell`).
pub fn parse_kind(s: &str) -> Result<TransactionKind, ValidationError> {
    s.parse::<TransactionKind>()
        .map_err(|e| ValidationError::new(ErrorCode::UnknownKind, e.to_string()))
}

/// `|price| * quantity + |fees|`, or `None` on overflow.
fn transaction_value(txn: &Transaction) -> Option<Decimal> {
    txn.unit_price
        .abs()
        .checked_mul(Decimal::from(txn.quantity))?
        .checked_add(txn.fees.abs())
}

/// Check the fields of a single transaction.
pub fn validate_transaction(txn: &Transaction, options: &ValidationOptions) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut push = |code: ErrorCode, message: String| {
        errors.push(ValidationError::new(code, message).for_transaction(txn));
    };

    if txn.instrument.trim().is_empty() {
        push(
            ErrorCode::MissingInstrument,
            format!("Transaction #{} has no instrument name", txn.id),
        );
    }

    if txn.unit_price <= Decimal::ZERO {
        push(
            ErrorCode::InvalidPrice,
            format!("Price must be greater than 0, got {}", txn.unit_price),
        );
    } else if let Some(max) = options.max_price.filter(|max| txn.unit_price > *max) {
        push(
            ErrorCode::LimitExceeded,
            format!("Price {} exceeds the limit of {max}", txn.unit_price),
        );
    }

    if txn.quantity == 0 {
        push(
            ErrorCode::InvalidQuantity,
            "Quantity must be greater than 0".to_string(),
        );
    } else if let Some(max) = options.max_quantity.filter(|max| txn.quantity > *max) {
        push(
            ErrorCode::LimitExceeded,
            format!("Quantity {} exceeds the limit of {max}", txn.quantity),
        );
    }

    if txn.fees < Decimal::ZERO {
        push(
            ErrorCode::NegativeFees,
            format!("Fees cannot be negative, got {}", txn.fees),
        );
    } else if let Some(max) = options.max_fees.filter(|max| txn.fees > *max) {
        push(
            ErrorCode::LimitExceeded,
            format!("Fees {} exceed the limit of {max}", txn.fees),
        );
    }

    if transaction_value(txn).map_or(true, |value| value > MAX_LEDGER_VALUE) {
        push(
            ErrorCode::LimitExceeded,
            format!(
                "Value of {} x {} plus fees {} exceeds {MAX_LEDGER_VALUE}",
                txn.quantity, txn.unit_price, txn.fees
            ),
        );
    }

    if txn.date < options.earliest_date {
        push(
            ErrorCode::DateOutOfRange,
            format!("Date {} is before {}", txn.date, options.earliest_date),
        );
    }
    if let Some(latest) = options.latest_date.filter(|latest| txn.date > *latest) {
        push(
            ErrorCode::DateOutOfRange,
            format!("Date {} is in the future (after {latest})", txn.date),
        );
    }

    errors
}

/// Running signed position per instrument.
///
/// Transactions must be applied in chronological order; the first sell
/// that would take a position below zero is rejected.
#[derive(Debug, Clone, Default)]
pub struct PositionTracker {
    positions: BTreeMap<String, i128>,
}

impl PositionTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current position in `instrument`.
    #[must_use]
    pub fn position(&self, instrument: &str) -> i128 {
        self.positions.get(instrument).copied().unwrap_or(0)
    }

    /// Apply one transaction, rejecting it if it oversells.
    ///
    /// A rejected transaction leaves the tracker unchanged.
    pub fn apply(&mut self, txn: &Transaction) -> Result<(), ValidationError> {
        let held = self.position(&txn.instrument);
        let next = held + txn.signed_quantity();

        if next < 0 {
            return Err(ValidationError::new(
                ErrorCode::Oversell,
                format!(
                    "Sell #{} of {} {} on {} exceeds the position of {held}",
                    txn.id, txn.quantity, txn.instrument, txn.date
                ),
            )
            .for_transaction(txn));
        }

        self.positions.insert(txn.instrument.clone(), next);
        Ok(())
    }
}

/// Replay `transactions` and fail on the first oversell.
///
/// Same-date transactions are taken in insertion order; a later buy never
/// covers an earlier sell.
pub fn check_oversell(transactions: &[Transaction]) -> Result<(), ValidationError> {
    let mut tracker = PositionTracker::new();
    for txn in chronological(transactions) {
        tracker.apply(txn)?;
    }
    Ok(())
}

/// Check every transaction's fields, the uniqueness of insertion keys and
/// the ledger's total value.
pub fn validate_fields(
    transactions: &[Transaction],
    options: &ValidationOptions,
) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen: HashMap<u64, i64> = HashMap::new();
    let mut total = Some(Decimal::ZERO);

    for txn in transactions {
        errors.extend(validate_transaction(txn, options));

        // Oversized single transactions were reported above.
        if let (Some(sum), Some(value)) = (total, transaction_value(txn)) {
            total = sum.checked_add(value).filter(|t| *t <= MAX_LEDGER_VALUE);
            if total.is_none() && value <= MAX_LEDGER_VALUE {
                errors.push(
                    ValidationError::new(
                        ErrorCode::LimitExceeded,
                        format!("Ledger value exceeds {MAX_LEDGER_VALUE} at transaction #{}", txn.id),
                    )
                    .for_transaction(txn),
                );
            }
        }

        if let Some(first) = seen.insert(txn.sequence, txn.id) {
            errors.push(
                ValidationError::new(
                    ErrorCode::DuplicateSequence,
                    format!(
                        "Transactions #{first} and #{} share insertion key {}",
                        txn.id, txn.sequence
                    ),
                )
                .for_transaction(txn),
            );
        }
    }

    errors
}

/// Validate a transaction snapshot.
///
/// Returns a list of validation errors found.
pub fn validate(transactions: &[Transaction]) -> Vec<ValidationError> {
    validate_with_options(transactions, &ValidationOptions::default())
}

/// Validate a transaction snapshot with custom options.
///
/// The oversell replay only runs once every transaction is well-formed,
/// since positions built from malformed rows mean nothing.
pub fn validate_with_options(
    transactions: &[Transaction],
    options: &ValidationOptions,
) -> Vec<ValidationError> {
    let errors = validate_fields(transactions, options);
    if !errors.is_empty() {
        return errors;
    }

    match check_oversell(transactions) {
        Ok(()) => Vec::new(),
        Err(e) => vec![e],
    }
}
