//! Transaction type and chronological ordering.
//!
//! A [`Transaction`] is an immutable buy or sell fact supplied by the ledger.
//! The engine never mutates one; it only reads transactions in the order
//! produced by [`chronological`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Acquisition of shares. Opens a new lot.
    Buy,
    /// Disposal of shares. Consumes lots oldest-first.
    Sell,
}

/// Error returned when a transaction kind cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown transaction kind: {0} (expected 'buy' or 'sell')")]
pub struct ParseKindError(pub String);

impl FromStr for TransactionKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            _ => Err(ParseKindError(s.to_string())),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// A single buy or sell of an instrument.
///
/// `sequence` is the ledger's insertion-order key. Transactions on the same
/// date are processed strictly in ascending `sequence` order.
///
/// # Examples
///
/// ```
/// use taxlot_core::{Transaction, TransactionKind};
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let sell = Transaction::new(
///     7,
///     TransactionKind::Sell,
///     "KOMB",
///     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
///     dec!(150),
///     15,
/// )
/// .with_fees(dec!(5));
///
/// assert_eq!(sell.gross_value(), dec!(2250));
/// assert_eq!(sell.net_value(), dec!(2245));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Ledger identifier
    pub id: i64,
    /// Buy or sell
    pub kind: TransactionKind,
    /// Instrument (stock) name
    pub instrument: String,
    /// Trade date
    pub date: NaiveDate,
    /// Price per share
    pub unit_price: Decimal,
    /// Number of shares
    pub quantity: u64,
    /// Transaction fees
    #[serde(default)]
    pub fees: Decimal,
    /// Insertion-order key (tie-break for same-date transactions)
    #[serde(default)]
    pub sequence: u64,
}

impl Transaction {
    /// Create a new transaction without fees.
    ///
    /// The insertion key defaults to the id (zero for a negative id); use
    /// [`Self::with_sequence`] when the ledger's arrival order differs from
    /// id order.
    #[must_use]
    pub fn new(
        id: i64,
        kind: TransactionKind,
        instrument: impl Into<String>,
        date: NaiveDate,
        unit_price: Decimal,
        quantity: u64,
    ) -> Self {
        Self {
            id,
            kind,
            instrument: instrument.into(),
            date,
            unit_price,
            quantity,
            fees: Decimal::ZERO,
            sequence: u64::try_from(id).unwrap_or(0),
        }
    }

    /// Set the fees on this transaction.
    #[must_use]
    pub fn with_fees(mut self, fees: Decimal) -> Self {
        self.fees = fees;
        self
    }

    /// Set the insertion-order key.
    #[must_use]
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Check if this is a buy.
    #[must_use]
    pub fn is_buy(&self) -> bool {
        self.kind == TransactionKind::Buy
    }

    /// Check if this is a sell.
    #[must_use]
    pub fn is_sell(&self) -> bool {
        self.kind == TransactionKind::Sell
    }

    /// Price times quantity, before fees.
    #[must_use]
    pub fn gross_value(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }

    /// Value after fees: a buy costs `gross + fees`, a sell yields `gross - fees`.
    #[must_use]
    pub fn net_value(&self) -> Decimal {
        match self.kind {
            TransactionKind::Buy => self.gross_value() + self.fees,
            TransactionKind::Sell => self.gross_value() - self.fees,
        }
    }

    /// [`Self::net_value`], or `None` if it does not fit in a `Decimal`.
    #[must_use]
    pub fn checked_net_value(&self) -> Option<Decimal> {
        let gross = self.unit_price.checked_mul(Decimal::from(self.quantity))?;
        match self.kind {
            TransactionKind::Buy => gross.checked_add(self.fees),
            TransactionKind::Sell => gross.checked_sub(self.fees),
        }
    }

    /// Signed change this transaction applies to the instrument's position.
    #[must_use]
    pub fn signed_quantity(&self) -> i128 {
        match self.kind {
            TransactionKind::Buy => i128::from(self.quantity),
            TransactionKind::Sell => -i128::from(self.quantity),
        }
    }

    /// Ordering key: date first, then insertion order.
    #[must_use]
    pub const fn order_key(&self) -> (NaiveDate, u64) {
        (self.date, self.sequence)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {} {} x {} @ {}",
            self.id, self.date, self.kind, self.instrument, self.quantity, self.unit_price
        )?;
        if !self.fees.is_zero() {
            write!(f, " (fees {})", self.fees)?;
        }
        Ok(())
    }
}

/// Order transactions by date, breaking ties by insertion order.
///
/// The sort is stable, so transactions sharing both date and sequence keep
/// the order in which the ledger supplied them.
pub fn chronological(transactions: &[Transaction]) -> Vec<&Transaction> {
    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    sorted.sort_by_key(|t| t.order_key());
    sorted
}
