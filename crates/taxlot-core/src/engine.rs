//! Lot accounting: which lots survive a full replay.

use chrono::NaiveDate;

use crate::{replay, Lot, Transaction};

/// Replay every transaction and return the lots still open.
///
/// Lots are ordered by instrument name, then oldest acquisition first.
/// The ledger is assumed to have passed the oversell check; a sell that
/// exceeds the position simply empties the instrument.
pub fn surviving_lots(transactions: &[Transaction]) -> Vec<Lot> {
    replay(transactions, |_| {}).into_lots()
}

/// Like [`surviving_lots`], ignoring transactions dated after `as_of`.
pub fn surviving_lots_as_of(transactions: &[Transaction], as_of: NaiveDate) -> Vec<Lot> {
    let visible: Vec<Transaction> = transactions
        .iter()
        .filter(|t| t.date <= as_of)
        .cloned()
        .collect();
    surviving_lots(&visible)
}
