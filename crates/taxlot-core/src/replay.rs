//! The FIFO replay primitive.
//!
//! [`replay`] walks a transaction snapshot in chronological order, opening
//! a [`Lot`] for every buy and consuming lots oldest-first for every sell.
//! Each sell produces one [`LotConsumptionEvent`] handed to a caller-supplied
//! callback. The lot engine passes a no-op callback; the exemption
//! apportioner tags each draw with its age. Both therefore see exactly the
//! same draws.
//!
//! The replay performs no sufficiency check. A sell larger than the open
//! position drains every lot and reports the shortfall as
//! [`LotConsumptionEvent::unfilled`]; rejecting such ledgers is the job of
//! the oversell validator.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::{chronological, period, Lot, Transaction, TransactionKind};

/// One slice of a lot drawn down by a sell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LotDraw {
    /// Id of the buy that opened the lot
    pub source_id: i64,
    /// Acquisition date of the lot
    pub acquisition_date: NaiveDate,
    /// Effective cost per share of the lot
    pub effective_unit_cost: Decimal,
    /// Shares taken from the lot
    pub quantity: u64,
}

impl LotDraw {
    /// Cost basis of the drawn shares.
    #[must_use]
    pub fn cost_basis(&self) -> Decimal {
        self.effective_unit_cost * Decimal::from(self.quantity)
    }

    /// Days the drawn shares had been held on `sale_date`.
    #[must_use]
    pub fn holding_days(&self, sale_date: NaiveDate) -> i64 {
        period::holding_days(self.acquisition_date, sale_date)
    }
}

/// Which lots one sell consumed, in consumption order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotConsumptionEvent<'a> {
    /// The sell being replayed
    pub sale: &'a Transaction,
    /// Lots drawn down, oldest first
    pub draws: Vec<LotDraw>,
    /// Shares the open lots could not cover
    pub unfilled: u64,
}

impl LotConsumptionEvent<'_> {
    /// Shares actually matched against lots.
    #[must_use]
    pub fn filled(&self) -> u64 {
        self.draws.iter().map(|d| d.quantity).sum()
    }

    /// Total cost basis of the matched shares.
    #[must_use]
    pub fn cost_basis(&self) -> Decimal {
        self.draws.iter().map(LotDraw::cost_basis).sum()
    }
}

/// Open lots of one instrument, oldest at the front.
///
/// Consumption only ever pops from or shrinks the front, so draining the
/// queue never invalidates the position of lots still waiting behind it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LotQueue {
    lots: VecDeque<Lot>,
}

impl LotQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a lot in FIFO position.
    ///
    /// During a chronological replay every new lot belongs at the back;
    /// an out-of-order lot is placed by acquisition date, ties going after
    /// lots with a smaller insertion key.
    pub fn push(&mut self, lot: Lot) {
        if lot.is_depleted() {
            return;
        }
        let key = lot.fifo_key();
        let at = self.lots.partition_point(|l| l.fifo_key() <= key);
        self.lots.insert(at, lot);
    }

    /// Consume `quantity` shares from the front.
    ///
    /// Returns the draws made and the shares left uncovered.
    pub fn consume(&mut self, quantity: u64) -> (Vec<LotDraw>, u64) {
        let mut remaining = quantity;
        let mut draws = Vec::new();

        while remaining > 0 {
            let Some(front) = self.lots.front_mut() else {
                break;
            };

            let taken = front.take(remaining);
            draws.push(LotDraw {
                source_id: front.source_id,
                acquisition_date: front.acquisition_date,
                effective_unit_cost: front.effective_unit_cost,
                quantity: taken,
            });
            remaining -= taken;

            if front.is_depleted() {
                self.lots.pop_front();
            }
        }

        (draws, remaining)
    }

    /// Total shares held across all lots.
    #[must_use]
    pub fn quantity(&self) -> u64 {
        self.lots.iter().map(|l| l.remaining_quantity).sum()
    }

    /// Check if no lots remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    /// Number of open lots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lots.len()
    }

    /// Iterate over open lots, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }
}

/// Final state of a replay: open lots per instrument.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replay {
    queues: BTreeMap<String, LotQueue>,
}

impl Replay {
    /// Queue for one instrument, if it was ever bought.
    #[must_use]
    pub fn queue(&self, instrument: &str) -> Option<&LotQueue> {
        self.queues.get(instrument)
    }

    /// Iterate over all open lots, by instrument then FIFO order.
    pub fn lots(&self) -> impl Iterator<Item = &Lot> {
        self.queues.values().flat_map(LotQueue::iter)
    }

    /// Consume the replay into a flat list of open lots.
    ///
    /// Instruments whose position reached zero contribute nothing.
    #[must_use]
    pub fn into_lots(self) -> Vec<Lot> {
        self.queues
            .into_values()
            .flat_map(|q| q.lots.into_iter())
            .collect()
    }
}

/// Replay `transactions` through per-instrument FIFO queues.
///
/// `on_sale` is called once per sell, in chronological order, with the
/// draws that sell made.
pub fn replay<'a, F>(transactions: &'a [Transaction], mut on_sale: F) -> Replay
where
    F: FnMut(LotConsumptionEvent<'a>),
{
    let mut state = Replay::default();

    for txn in chronological(transactions) {
        match txn.kind {
            TransactionKind::Buy => {
                state
                    .queues
                    .entry(txn.instrument.clone())
                    .or_default()
                    .push(Lot::open(txn));
            }
            TransactionKind::Sell => {
                let (draws, unfilled) = match state.queues.get_mut(&txn.instrument) {
                    Some(queue) => queue.consume(txn.quantity),
                    None => (Vec::new(), txn.quantity),
                };
                on_sale(LotConsumptionEvent {
                    sale: txn,
                    draws,
                    unfilled,
                });
            }
        }
    }

    state.queues.retain(|_, q| !q.is_empty());
    state
}
