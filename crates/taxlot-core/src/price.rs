//! Market price lookup seam.

use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Source of current market prices, keyed by instrument.
///
/// `None` means the price is unknown. Callers must carry that through as
/// unknown rather than valuing the holding at zero.
pub trait PriceLookup {
    /// Current price for `instrument`, if known.
    fn price(&self, instrument: &str) -> Option<Decimal>;
}

impl PriceLookup for HashMap<String, Decimal> {
    fn price(&self, instrument: &str) -> Option<Decimal> {
        self.get(instrument).copied()
    }
}

impl PriceLookup for BTreeMap<String, Decimal> {
    fn price(&self, instrument: &str) -> Option<Decimal> {
        self.get(instrument).copied()
    }
}

/// No prices at all.
impl PriceLookup for () {
    fn price(&self, _instrument: &str) -> Option<Decimal> {
        None
    }
}

impl<P: PriceLookup + ?Sized> PriceLookup for &P {
    fn price(&self, instrument: &str) -> Option<Decimal> {
        (**self).price(instrument)
    }
}
