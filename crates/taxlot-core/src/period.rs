//! Holding-period arithmetic.
//!
//! Both the live-holdings view (anchored on an evaluation date) and the
//! historical apportionment (anchored on each sale date) classify lots
//! through these two functions, so the exemption boundary is identical
//! for both even though the anchors differ.

use chrono::NaiveDate;

/// Whole days between acquisition and the anchor date.
#[must_use]
pub fn holding_days(acquired: NaiveDate, anchor: NaiveDate) -> i64 {
    (anchor - acquired).num_days()
}

/// A lot qualifies for the long-holding exemption once it has been held
/// for at least `threshold_days` at the anchor date.
#[must_use]
pub fn is_long_held(acquired: NaiveDate, anchor: NaiveDate, threshold_days: i64) -> bool {
    holding_days(acquired, anchor) >= threshold_days
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_boundary_is_inclusive() {
        let acquired = NaiveDate::from_ymd_opt(2020, 3, 15).unwrap();
        let exact = acquired + Duration::days(1095);

        assert_eq!(holding_days(acquired, exact), 1095);
        assert!(is_long_held(acquired, exact, 1095));
        assert!(!is_long_held(acquired, exact - Duration::days(1), 1095));
    }

    #[test]
    fn test_anchor_before_acquisition() {
        let acquired = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let anchor = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(holding_days(acquired, anchor), -9);
        assert!(!is_long_held(acquired, anchor, 0));
    }
}
