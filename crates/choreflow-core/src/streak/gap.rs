//! Frequency-aware gap rule.
//!
//! Two completions are consecutive when the whole-day gap between them is
//! at most the frequency's base gap, or the widened gap when a holiday
//! exception falls strictly between the two days. The widening is a fixed
//! amount per frequency; extra holidays in the same gap do not stack.

use chrono::{Duration, NaiveDate};

use super::TaskFrequency;

/// Absolute difference in whole days.
pub fn gap_days(prev: NaiveDate, next: NaiveDate) -> i64 {
    (next - prev).num_days().abs()
}

/// Decide whether `next` continues a run that reached `prev`.
pub fn is_consecutive(
    prev: NaiveDate,
    next: NaiveDate,
    frequency: TaskFrequency,
    holiday_in_gap: bool,
) -> bool {
    match frequency.max_gap_days(holiday_in_gap) {
        Some(max_gap) => gap_days(prev, next) <= max_gap,
        None => false,
    }
}

/// Whether a holiday could change the verdict for this gap.
///
/// Lets callers skip the holiday lookup when the base rule already decides.
pub fn needs_holiday_check(prev: NaiveDate, next: NaiveDate, frequency: TaskFrequency) -> bool {
    match (frequency.max_gap_days(false), frequency.max_gap_days(true)) {
        (Some(base), Some(widened)) => {
            let gap = gap_days(prev, next);
            gap > base && gap <= widened
        }
        _ => false,
    }
}

/// Days strictly between `a` and `b`, as an inclusive range.
///
/// `None` when the two days are adjacent or equal.
pub fn interior(a: NaiveDate, b: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if gap_days(lo, hi) < 2 {
        return None;
    }
    Some((lo + Duration::days(1), hi - Duration::days(1)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn daily_boundaries() {
        let jan1 = d(2024, 1, 1);
        assert!(is_consecutive(jan1, d(2024, 1, 3), TaskFrequency::Daily, false));
        assert!(!is_consecutive(jan1, d(2024, 1, 4), TaskFrequency::Daily, false));
        assert!(is_consecutive(jan1, d(2024, 1, 4), TaskFrequency::Daily, true));
        assert!(!is_consecutive(jan1, d(2024, 1, 5), TaskFrequency::Daily, true));
    }

    #[test]
    fn weekly_and_monthly_boundaries() {
        let start = d(2024, 1, 1);
        assert!(is_consecutive(start, d(2024, 1, 11), TaskFrequency::Weekly, false));
        assert!(!is_consecutive(start, d(2024, 1, 12), TaskFrequency::Weekly, false));
        assert!(is_consecutive(start, d(2024, 1, 12), TaskFrequency::Weekly, true));
        assert!(is_consecutive(start, d(2024, 2, 5), TaskFrequency::Monthly, false));
        assert!(!is_consecutive(start, d(2024, 2, 6), TaskFrequency::Monthly, false));
        assert!(is_consecutive(start, d(2024, 2, 8), TaskFrequency::Monthly, true));
    }

    #[test]
    fn once_is_never_consecutive() {
        let day = d(2024, 1, 1);
        assert!(!is_consecutive(day, day, TaskFrequency::Once, true));
    }

    #[test]
    fn gap_is_symmetric_across_years() {
        assert_eq!(gap_days(d(2023, 12, 31), d(2024, 1, 2)), 2);
        assert_eq!(gap_days(d(2024, 1, 2), d(2023, 12, 31)), 2);
    }

    #[test]
    fn interior_excludes_endpoints() {
        assert_eq!(interior(d(2024, 1, 1), d(2024, 1, 2)), None);
        assert_eq!(
            interior(d(2024, 1, 4), d(2024, 1, 1)),
            Some((d(2024, 1, 2), d(2024, 1, 3)))
        );
    }

    #[test]
    fn holiday_check_only_in_widened_band() {
        let jan1 = d(2024, 1, 1);
        assert!(!needs_holiday_check(jan1, d(2024, 1, 3), TaskFrequency::Daily));
        assert!(needs_holiday_check(jan1, d(2024, 1, 4), TaskFrequency::Daily));
        assert!(!needs_holiday_check(jan1, d(2024, 1, 5), TaskFrequency::Daily));
        assert!(!needs_holiday_check(jan1, d(2024, 1, 4), TaskFrequency::Once));
    }

    fn any_frequency() -> impl Strategy<Value = TaskFrequency> {
        prop_oneof![
            Just(TaskFrequency::Daily),
            Just(TaskFrequency::Weekly),
            Just(TaskFrequency::Monthly),
            Just(TaskFrequency::Once),
        ]
    }

    proptest! {
        #[test]
        fn holiday_never_narrows_the_window(offset in 0i64..60, freq in any_frequency()) {
            let a = d(2024, 3, 1);
            let b = a + Duration::days(offset);
            if is_consecutive(a, b, freq, false) {
                prop_assert!(is_consecutive(a, b, freq, true));
            }
        }

        #[test]
        fn shorter_gaps_stay_consecutive(offset in 1i64..60, freq in any_frequency(), holiday in any::<bool>()) {
            let a = d(2024, 3, 1);
            if is_consecutive(a, a + Duration::days(offset), freq, holiday) {
                prop_assert!(is_consecutive(a, a + Duration::days(offset - 1), freq, holiday));
            }
        }

        #[test]
        fn order_does_not_matter(offset in 0i64..60, freq in any_frequency(), holiday in any::<bool>()) {
            let a = d(2024, 3, 1);
            let b = a + Duration::days(offset);
            prop_assert_eq!(is_consecutive(a, b, freq, holiday), is_consecutive(b, a, freq, holiday));
        }
    }
}
