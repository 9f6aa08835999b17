//! Daily streak tracking.
//!
//! A streak counts consecutive calendar days with at least one completed
//! lesson. Day boundaries come from the `Calendar`, so the rules below never
//! depend on the wall clock.

use chrono::{DateTime, Utc};

use crate::time::Calendar;

/// Next streak value after activity at `now`.
///
/// - no prior activity: the streak starts at 1
/// - same calendar day (or a clock that went backwards): unchanged
/// - the next calendar day: extended by one
/// - two or more days later: restarts at 1
#[must_use]
pub fn next_streak(
    previous_streak: u32,
    last_activity_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    calendar: &Calendar,
) -> u32 {
    let Some(last) = last_activity_at else {
        return 1;
    };

    match calendar.days_between(last, now) {
        elapsed if elapsed < 1 => previous_streak,
        1 => previous_streak.saturating_add(1),
        _ => 1,
    }
}

/// Whether a streak is still alive at `now`: activity today or yesterday.
#[must_use]
pub fn streak_is_active(
    last_activity_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    calendar: &Calendar,
) -> bool {
    last_activity_at.is_some_and(|last| calendar.days_between(last, now) <= 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;
    use proptest::prelude::*;

    #[test]
    fn first_activity_starts_at_one() {
        assert_eq!(next_streak(0, None, fixed_now(), &Calendar::utc()), 1);
        assert_eq!(next_streak(9, None, fixed_now(), &Calendar::utc()), 1);
    }

    #[test]
    fn consecutive_day_extends() {
        let t = fixed_now();
        assert_eq!(next_streak(5, Some(t), t + Duration::days(1), &Calendar::utc()), 6);
    }

    #[test]
    fn gap_resets() {
        let t = fixed_now();
        assert_eq!(next_streak(5, Some(t), t + Duration::days(3), &Calendar::utc()), 1);
        assert_eq!(next_streak(5, Some(t), t + Duration::days(2), &Calendar::utc()), 1);
    }

    #[test]
    fn minutes_across_midnight_count_as_next_day() {
        // fixed_now() is 22:13:20 UTC; two hours later is tomorrow.
        let t = fixed_now();
        assert_eq!(next_streak(3, Some(t), t + Duration::hours(2), &Calendar::utc()), 4);
    }

    #[test]
    fn backwards_clock_keeps_streak() {
        let t = fixed_now();
        assert_eq!(next_streak(4, Some(t), t - Duration::days(2), &Calendar::utc()), 4);
    }

    #[test]
    fn active_means_today_or_yesterday() {
        let t = fixed_now();
        let cal = Calendar::utc();
        assert!(streak_is_active(Some(t), t, &cal));
        assert!(streak_is_active(Some(t), t + Duration::days(1), &cal));
        assert!(!streak_is_active(Some(t), t + Duration::days(2), &cal));
        assert!(!streak_is_active(None, t, &cal));
    }

    proptest! {
        #[test]
        fn same_instant_never_changes_streak(streak in 0_u32..10_000, secs in 0_i64..4_000_000_000) {
            let t = DateTime::<Utc>::from_timestamp(secs, 0).unwrap();
            prop_assert_eq!(next_streak(streak, Some(t), t, &Calendar::utc()), streak);
        }

        #[test]
        fn streak_never_exceeds_previous_plus_one(
            streak in 0_u32..10_000,
            gap_minutes in 0_i64..20_000,
            offset in -720_i32..=720,
        ) {
            let cal = Calendar::with_offset_minutes(offset).unwrap();
            let t = fixed_now();
            let next = next_streak(streak, Some(t), t + Duration::minutes(gap_minutes), &cal);
            prop_assert!(next >= 1 || next == streak);
            prop_assert!(next <= streak.saturating_add(1).max(1));
        }
    }
}
