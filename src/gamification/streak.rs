//! Daily activity streaks

use chrono::NaiveDate;
use serde::Serialize;

/// Streak lengths that pay a bonus, with the bonus XP
pub const STREAK_MILESTONES: [(u32, i64); 3] = [(7, 100), (30, 500), (100, 1500)];

/// Streak counters after an activity
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StreakUpdate {
    pub current: u32,
    pub longest: u32,
    /// False when the activity fell on the same day as the previous one
    pub changed: bool,
    /// Milestone reached by this update, if any
    pub milestone: Option<u32>,
}

/// Apply an activity on `today` to the stored counters
pub fn advance_streak(
    last_activity: Option<NaiveDate>,
    current: u32,
    longest: u32,
    today: NaiveDate,
) -> StreakUpdate {
    let next = match last_activity {
        Some(last) if last == today => {
            return StreakUpdate {
                current,
                longest: longest.max(current),
                changed: false,
                milestone: None,
            };
        }
        Some(last) if last.succ_opt() == Some(today) => current.saturating_add(1),
        _ => 1,
    };

    StreakUpdate {
        current: next,
        longest: longest.max(next),
        changed: true,
        milestone: STREAK_MILESTONES
            .iter()
            .find(|(days, _)| *days == next)
            .map(|(days, _)| *days),
    }
}

/// Bonus XP for a milestone
pub fn milestone_bonus(days: u32) -> i64 {
    STREAK_MILESTONES
        .iter()
        .find(|(d, _)| *d == days)
        .map(|(_, xp)| *xp)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn test_first_activity_starts_streak() {
        let u = advance_streak(None, 0, 0, day(1));
        assert_eq!((u.current, u.longest, u.changed), (1, 1, true));
    }

    #[test]
    fn test_same_day_is_noop() {
        let u = advance_streak(Some(day(3)), 4, 9, day(3));
        assert_eq!((u.current, u.longest, u.changed), (4, 9, false));
    }

    #[test]
    fn test_consecutive_and_gap() {
        let u = advance_streak(Some(day(3)), 4, 4, day(4));
        assert_eq!((u.current, u.longest), (5, 5));

        let u = advance_streak(Some(day(3)), 4, 4, day(6));
        assert_eq!((u.current, u.longest), (1, 4));
    }

    #[test]
    fn test_milestones() {
        let u = advance_streak(Some(day(10)), 6, 6, day(11));
        assert_eq!(u.milestone, Some(7));
        assert_eq!(milestone_bonus(7), 100);
        assert_eq!(milestone_bonus(30), 500);
        assert_eq!(milestone_bonus(8), 0);
    }
}
