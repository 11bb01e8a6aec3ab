//! Comeback bonus for returning players

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tuning of the comeback bonus
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ComebackPolicy {
    /// Minimum days away before any bonus is paid
    pub threshold_days: i64,
    pub xp_per_day: i64,
    pub max_xp: i64,
}

impl Default for ComebackPolicy {
    fn default() -> Self {
        Self {
            threshold_days: 7,
            xp_per_day: 50,
            max_xp: 500,
        }
    }
}

impl ComebackPolicy {
    /// XP granted after `days_away` days of inactivity
    pub fn reward(&self, days_away: i64) -> i64 {
        if days_away >= self.threshold_days {
            (days_away * self.xp_per_day).min(self.max_xp)
        } else {
            0
        }
    }
}

/// Reward under the default policy
pub fn comeback_reward(days_away: i64) -> i64 {
    ComebackPolicy::default().reward(days_away)
}

/// Calendar days between two instants (UTC dates)
pub fn days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later.date_naive() - earlier.date_naive()).num_days().max(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_reward_table() {
        let got: Vec<i64> = [0, 6, 7, 10, 20].iter().map(|d| comeback_reward(*d)).collect();
        assert_eq!(got, vec![0, 0, 350, 500, 500]);
    }

    #[test]
    fn test_custom_policy() {
        let policy = ComebackPolicy {
            threshold_days: 3,
            xp_per_day: 10,
            max_xp: 100,
        };
        assert_eq!(policy.reward(2), 0);
        assert_eq!(policy.reward(3), 30);
        assert_eq!(policy.reward(30), 100);
    }

    #[test]
    fn test_days_between_uses_calendar_days() {
        let late = Utc.with_ymd_and_hms(2024, 3, 1, 23, 30, 0).unwrap();
        let early_next = Utc.with_ymd_and_hms(2024, 3, 2, 0, 30, 0).unwrap();
        assert_eq!(days_between(late, early_next), 1);
        assert_eq!(days_between(late, late + Duration::days(10)), 10);
        assert_eq!(days_between(early_next, late), 0);
    }
}
