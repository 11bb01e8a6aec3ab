//! Level curve
//!
//! Level `l` starts at `(l - 1)^2 * 100` XP, so each level costs more than
//! the one before it.

use serde::Serialize;

const XP_PER_LEVEL_UNIT: f64 = 100.0;

/// Level reached with `xp` total XP. Never below 1.
pub fn level_for_xp(xp: i64) -> u32 {
    if xp <= 0 {
        return 1;
    }
    let mut level = (xp as f64 / XP_PER_LEVEL_UNIT).sqrt().floor() as u32 + 1;
    // guard against float error at exact squares
    while level > 1 && xp_for_level(level) > xp {
        level -= 1;
    }
    while xp_for_level(level + 1) <= xp {
        level += 1;
    }
    level
}

/// Total XP at which `level` begins
pub fn xp_for_level(level: u32) -> i64 {
    let l = i64::from(level.max(1)) - 1;
    l * l * 100
}

/// Where a player sits within their current level
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LevelProgress {
    pub level: u32,
    pub total_xp: i64,
    pub xp_into_level: i64,
    pub xp_to_next_level: i64,
    /// 0-100
    pub percent: f64,
}

impl LevelProgress {
    pub fn from_total(total_xp: i64) -> Self {
        let total_xp = total_xp.max(0);
        let level = level_for_xp(total_xp);
        let start = xp_for_level(level);
        let next = xp_for_level(level + 1);
        let span = next - start;
        let into = total_xp - start;

        Self {
            level,
            total_xp,
            xp_into_level: into,
            xp_to_next_level: next - total_xp,
            percent: if span > 0 {
                (into as f64 / span as f64 * 100.0 * 10.0).round() / 10.0
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_boundaries() {
        assert_eq!(level_for_xp(-5), 1);
        assert_eq!(level_for_xp(0), 1);
        assert_eq!(level_for_xp(99), 1);
        assert_eq!(level_for_xp(100), 2);
        assert_eq!(level_for_xp(399), 2);
        assert_eq!(level_for_xp(400), 3);
        assert_eq!(level_for_xp(10_000), 11);
    }

    #[test]
    fn test_xp_for_level_inverts_level_for_xp() {
        for level in 1..50 {
            assert_eq!(level_for_xp(xp_for_level(level)), level);
            if level > 1 {
                assert_eq!(level_for_xp(xp_for_level(level) - 1), level - 1);
            }
        }
    }

    #[test]
    fn test_progress() {
        let p = LevelProgress::from_total(250);
        assert_eq!(p.level, 2);
        assert_eq!(p.xp_into_level, 150);
        assert_eq!(p.xp_to_next_level, 150);
        assert_eq!(p.percent, 50.0);
    }
}
