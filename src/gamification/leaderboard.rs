//! Leaderboard ranking

use serde::Serialize;

use crate::storage::{Database, LeaderboardRow, StorageResult};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub total_xp: i64,
    pub level: u32,
    pub current_streak: u32,
}

/// Standard competition ranking over rows already sorted by XP: equal XP
/// shares a rank and the next distinct score skips ahead (1, 2, 2, 4).
pub fn assign_ranks(rows: Vec<LeaderboardRow>) -> Vec<LeaderboardEntry> {
    let mut entries = Vec::with_capacity(rows.len());
    let mut previous: Option<(i64, u32)> = None;

    for (idx, row) in rows.into_iter().enumerate() {
        let rank = match previous {
            Some((xp, rank)) if xp == row.total_xp => rank,
            _ => idx as u32 + 1,
        };
        previous = Some((row.total_xp, rank));

        entries.push(LeaderboardEntry {
            rank,
            user_id: row.user_id,
            username: row.username,
            display_name: row.display_name,
            total_xp: row.total_xp,
            level: row.level,
            current_streak: row.current_streak,
        });
    }

    entries
}

/// Ranked standings of every player
pub fn standings(db: &Database) -> StorageResult<Vec<LeaderboardEntry>> {
    Ok(assign_ranks(db.leaderboard_rows()?))
}

pub fn rank_of<'a>(entries: &'a [LeaderboardEntry], user_id: &str) -> Option<&'a LeaderboardEntry> {
    entries.iter().find(|e| e.user_id == user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::XpSource;
    use chrono::{Duration, Utc};

    fn row(id: &str, xp: i64) -> LeaderboardRow {
        LeaderboardRow {
            user_id: id.to_string(),
            username: id.to_string(),
            display_name: None,
            total_xp: xp,
            level: 1,
            current_streak: 0,
        }
    }

    #[test]
    fn test_competition_ranking() {
        let ranked = assign_ranks(vec![row("a", 500), row("b", 300), row("c", 300), row("d", 100)]);
        let ranks: Vec<u32> = ranked.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 2, 4]);
    }

    #[test]
    fn test_rank_of() {
        let ranked = assign_ranks(vec![row("a", 10), row("b", 5)]);
        assert_eq!(rank_of(&ranked, "b").map(|e| e.rank), Some(2));
        assert!(rank_of(&ranked, "zed").is_none());
    }

    #[test]
    fn test_standings_from_database() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let low = db.create_user("low", None, 0, now).unwrap();
        let high = db.create_user("high", None, 0, now).unwrap();
        let early = db.create_user("early", None, 0, now).unwrap();

        db.add_xp(&high.id, 900, XpSource::Manual, now).unwrap();
        db.add_xp(&early.id, 50, XpSource::Manual, now - Duration::hours(1)).unwrap();
        db.add_xp(&low.id, 50, XpSource::Manual, now).unwrap();

        let board = standings(&db).unwrap();
        assert_eq!(board[0].user_id, high.id);
        assert_eq!(board[0].level, 4);
        // Tie on XP: shared rank, earlier update listed first
        assert_eq!(board[1].user_id, early.id);
        assert_eq!(board[1].rank, 2);
        assert_eq!(board[2].rank, 2);
    }
}
