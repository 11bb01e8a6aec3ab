//! XP records, boosts and the `add_xp` procedure

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row, Transaction};

use super::database::Database;
use super::error::{StorageError, StorageResult};
use super::types::{XpAward, XpBoost, XpRecord, XpSource};
use crate::gamification::levels::level_for_xp;

/// Upper bound accepted for a boost multiplier
pub const MAX_BOOST_MULTIPLIER: f64 = 10.0;

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<XpRecord> {
    Ok(XpRecord {
        user_id: row.get(0)?,
        total_xp: row.get(1)?,
        level: row.get(2)?,
        current_streak: row.get(3)?,
        longest_streak: row.get(4)?,
        last_activity_date: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn boost_from_row(row: &Row<'_>) -> rusqlite::Result<XpBoost> {
    Ok(XpBoost {
        id: row.get(0)?,
        user_id: row.get(1)?,
        multiplier: row.get(2)?,
        starts_at: row.get(3)?,
        ends_at: row.get(4)?,
        reason: row.get(5)?,
    })
}

/// Row of the leaderboard view, before ranks are assigned
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardRow {
    pub user_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub total_xp: i64,
    pub level: u32,
    pub current_streak: u32,
}

/// Body of the `add_xp` procedure, run inside the caller's transaction
pub(crate) fn credit_xp(
    tx: &Transaction<'_>,
    user_id: &str,
    amount: i64,
    source: XpSource,
    now: DateTime<Utc>,
) -> StorageResult<XpAward> {
    if amount <= 0 {
        return Err(StorageError::InvalidInput(format!(
            "xp amount must be positive, got {}",
            amount
        )));
    }

    let (total_xp, previous_level): (i64, u32) = tx
        .query_row(
            "SELECT total_xp, level FROM xp_records WHERE user_id = ?1",
            params![user_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound(format!("xp record for user {}", user_id)))?;

    let multiplier: f64 = tx
        .query_row(
            "SELECT MAX(multiplier) FROM xp_boosts
             WHERE user_id = ?1 AND starts_at <= ?2 AND ends_at > ?2",
            params![user_id, now],
            |row| row.get::<_, Option<f64>>(0),
        )?
        .map(|m| m.max(1.0))
        .unwrap_or(1.0);

    let awarded = (amount as f64 * multiplier).round() as i64;
    let new_total = total_xp + awarded;
    let level = level_for_xp(new_total);

    tx.execute(
        "UPDATE xp_records SET total_xp = ?1, level = ?2, updated_at = ?3 WHERE user_id = ?4",
        params![new_total, level, now, user_id],
    )?;

    tx.execute(
        "INSERT INTO xp_events (user_id, amount, source, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, awarded, source.as_str(), now],
    )?;

    tracing::debug!(
        user_id = %user_id,
        source = %source,
        awarded,
        multiplier,
        total_xp = new_total,
        "Added XP"
    );

    Ok(XpAward {
        user_id: user_id.to_string(),
        source,
        base_amount: amount,
        multiplier,
        awarded,
        total_xp: new_total,
        previous_level,
        level,
    })
}

impl Database {
    /// XP record for a user
    pub fn get_xp_record(&self, user_id: &str) -> StorageResult<XpRecord> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT user_id, total_xp, level, current_streak, longest_streak, last_activity_date, updated_at
             FROM xp_records WHERE user_id = ?1",
            params![user_id],
            record_from_row,
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound(format!("xp record for user {}", user_id)))
    }

    /// Credit XP to a user.
    ///
    /// Runs as one transaction: reads the strongest active boost, scales the
    /// amount, updates the total and derived level and appends to the XP log.
    pub fn add_xp(
        &self,
        user_id: &str,
        amount: i64,
        source: XpSource,
        now: DateTime<Utc>,
    ) -> StorageResult<XpAward> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let award = credit_xp(&tx, user_id, amount, source, now)?;
        tx.commit()?;
        Ok(award)
    }

    /// Persist streak counters after an activity
    pub fn save_streak(
        &self,
        user_id: &str,
        current: u32,
        longest: u32,
        activity_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE xp_records
             SET current_streak = ?1, longest_streak = ?2, last_activity_date = ?3, updated_at = ?4
             WHERE user_id = ?5",
            params![current, longest, activity_date, now, user_id],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("xp record for user {}", user_id)));
        }
        Ok(())
    }

    /// Grant a time-boxed XP multiplier
    pub fn create_boost(
        &self,
        user_id: &str,
        multiplier: f64,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        reason: Option<&str>,
    ) -> StorageResult<XpBoost> {
        if !multiplier.is_finite() || multiplier <= 1.0 || multiplier > MAX_BOOST_MULTIPLIER {
            return Err(StorageError::InvalidInput(format!(
                "boost multiplier must be in (1, {}]",
                MAX_BOOST_MULTIPLIER
            )));
        }
        if ends_at <= starts_at {
            return Err(StorageError::InvalidInput(
                "boost must end after it starts".to_string(),
            ));
        }
        self.get_user(user_id)?;

        let boost = XpBoost {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            multiplier,
            starts_at,
            ends_at,
            reason: reason.map(str::to_string),
        };

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO xp_boosts (id, user_id, multiplier, starts_at, ends_at, reason)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                boost.id,
                boost.user_id,
                boost.multiplier,
                boost.starts_at,
                boost.ends_at,
                boost.reason
            ],
        )?;

        Ok(boost)
    }

    /// Boosts whose window contains `now`
    pub fn active_boosts(&self, user_id: &str, now: DateTime<Utc>) -> StorageResult<Vec<XpBoost>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, multiplier, starts_at, ends_at, reason FROM xp_boosts
             WHERE user_id = ?1 AND starts_at <= ?2 AND ends_at > ?2
             ORDER BY multiplier DESC",
        )?;
        let boosts = stmt
            .query_map(params![user_id, now], boost_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(boosts)
    }

    /// Every player ordered for the leaderboard
    pub fn leaderboard_rows(&self) -> StorageResult<Vec<LeaderboardRow>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT p.id, p.username, p.display_name, x.total_xp, x.level, x.current_streak
             FROM xp_records x JOIN profiles p ON p.id = x.user_id
             ORDER BY x.total_xp DESC, x.level DESC, x.updated_at ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(LeaderboardRow {
                    user_id: row.get(0)?,
                    username: row.get(1)?,
                    display_name: row.get(2)?,
                    total_xp: row.get(3)?,
                    level: row.get(4)?,
                    current_streak: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn setup() -> (Database, String) {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("trader", None, 0, Utc::now()).unwrap();
        (db, user.id)
    }

    #[test]
    fn test_add_xp_updates_total_and_level() {
        let (db, user) = setup();
        let now = Utc::now();

        let award = db.add_xp(&user, 50, XpSource::TradeLogged, now).unwrap();
        assert_eq!(award.awarded, 50);
        assert_eq!(award.total_xp, 50);
        assert_eq!(award.level, 1);
        assert!(!award.leveled_up());

        let award = db.add_xp(&user, 60, XpSource::Challenge, now).unwrap();
        assert_eq!(award.total_xp, 110);
        assert_eq!(award.previous_level, 1);
        assert_eq!(award.level, 2);
        assert!(award.leveled_up());

        let record = db.get_xp_record(&user).unwrap();
        assert_eq!(record.total_xp, 110);
        assert_eq!(record.level, 2);
    }

    #[test]
    fn test_add_xp_rejects_non_positive() {
        let (db, user) = setup();
        let err = db.add_xp(&user, 0, XpSource::Manual, Utc::now()).unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput(_)));
    }

    #[test]
    fn test_add_xp_unknown_user() {
        let db = Database::open_in_memory().unwrap();
        let err = db.add_xp("ghost", 10, XpSource::Manual, Utc::now()).unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[test]
    fn test_strongest_active_boost_applies() {
        let (db, user) = setup();
        let now = Utc::now();

        db.create_boost(&user, 1.5, now - Duration::hours(1), now + Duration::hours(1), None)
            .unwrap();
        db.create_boost(&user, 2.0, now - Duration::hours(1), now + Duration::hours(1), Some("weekend"))
            .unwrap();
        // Expired boost is ignored
        db.create_boost(&user, 3.0, now - Duration::hours(3), now - Duration::hours(2), None)
            .unwrap();

        let award = db.add_xp(&user, 25, XpSource::TradeLogged, now).unwrap();
        assert_eq!(award.multiplier, 2.0);
        assert_eq!(award.awarded, 50);

        let active = db.active_boosts(&user, now).unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].multiplier, 2.0);
    }

    #[test]
    fn test_boost_validation() {
        let (db, user) = setup();
        let now = Utc::now();
        assert!(db.create_boost(&user, 1.0, now, now + Duration::hours(1), None).is_err());
        assert!(db.create_boost(&user, 11.0, now, now + Duration::hours(1), None).is_err());
        assert!(db.create_boost(&user, 2.0, now, now, None).is_err());
    }

    #[test]
    fn test_save_streak() {
        let (db, user) = setup();
        let today = Utc::now().date_naive();
        db.save_streak(&user, 3, 5, today, Utc::now()).unwrap();

        let record = db.get_xp_record(&user).unwrap();
        assert_eq!(record.current_streak, 3);
        assert_eq!(record.longest_streak, 5);
        assert_eq!(record.last_activity_date, Some(today));
    }

    #[test]
    fn test_leaderboard_rows_order() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        let a = db.create_user("alice", None, 0, now).unwrap();
        let b = db.create_user("bob", None, 0, now).unwrap();
        db.create_user("carol", None, 0, now).unwrap();

        db.add_xp(&a.id, 100, XpSource::Manual, now).unwrap();
        db.add_xp(&b.id, 300, XpSource::Manual, now).unwrap();

        let rows = db.leaderboard_rows().unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].username, "bob");
        assert_eq!(rows[1].username, "alice");
        assert_eq!(rows[2].total_xp, 0);
    }
}
