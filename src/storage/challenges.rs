//! Daily challenge rows

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::database::{parse_column, Database};
use super::error::{StorageError, StorageResult};
use super::types::{ChallengeKind, DailyChallenge, XpAward, XpSource};
use super::xp::credit_xp;

/// A challenge about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewChallenge {
    pub kind: ChallengeKind,
    pub title: String,
    pub target: u32,
    pub xp_reward: i64,
    pub is_mystery: bool,
}

/// Result of [`Database::advance_challenge`]
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeAdvance {
    pub challenge: DailyChallenge,
    /// This call reached the target
    pub completed_now: bool,
    /// Reward credited in the same transaction as the completion
    pub award: Option<XpAward>,
}

const CHALLENGE_COLUMNS: &str =
    "id, user_id, challenge_date, kind, title, target, progress, xp_reward, is_mystery, completed_at";

fn challenge_from_row(row: &Row<'_>) -> rusqlite::Result<DailyChallenge> {
    Ok(DailyChallenge {
        id: row.get(0)?,
        user_id: row.get(1)?,
        challenge_date: row.get(2)?,
        kind: parse_column(3, row.get(3)?)?,
        title: row.get(4)?,
        target: row.get(5)?,
        progress: row.get(6)?,
        xp_reward: row.get(7)?,
        is_mystery: row.get(8)?,
        completed_at: row.get(9)?,
    })
}

impl Database {
    /// Challenges of one user for one day, mystery last
    pub fn challenges_for_day(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> StorageResult<Vec<DailyChallenge>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM daily_challenges
             WHERE user_id = ?1 AND challenge_date = ?2
             ORDER BY is_mystery ASC, rowid ASC",
            CHALLENGE_COLUMNS
        ))?;
        let challenges = stmt
            .query_map(params![user_id, date], challenge_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(challenges)
    }

    /// Insert a day's challenges unless the user already has some for that day.
    ///
    /// The existence check and the inserts share one transaction. Returns the
    /// number of rows inserted (0 when the day was already seeded).
    pub fn insert_challenges_if_absent(
        &self,
        user_id: &str,
        date: NaiveDate,
        challenges: &[NewChallenge],
    ) -> StorageResult<usize> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM daily_challenges WHERE user_id = ?1 AND challenge_date = ?2",
            params![user_id, date],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Ok(0);
        }

        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO daily_challenges
                 (id, user_id, challenge_date, kind, title, target, progress, xp_reward, is_mystery)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8)",
            )?;
            for challenge in challenges {
                stmt.execute(params![
                    uuid::Uuid::new_v4().to_string(),
                    user_id,
                    date,
                    challenge.kind.as_str(),
                    challenge.title,
                    challenge.target,
                    challenge.xp_reward,
                    challenge.is_mystery,
                ])?;
            }
        }

        tx.commit()?;
        Ok(challenges.len())
    }

    /// One challenge owned by the user
    pub fn get_challenge(&self, user_id: &str, challenge_id: &str) -> StorageResult<DailyChallenge> {
        let conn = self.conn()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM daily_challenges WHERE id = ?1 AND user_id = ?2",
                CHALLENGE_COLUMNS
            ),
            params![challenge_id, user_id],
            challenge_from_row,
        )
        .optional()?
        .ok_or_else(|| StorageError::NotFound(format!("challenge {}", challenge_id)))
    }

    /// Advance a challenge's progress, capped at its target.
    ///
    /// Completing the challenge stamps `completed_at` and credits its reward
    /// in one transaction, so a completion is never stored without its XP. A
    /// completed challenge is returned unchanged.
    pub fn advance_challenge(
        &self,
        user_id: &str,
        challenge_id: &str,
        increment: u32,
        now: DateTime<Utc>,
    ) -> StorageResult<ChallengeAdvance> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut challenge = tx
            .query_row(
                &format!(
                    "SELECT {} FROM daily_challenges WHERE id = ?1 AND user_id = ?2",
                    CHALLENGE_COLUMNS
                ),
                params![challenge_id, user_id],
                challenge_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::NotFound(format!("challenge {}", challenge_id)))?;

        if challenge.is_completed() || increment == 0 {
            return Ok(ChallengeAdvance {
                challenge,
                completed_now: false,
                award: None,
            });
        }

        challenge.progress = challenge.progress.saturating_add(increment).min(challenge.target);
        let completed_now = challenge.progress >= challenge.target;
        if completed_now {
            challenge.completed_at = Some(now);
        }

        tx.execute(
            "UPDATE daily_challenges SET progress = ?1, completed_at = ?2 WHERE id = ?3",
            params![challenge.progress, challenge.completed_at, challenge.id],
        )?;

        let award = if completed_now && challenge.xp_reward > 0 {
            Some(credit_xp(&tx, user_id, challenge.xp_reward, XpSource::Challenge, now)?)
        } else {
            None
        };

        tx.commit()?;

        Ok(ChallengeAdvance {
            challenge,
            completed_now,
            award,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drafts() -> Vec<NewChallenge> {
        vec![
            NewChallenge {
                kind: ChallengeKind::LogTrades,
                title: "Log 3 trades".to_string(),
                target: 3,
                xp_reward: 50,
                is_mystery: false,
            },
            NewChallenge {
                kind: ChallengeKind::AddNotes,
                title: "Write notes on a trade".to_string(),
                target: 1,
                xp_reward: 30,
                is_mystery: true,
            },
        ]
    }

    #[test]
    fn test_insert_is_idempotent_per_day() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("daily", None, 0, Utc::now()).unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();

        assert_eq!(db.insert_challenges_if_absent(&user.id, day, &drafts()).unwrap(), 2);
        assert_eq!(db.insert_challenges_if_absent(&user.id, day, &drafts()).unwrap(), 0);
        assert_eq!(db.challenges_for_day(&user.id, day).unwrap().len(), 2);

        // Another day is independent
        let next = day.succ_opt().unwrap();
        assert_eq!(db.insert_challenges_if_absent(&user.id, next, &drafts()).unwrap(), 2);
    }

    #[test]
    fn test_advance_caps_and_completes_once() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("grinder", None, 0, Utc::now()).unwrap();
        let day = Utc::now().date_naive();
        db.insert_challenges_if_absent(&user.id, day, &drafts()).unwrap();

        let challenges = db.challenges_for_day(&user.id, day).unwrap();
        let log = challenges
            .iter()
            .find(|c| c.kind == ChallengeKind::LogTrades)
            .unwrap();
        assert!(!log.is_mystery);

        let step = db.advance_challenge(&user.id, &log.id, 2, Utc::now()).unwrap();
        assert_eq!(step.challenge.progress, 2);
        assert!(!step.completed_now);
        assert!(step.award.is_none());

        let step = db.advance_challenge(&user.id, &log.id, 5, Utc::now()).unwrap();
        assert_eq!(step.challenge.progress, 3);
        assert!(step.completed_now);
        assert!(step.challenge.is_completed());
        assert_eq!(step.award.unwrap().awarded, 50);
        assert_eq!(db.get_xp_record(&user.id).unwrap().total_xp, 50);

        let step = db.advance_challenge(&user.id, &log.id, 1, Utc::now()).unwrap();
        assert!(!step.completed_now);
        assert!(step.award.is_none());
        assert_eq!(db.get_xp_record(&user.id).unwrap().total_xp, 50);
    }

    #[test]
    fn test_completion_rolls_back_when_reward_fails() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user("orphan", None, 0, Utc::now()).unwrap();
        let day = Utc::now().date_naive();
        db.insert_challenges_if_absent(&user.id, day, &drafts()).unwrap();
        let notes = db
            .challenges_for_day(&user.id, day)
            .unwrap()
            .into_iter()
            .find(|c| c.kind == ChallengeKind::AddNotes)
            .unwrap();

        db.conn()
            .unwrap()
            .execute("DELETE FROM xp_records WHERE user_id = ?1", params![user.id])
            .unwrap();

        assert!(matches!(
            db.advance_challenge(&user.id, &notes.id, 1, Utc::now()),
            Err(StorageError::NotFound(_))
        ));
        let stored = db.get_challenge(&user.id, &notes.id).unwrap();
        assert_eq!(stored.progress, 0);
        assert!(!stored.is_completed());
    }

    #[test]
    fn test_challenge_is_owner_scoped() {
        let db = Database::open_in_memory().unwrap();
        let owner = db.create_user("owner", None, 0, Utc::now()).unwrap();
        let other = db.create_user("other", None, 0, Utc::now()).unwrap();
        let day = Utc::now().date_naive();
        db.insert_challenges_if_absent(&owner.id, day, &drafts()).unwrap();
        let id = db.challenges_for_day(&owner.id, day).unwrap()[0].id.clone();

        assert!(db.get_challenge(&owner.id, &id).is_ok());
        assert!(matches!(
            db.get_challenge(&other.id, &id),
            Err(StorageError::NotFound(_))
        ));
    }
}
