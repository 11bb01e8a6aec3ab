//! Inactivity scan
//!
//! Users away for at least `inactivity_days` get a notification announcing
//! the comeback bonus waiting for them, at most once per cooldown period.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

use super::{Job, JobError, JobOutcome};
use crate::gamification::comeback::days_between;
use crate::gamification::ComebackPolicy;
use crate::storage::{Database, StorageResult, UserProfile};

pub const NAME: &str = "inactivity-scan";

/// Notification kind used for inactivity nudges
pub const NOTIFICATION_KIND: &str = "inactivity";

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct InactivityReport {
    pub scanned: usize,
    pub inactive: usize,
    pub notified: usize,
    pub in_cooldown: usize,
    pub failed: usize,
}

pub struct InactivityScanJob {
    db: Arc<Database>,
    policy: ComebackPolicy,
    inactivity_days: i64,
    cooldown_days: i64,
}

/// Message announcing the bonus a returning user would get
pub fn inactivity_message(days_away: i64, bonus_xp: i64) -> String {
    if bonus_xp > 0 {
        format!(
            "It's been {} days since your last visit. Log a trade today to claim a {} XP comeback bonus!",
            days_away, bonus_xp
        )
    } else {
        format!(
            "It's been {} days since your last visit. Your journal misses you!",
            days_away
        )
    }
}

impl InactivityScanJob {
    pub fn new(db: Arc<Database>, policy: ComebackPolicy, inactivity_days: i64, cooldown_days: i64) -> Self {
        Self {
            db,
            policy,
            inactivity_days,
            cooldown_days,
        }
    }

    fn check_user(&self, user: &UserProfile, now: DateTime<Utc>, report: &mut InactivityReport) -> StorageResult<()> {
        // Users who never recorded activity count from sign-up
        let last_seen = user.last_active_at.unwrap_or(user.created_at);
        let days_away = days_between(last_seen, now);
        if days_away < self.inactivity_days {
            return Ok(());
        }
        report.inactive += 1;

        if let Some(last) = self.db.last_notification_at(&user.id, NOTIFICATION_KIND)? {
            // A cooldown too long to represent never expires
            let in_cooldown = Duration::try_days(self.cooldown_days)
                .map(|cooldown| now - last < cooldown)
                .unwrap_or(true);
            if in_cooldown {
                report.in_cooldown += 1;
                return Ok(());
            }
        }

        let message = inactivity_message(days_away, self.policy.reward(days_away));
        self.db
            .insert_notification(&user.id, NOTIFICATION_KIND, &message, now)?;
        report.notified += 1;
        Ok(())
    }

    pub fn scan(&self, now: DateTime<Utc>) -> StorageResult<InactivityReport> {
        let users = self.db.list_users()?;
        let mut report = InactivityReport {
            scanned: users.len(),
            ..Default::default()
        };

        for user in &users {
            if let Err(e) = self.check_user(user, now, &mut report) {
                tracing::warn!(user_id = %user.id, error = %e, "Inactivity check failed");
                report.failed += 1;
            }
        }

        tracing::info!(
            scanned = report.scanned,
            notified = report.notified,
            in_cooldown = report.in_cooldown,
            failed = report.failed,
            "Inactivity scan finished"
        );
        Ok(report)
    }
}

#[async_trait]
impl Job for InactivityScanJob {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Notify inactive users about their comeback bonus"
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<JobOutcome, JobError> {
        let report = self.scan(now)?;
        Ok(JobOutcome {
            processed: report.notified,
            failed: report.failed,
            detail: serde_json::to_value(&report).unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(db: &Arc<Database>) -> InactivityScanJob {
        InactivityScanJob::new(Arc::clone(db), ComebackPolicy::default(), 7, 7)
    }

    #[test]
    fn test_notifies_inactive_users_once_per_cooldown() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let now = Utc::now();
        let idle = db.create_user("idle", None, 0, now - Duration::days(30)).unwrap();
        let active = db.create_user("active", None, 0, now - Duration::days(30)).unwrap();
        db.touch_last_active(&idle.id, now - Duration::days(10)).unwrap();
        db.touch_last_active(&active.id, now - Duration::days(2)).unwrap();

        let report = job(&db).scan(now).unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.inactive, 1);
        assert_eq!(report.notified, 1);

        let notes = db.list_notifications(&idle.id, 10).unwrap();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].message.contains("500 XP"));
        assert!(db.list_notifications(&active.id, 10).unwrap().is_empty());

        // Within cooldown: no second nudge
        let report = job(&db).scan(now + Duration::days(3)).unwrap();
        assert_eq!(report.in_cooldown, 1);
        assert_eq!(report.notified, 0);

        // After cooldown: nudged again
        let report = job(&db).scan(now + Duration::days(8)).unwrap();
        assert_eq!(report.notified, 1);
    }

    #[test]
    fn test_never_active_counts_from_signup() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let now = Utc::now();
        db.create_user("lurker", None, 0, now - Duration::days(7)).unwrap();
        db.create_user("newbie", None, 0, now - Duration::days(1)).unwrap();

        assert_eq!(job(&db).scan(now).unwrap().notified, 1);
    }

    #[test]
    fn test_unbounded_cooldown_never_expires() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let now = Utc::now();
        db.create_user("ghost", None, 0, now - Duration::days(20)).unwrap();
        let job = InactivityScanJob::new(Arc::clone(&db), ComebackPolicy::default(), 7, i64::MAX);

        assert_eq!(job.scan(now).unwrap().notified, 1);
        let report = job.scan(now + Duration::days(400)).unwrap();
        assert_eq!(report.in_cooldown, 1);
        assert_eq!(report.failed, 0);
    }

    #[test]
    fn test_message() {
        assert!(inactivity_message(8, 400).contains("400 XP comeback bonus"));
        assert!(!inactivity_message(3, 0).contains("XP"));
    }
}
