//! Gamification service
//!
//! Glue between the XP procedure, streaks, comeback bonuses and challenges.
//! Every state change is published on the [`EventBus`].

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::Arc;

use super::challenges::{progress_from_trades, seed_for_user};
use super::comeback::days_between;
use super::leaderboard::{self, LeaderboardEntry};
use super::streak::{advance_streak, milestone_bonus, StreakUpdate};
use crate::config::GamificationConfig;
use crate::events::{EventBus, GameEvent};
use crate::storage::{
    ChallengeAdvance, ChallengeKind, DailyChallenge, Database, StorageResult, Trade, XpAward,
    XpSource,
};

/// What recording an activity changed
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActivityOutcome {
    pub days_away: i64,
    pub comeback_xp: i64,
    pub streak: StreakUpdate,
    pub milestone_xp: i64,
    pub total_xp: i64,
    pub level: u32,
}

/// Result of advancing one challenge
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChallengeProgress {
    pub challenge: DailyChallenge,
    pub completed_now: bool,
    pub award: Option<XpAward>,
}

/// What logging a set of trades earned
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TradesLoggedOutcome {
    pub xp: Option<XpAward>,
    pub activity: ActivityOutcome,
    pub challenges: Vec<ChallengeProgress>,
}

pub struct GamificationService {
    db: Arc<Database>,
    events: EventBus,
    config: GamificationConfig,
}

impl GamificationService {
    pub fn new(db: Arc<Database>, events: EventBus, config: GamificationConfig) -> Self {
        Self { db, events, config }
    }

    pub fn config(&self) -> &GamificationConfig {
        &self.config
    }

    /// Credit XP through the `add_xp` procedure and announce it
    pub fn award_xp(
        &self,
        user_id: &str,
        amount: i64,
        source: XpSource,
        now: DateTime<Utc>,
    ) -> StorageResult<XpAward> {
        let award = self.db.add_xp(user_id, amount, source, now)?;
        self.announce(&award);
        Ok(award)
    }

    fn announce(&self, award: &XpAward) {
        self.events.publish(GameEvent::XpAwarded {
            user_id: award.user_id.clone(),
            amount: award.awarded,
            source: award.source,
            multiplier: award.multiplier,
            total_xp: award.total_xp,
            level: award.level,
        });
        if award.leveled_up() {
            tracing::info!(user_id = %award.user_id, level = award.level, "Level up");
            self.events.publish(GameEvent::LevelUp {
                user_id: award.user_id.clone(),
                previous_level: award.previous_level,
                level: award.level,
            });
        }
    }

    /// Register a qualifying activity: comeback bonus, streak, milestone bonus
    /// and `last_active_at`.
    pub fn record_activity(&self, user_id: &str, now: DateTime<Utc>) -> StorageResult<ActivityOutcome> {
        let profile = self.db.get_user(user_id)?;
        let days_away = profile
            .last_active_at
            .map(|last| days_between(last, now))
            .unwrap_or(0);

        let comeback_xp = self.config.comeback.reward(days_away);
        if comeback_xp > 0 {
            self.award_xp(user_id, comeback_xp, XpSource::Comeback, now)?;
            self.events.publish(GameEvent::ComebackBonus {
                user_id: user_id.to_string(),
                days_away,
                xp: comeback_xp,
            });
        }

        let record = self.db.get_xp_record(user_id)?;
        let today = now.date_naive();
        let streak = advance_streak(
            record.last_activity_date,
            record.current_streak,
            record.longest_streak,
            today,
        );

        let mut milestone_xp = 0;
        if streak.changed {
            self.db
                .save_streak(user_id, streak.current, streak.longest, today, now)?;
            self.events.publish(GameEvent::StreakUpdated {
                user_id: user_id.to_string(),
                current: streak.current,
                longest: streak.longest,
            });
            if let Some(days) = streak.milestone {
                milestone_xp = milestone_bonus(days);
                self.award_xp(user_id, milestone_xp, XpSource::StreakMilestone, now)?;
            }
        }

        self.db.touch_last_active(user_id, now)?;

        let record = self.db.get_xp_record(user_id)?;
        Ok(ActivityOutcome {
            days_away,
            comeback_xp,
            streak,
            milestone_xp,
            total_xp: record.total_xp,
            level: record.level,
        })
    }

    /// Today's challenges, seeding them first when the daily job has not run
    /// for this user yet
    pub fn todays_challenges(&self, user_id: &str, now: DateTime<Utc>) -> StorageResult<Vec<DailyChallenge>> {
        let today = now.date_naive();
        let mut rng = StdRng::from_entropy();
        seed_for_user(
            &self.db,
            &mut rng,
            user_id,
            today,
            self.config.daily_challenge_count,
            self.config.mystery_odds,
        )?;
        self.db.challenges_for_day(user_id, today)
    }

    /// Advance one challenge; completing it pays its reward exactly once
    pub fn progress_challenge(
        &self,
        user_id: &str,
        challenge_id: &str,
        increment: u32,
        now: DateTime<Utc>,
    ) -> StorageResult<ChallengeProgress> {
        let ChallengeAdvance {
            challenge,
            completed_now,
            award,
        } = self
            .db
            .advance_challenge(user_id, challenge_id, increment, now)?;

        if completed_now {
            self.events.publish(GameEvent::ChallengeCompleted {
                user_id: user_id.to_string(),
                challenge_id: challenge.id.clone(),
                title: challenge.title.clone(),
                xp_reward: challenge.xp_reward,
            });
        }
        if let Some(award) = &award {
            self.announce(award);
        }

        Ok(ChallengeProgress {
            challenge,
            completed_now,
            award,
        })
    }

    /// Advance every open challenge of `kind` due today
    pub fn advance_kind(
        &self,
        user_id: &str,
        kind: ChallengeKind,
        increment: u32,
        now: DateTime<Utc>,
    ) -> StorageResult<Vec<ChallengeProgress>> {
        let open: Vec<DailyChallenge> = self
            .db
            .challenges_for_day(user_id, now.date_naive())?
            .into_iter()
            .filter(|c| c.kind == kind && !c.is_completed())
            .collect();

        open.iter()
            .map(|c| self.progress_challenge(user_id, &c.id, increment, now))
            .collect()
    }

    /// XP, activity and challenge progress for freshly inserted trades
    pub fn on_trades_logged(
        &self,
        user_id: &str,
        trades: &[Trade],
        now: DateTime<Utc>,
    ) -> StorageResult<TradesLoggedOutcome> {
        let activity = self.record_activity(user_id, now)?;
        if trades.is_empty() {
            return Ok(TradesLoggedOutcome {
                xp: None,
                activity,
                challenges: Vec::new(),
            });
        }

        let amount = self.config.trade_logged_xp * trades.len() as i64;
        let xp = if amount > 0 {
            Some(self.award_xp(user_id, amount, XpSource::TradeLogged, now)?)
        } else {
            None
        };

        let mut challenges = Vec::new();
        for (kind, increment) in progress_from_trades(trades) {
            challenges.extend(self.advance_kind(user_id, kind, increment, now)?);
        }

        Ok(TradesLoggedOutcome {
            xp,
            activity,
            challenges,
        })
    }

    /// Top `limit` players and the caller's own entry
    pub fn leaderboard(
        &self,
        user_id: &str,
        limit: usize,
    ) -> StorageResult<(Vec<LeaderboardEntry>, Option<LeaderboardEntry>)> {
        let all = leaderboard::standings(&self.db)?;
        let own = leaderboard::rank_of(&all, user_id).cloned();
        Ok((all.into_iter().take(limit).collect(), own))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NewTrade;
    use chrono::Duration;

    fn setup() -> (GamificationService, Arc<Database>, EventBus, String) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let events = EventBus::new(64);
        let user = db
            .create_user("player", None, 5, Utc::now() - Duration::days(30))
            .unwrap();
        let service = GamificationService::new(
            Arc::clone(&db),
            events.clone(),
            GamificationConfig::default(),
        );
        (service, db, events, user.id)
    }

    #[tokio::test]
    async fn test_award_xp_publishes_level_up() {
        let (service, _db, events, user) = setup();
        let mut rx = events.subscribe();

        let award = service
            .award_xp(&user, 150, XpSource::Manual, Utc::now())
            .unwrap();
        assert_eq!(award.level, 2);

        assert!(matches!(rx.recv().await.unwrap(), GameEvent::XpAwarded { amount: 150, .. }));
        assert!(matches!(rx.recv().await.unwrap(), GameEvent::LevelUp { level: 2, .. }));
    }

    #[test]
    fn test_first_activity_has_no_comeback() {
        let (service, _db, _events, user) = setup();
        let outcome = service.record_activity(&user, Utc::now()).unwrap();
        assert_eq!(outcome.days_away, 0);
        assert_eq!(outcome.comeback_xp, 0);
        assert_eq!(outcome.streak.current, 1);
    }

    #[test]
    fn test_comeback_after_ten_days() {
        let (service, db, _events, user) = setup();
        let now = Utc::now();
        db.touch_last_active(&user, now - Duration::days(10)).unwrap();

        let outcome = service.record_activity(&user, now).unwrap();
        assert_eq!(outcome.days_away, 10);
        assert_eq!(outcome.comeback_xp, 500);
        assert_eq!(outcome.total_xp, 500);
        assert_eq!(db.get_user(&user).unwrap().last_active_at, Some(now));
    }

    #[test]
    fn test_streak_milestone_bonus() {
        let (service, db, _events, user) = setup();
        let now = Utc::now();
        let yesterday = now.date_naive().pred_opt().unwrap();
        db.save_streak(&user, 6, 6, yesterday, now).unwrap();
        db.touch_last_active(&user, now - Duration::days(1)).unwrap();

        let outcome = service.record_activity(&user, now).unwrap();
        assert_eq!(outcome.streak.current, 7);
        assert_eq!(outcome.streak.milestone, Some(7));
        assert_eq!(outcome.milestone_xp, 100);

        // Same day again changes nothing
        let again = service.record_activity(&user, now).unwrap();
        assert!(!again.streak.changed);
        assert_eq!(again.milestone_xp, 0);
    }

    #[test]
    fn test_challenge_completion_awards_once() {
        let (service, db, _events, user) = setup();
        let now = Utc::now();
        let challenges = service.todays_challenges(&user, now).unwrap();
        assert!(challenges.len() >= 3);
        let target = &challenges[0];

        let progress = service
            .progress_challenge(&user, &target.id, target.target, now)
            .unwrap();
        assert!(progress.completed_now);
        let award = progress.award.unwrap();
        assert_eq!(award.awarded, target.xp_reward);

        let again = service.progress_challenge(&user, &target.id, 1, now).unwrap();
        assert!(!again.completed_now);
        assert!(again.award.is_none());
        assert_eq!(db.get_xp_record(&user).unwrap().total_xp, target.xp_reward);
    }

    #[test]
    fn test_trades_logged_advances_log_trades() {
        let (service, db, _events, user) = setup();
        let now = Utc::now();
        let today = now.date_naive();
        db.insert_challenges_if_absent(
            &user,
            today,
            &[crate::storage::NewChallenge {
                kind: ChallengeKind::LogTrades,
                title: "Log 2 trades".to_string(),
                target: 2,
                xp_reward: 50,
                is_mystery: false,
            }],
        )
        .unwrap();

        let trades: Vec<Trade> = ["BTC", "ETH"]
            .iter()
            .map(|s| db.insert_trade(&user, &NewTrade::new(*s, 1.0), now).unwrap())
            .collect();

        let outcome = service.on_trades_logged(&user, &trades, now).unwrap();
        assert_eq!(outcome.xp.as_ref().map(|a| a.awarded), Some(20));
        assert_eq!(outcome.challenges.len(), 1);
        assert!(outcome.challenges[0].completed_now);
        assert_eq!(db.get_xp_record(&user).unwrap().total_xp, 70);
    }

    #[test]
    fn test_leaderboard_limit_keeps_own_rank() {
        let (service, db, _events, user) = setup();
        let other = db.create_user("rival", None, 0, Utc::now()).unwrap();
        service.award_xp(&other.id, 300, XpSource::Manual, Utc::now()).unwrap();

        let (top, own) = service.leaderboard(&user, 1).unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].user_id, other.id);
        assert_eq!(own.map(|e| e.rank), Some(2));
    }
}
