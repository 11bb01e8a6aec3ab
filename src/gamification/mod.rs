//! Gamification
//!
//! - **levels**: XP to level curve
//! - **streak**: consecutive-day activity counters and milestones
//! - **comeback**: bonus for returning after a break
//! - **challenges**: daily challenge catalogue and seeding
//! - **leaderboard**: competition ranking
//! - **service**: [`GamificationService`], which ties the above to storage
//!   and the event bus

pub mod challenges;
pub mod comeback;
pub mod leaderboard;
pub mod levels;
pub mod service;
pub mod streak;

pub use challenges::{plan_daily_challenges, seed_all, seed_for_user, SeedReport, TEMPLATES};
pub use comeback::{comeback_reward, ComebackPolicy};
pub use leaderboard::{assign_ranks, rank_of, LeaderboardEntry};
pub use levels::{level_for_xp, xp_for_level, LevelProgress};
pub use service::{ActivityOutcome, ChallengeProgress, GamificationService, TradesLoggedOutcome};
pub use streak::{advance_streak, StreakUpdate};
