//! Daily challenge seeding job

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

use super::{Job, JobError, JobOutcome};
use crate::config::GamificationConfig;
use crate::gamification::seed_all;
use crate::storage::Database;

pub const NAME: &str = "daily-challenges";

pub struct DailyChallengesJob {
    db: Arc<Database>,
    config: GamificationConfig,
}

impl DailyChallengesJob {
    pub fn new(db: Arc<Database>, config: GamificationConfig) -> Self {
        Self { db, config }
    }
}

#[async_trait]
impl Job for DailyChallengesJob {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Seed today's challenges for every user"
    }

    async fn run(&self, now: DateTime<Utc>) -> Result<JobOutcome, JobError> {
        let mut rng = StdRng::from_entropy();
        let report = seed_all(
            &self.db,
            &mut rng,
            now.date_naive(),
            self.config.daily_challenge_count,
            self.config.mystery_odds,
        )?;

        Ok(JobOutcome {
            processed: report.seeded,
            failed: report.failed,
            detail: serde_json::to_value(&report).unwrap_or_default(),
        })
    }
}
