//! Daily challenge catalogue and seeding

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::storage::{ChallengeKind, Database, NewChallenge, StorageResult, Trade};

/// A challenge blueprint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChallengeTemplate {
    pub kind: ChallengeKind,
    pub title: &'static str,
    pub target: u32,
    pub xp_reward: i64,
}

impl ChallengeTemplate {
    fn instantiate(&self, is_mystery: bool) -> NewChallenge {
        NewChallenge {
            kind: self.kind,
            title: if is_mystery {
                format!("Mystery: {}", self.title)
            } else {
                self.title.to_string()
            },
            target: self.target,
            xp_reward: if is_mystery {
                self.xp_reward * 2
            } else {
                self.xp_reward
            },
            is_mystery,
        }
    }
}

pub static TEMPLATES: [ChallengeTemplate; 5] = [
    ChallengeTemplate {
        kind: ChallengeKind::LogTrades,
        title: "Log 3 trades",
        target: 3,
        xp_reward: 50,
    },
    ChallengeTemplate {
        kind: ChallengeKind::AddNotes,
        title: "Write notes on 2 trades",
        target: 2,
        xp_reward: 40,
    },
    ChallengeTemplate {
        kind: ChallengeKind::AttachScreenshot,
        title: "Attach a chart screenshot",
        target: 1,
        xp_reward: 30,
    },
    ChallengeTemplate {
        kind: ChallengeKind::WinningTrade,
        title: "Close a winning trade",
        target: 1,
        xp_reward: 60,
    },
    ChallengeTemplate {
        kind: ChallengeKind::ReviewAnalytics,
        title: "Review your analytics",
        target: 1,
        xp_reward: 20,
    },
];

/// Pick a day's challenges: `count` distinct templates, and with odds
/// `1 / mystery_odds` an extra mystery challenge with double reward.
pub fn plan_daily_challenges<R: Rng + ?Sized>(
    rng: &mut R,
    count: usize,
    mystery_odds: u32,
) -> Vec<NewChallenge> {
    let picked: Vec<&ChallengeTemplate> = TEMPLATES
        .choose_multiple(rng, count.min(TEMPLATES.len()))
        .collect();
    let mut planned: Vec<NewChallenge> = picked.iter().map(|t| t.instantiate(false)).collect();

    if mystery_odds > 0 && rng.gen_range(0..mystery_odds) == 0 {
        let unused: Vec<&ChallengeTemplate> = TEMPLATES
            .iter()
            .filter(|t| !picked.iter().any(|p| p.kind == t.kind))
            .collect();
        let mystery = if unused.is_empty() {
            TEMPLATES.choose(rng)
        } else {
            unused.choose(rng).copied()
        };
        if let Some(template) = mystery {
            planned.push(template.instantiate(true));
        }
    }

    planned
}

/// Seed one user's challenges for `date`; a no-op when already seeded.
/// Returns the number of challenges inserted.
pub fn seed_for_user<R: Rng + ?Sized>(
    db: &Database,
    rng: &mut R,
    user_id: &str,
    date: NaiveDate,
    count: usize,
    mystery_odds: u32,
) -> StorageResult<usize> {
    let planned = plan_daily_challenges(rng, count, mystery_odds);
    db.insert_challenges_if_absent(user_id, date, &planned)
}

/// Outcome of seeding every user
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub seeded: usize,
    pub already_seeded: usize,
    pub failed: usize,
}

/// Seed every profile for `date`. Per-user failures are logged and counted.
pub fn seed_all<R: Rng + ?Sized>(
    db: &Database,
    rng: &mut R,
    date: NaiveDate,
    count: usize,
    mystery_odds: u32,
) -> StorageResult<SeedReport> {
    let users = db.list_users()?;
    let mut report = SeedReport {
        users: users.len(),
        ..Default::default()
    };

    for user in &users {
        match seed_for_user(db, rng, &user.id, date, count, mystery_odds) {
            Ok(0) => report.already_seeded += 1,
            Ok(_) => report.seeded += 1,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to seed daily challenges");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        date = %date,
        users = report.users,
        seeded = report.seeded,
        failed = report.failed,
        "Seeded daily challenges"
    );
    Ok(report)
}

/// How far a set of freshly logged trades advances each challenge kind
pub fn progress_from_trades(trades: &[Trade]) -> Vec<(ChallengeKind, u32)> {
    let count = |f: fn(&Trade) -> bool| trades.iter().filter(|t| f(t)).count() as u32;

    let increments = [
        (ChallengeKind::LogTrades, trades.len() as u32),
        (
            ChallengeKind::AddNotes,
            count(|t| t.notes.as_deref().is_some_and(|n| !n.trim().is_empty())),
        ),
        (ChallengeKind::AttachScreenshot, count(|t| t.screenshot_url.is_some())),
        (ChallengeKind::WinningTrade, count(|t| t.pnl > 0.0)),
    ];

    increments.into_iter().filter(|(_, n)| *n > 0).collect()
}
