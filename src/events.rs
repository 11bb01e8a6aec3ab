//! Application event bus
//!
//! Producers (the gamification service, batch uploads) publish
//! [`GameEvent`]s; the WebSocket hub subscribes and fans them out to topics.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::storage::XpSource;

/// Something a player should hear about in real time
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    XpAwarded {
        user_id: String,
        amount: i64,
        source: XpSource,
        multiplier: f64,
        total_xp: i64,
        level: u32,
    },
    LevelUp {
        user_id: String,
        previous_level: u32,
        level: u32,
    },
    ChallengeCompleted {
        user_id: String,
        challenge_id: String,
        title: String,
        xp_reward: i64,
    },
    StreakUpdated {
        user_id: String,
        current: u32,
        longest: u32,
    },
    ComebackBonus {
        user_id: String,
        days_away: i64,
        xp: i64,
    },
    CreditsChanged {
        user_id: String,
        balance: i64,
    },
}

impl GameEvent {
    /// Owner of the event
    pub fn user_id(&self) -> &str {
        match self {
            GameEvent::XpAwarded { user_id, .. }
            | GameEvent::LevelUp { user_id, .. }
            | GameEvent::ChallengeCompleted { user_id, .. }
            | GameEvent::StreakUpdated { user_id, .. }
            | GameEvent::ComebackBonus { user_id, .. }
            | GameEvent::CreditsChanged { user_id, .. } => user_id,
        }
    }

    /// Whether leaderboard standings may have moved
    pub fn affects_leaderboard(&self) -> bool {
        matches!(self, GameEvent::XpAwarded { .. } | GameEvent::LevelUp { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::XpAwarded { .. } => "xp_awarded",
            GameEvent::LevelUp { .. } => "level_up",
            GameEvent::ChallengeCompleted { .. } => "challenge_completed",
            GameEvent::StreakUpdated { .. } => "streak_updated",
            GameEvent::ComebackBonus { .. } => "comeback_bonus",
            GameEvent::CreditsChanged { .. } => "credits_changed",
        }
    }
}

/// Cloneable handle to the broadcast channel
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<GameEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish to every current subscriber. Returns the number of receivers;
    /// publishing with nobody listening is not an error.
    pub fn publish(&self, event: GameEvent) -> usize {
        tracing::trace!(kind = event.kind(), user_id = %event.user_id(), "Publishing event");
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
