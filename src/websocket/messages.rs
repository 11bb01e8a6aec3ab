//! WebSocket message types

use serde::{Deserialize, Serialize};

use crate::events::GameEvent;

pub const LEADERBOARD_TOPIC: &str = "leaderboard";
pub const SYSTEM_TOPIC: &str = "system";

/// Personal topic of a user
pub fn user_topic(user_id: &str) -> String {
    format!("user.{}", user_id)
}

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { topics: Vec<String> },
    Unsubscribe { topics: Vec<String> },
    Ping,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A game event on one of the subscribed topics
    Event {
        topic: String,
        event: GameEvent,
    },
    Subscribed {
        topics: Vec<String>,
    },
    Unsubscribed {
        topics: Vec<String>,
    },
    Pong,
    Error {
        message: String,
    },
    Connected {
        connection_id: String,
        user_id: String,
    },
    /// Server announcement
    System {
        message: String,
    },
}

/// Internal event for broadcasting through the hub
#[derive(Debug, Clone)]
pub struct WsEvent {
    pub topic: String,
    pub message: ServerMessage,
}

impl WsEvent {
    pub fn game(topic: impl Into<String>, event: GameEvent) -> Self {
        let topic = topic.into();
        Self {
            message: ServerMessage::Event {
                topic: topic.clone(),
                event,
            },
            topic,
        }
    }

    /// Topic events for a game event: always the owner's topic, plus the
    /// leaderboard when standings may have moved
    pub fn from_game_event(event: &GameEvent) -> Vec<Self> {
        let mut out = vec![Self::game(user_topic(event.user_id()), event.clone())];
        if event.affects_leaderboard() {
            out.push(Self::game(LEADERBOARD_TOPIC, event.clone()));
        }
        out
    }

    pub fn system(message: &str) -> Self {
        Self {
            topic: SYSTEM_TOPIC.to_string(),
            message: ServerMessage::System {
                message: message.to_string(),
            },
        }
    }
}
