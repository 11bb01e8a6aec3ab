//! WebSocket Connection Hub
//!
//! Tracks connections and their topic subscriptions, and fans game events
//! from the [`EventBus`] out to subscribers.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, RwLock};
use uuid::Uuid;

use super::messages::{user_topic, ServerMessage, WsEvent, LEADERBOARD_TOPIC, SYSTEM_TOPIC};
use crate::events::EventBus;

pub type ConnectionId = String;

pub struct ConnectionHub {
    connections: RwLock<HashMap<ConnectionId, ConnectionHandle>>,
    /// Topic → subscribed connections
    subscriptions: RwLock<HashMap<String, HashSet<ConnectionId>>>,
    config: HubConfig,
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Registrations beyond this are refused
    pub max_connections: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_connections: 1000,
        }
    }
}

/// One live socket
pub struct ConnectionHandle {
    /// Authenticated owner of the socket
    pub user_id: String,
    /// Outbound queue drained by the socket's writer task
    pub sender: mpsc::UnboundedSender<ServerMessage>,
    /// Topics this connection currently follows
    pub subscriptions: HashSet<String>,
}

impl ConnectionHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            subscriptions: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Register a connection for `user_id`, subscribed to the user's own topic
    pub async fn register(
        &self,
        user_id: &str,
        sender: mpsc::UnboundedSender<ServerMessage>,
    ) -> Result<ConnectionId, HubError> {
        let id = Uuid::new_v4().to_string();
        let own_topic = user_topic(user_id);

        {
            let mut connections = self.connections.write().await;
            if connections.len() >= self.config.max_connections {
                return Err(HubError::TooManyConnections(self.config.max_connections));
            }
            connections.insert(
                id.clone(),
                ConnectionHandle {
                    user_id: user_id.to_string(),
                    sender,
                    subscriptions: HashSet::from([own_topic.clone()]),
                },
            );
        }

        self.subscriptions
            .write()
            .await
            .entry(own_topic)
            .or_default()
            .insert(id.clone());

        tracing::info!(connection_id = %id, user_id = %user_id, "WebSocket connected");
        Ok(id)
    }

    /// Unregister a connection and clean up its subscriptions
    pub async fn unregister(&self, id: &str) {
        let handle = self.connections.write().await.remove(id);

        if let Some(handle) = handle {
            let mut subs = self.subscriptions.write().await;
            for topic in handle.subscriptions {
                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
            }
        }

        tracing::info!(connection_id = %id, "WebSocket disconnected");
    }

    /// Subscribe a connection to topics; topics it may not see are skipped
    pub async fn subscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut subscribed = Vec::new();

        for topic in topics {
            if !is_allowed_topic(&handle.user_id, &topic) {
                tracing::warn!(connection_id = %id, topic = %topic, "Topic not allowed, ignored");
                continue;
            }

            handle.subscriptions.insert(topic.clone());
            subs.entry(topic.clone()).or_default().insert(id.to_string());
            subscribed.push(topic);
        }

        tracing::debug!(connection_id = %id, topics = ?subscribed, "Subscribed to topics");
        Ok(subscribed)
    }

    pub async fn unsubscribe(&self, id: &str, topics: Vec<String>) -> Result<Vec<String>, HubError> {
        let mut connections = self.connections.write().await;
        let handle = connections.get_mut(id).ok_or(HubError::ConnectionNotFound)?;

        let mut subs = self.subscriptions.write().await;
        let mut unsubscribed = Vec::new();

        for topic in topics {
            if handle.subscriptions.remove(&topic) {
                if let Some(subscribers) = subs.get_mut(&topic) {
                    subscribers.remove(id);
                    if subscribers.is_empty() {
                        subs.remove(&topic);
                    }
                }
                unsubscribed.push(topic);
            }
        }

        tracing::debug!(connection_id = %id, topics = ?unsubscribed, "Unsubscribed from topics");
        Ok(unsubscribed)
    }

    /// Send an event to every subscriber of its topic; returns the number
    /// of connections reached
    pub async fn broadcast(&self, event: &WsEvent) -> usize {
        let connections = self.connections.read().await;
        let subs = self.subscriptions.read().await;
        let Some(ids) = subs.get(&event.topic) else {
            return 0;
        };

        let sent = ids
            .iter()
            .filter_map(|id| connections.get(id))
            .filter(|handle| handle.sender.send(event.message.clone()).is_ok())
            .count();

        if sent > 0 {
            tracing::trace!(topic = %event.topic, subscribers = sent, "Broadcast event");
        }
        sent
    }

    pub async fn send_to(&self, id: &str, message: ServerMessage) -> Result<(), HubError> {
        let connections = self.connections.read().await;
        let handle = connections.get(id).ok_or(HubError::ConnectionNotFound)?;

        handle.sender.send(message).map_err(|_| HubError::SendFailed)
    }

    /// Forward bus events to topics until the bus closes
    pub fn forward_events(self: Arc<Self>, bus: &EventBus) -> tokio::task::JoinHandle<()> {
        let mut rx = bus.subscribe();

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        for ws_event in WsEvent::from_game_event(&event) {
                            self.broadcast(&ws_event).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "WebSocket forwarder lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            tracing::debug!("Event bus closed, WebSocket forwarder stopped");
        })
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn subscription_count(&self, topic: &str) -> usize {
        self.subscriptions
            .read()
            .await
            .get(topic)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

/// Users may follow their own topic and the shared ones
fn is_allowed_topic(user_id: &str, topic: &str) -> bool {
    topic == LEADERBOARD_TOPIC || topic == SYSTEM_TOPIC || topic == user_topic(user_id)
}

#[derive(Debug, Error)]
pub enum HubError {
    #[error("Too many connections (limit: {0})")]
    TooManyConnections(usize),

    #[error("Connection not found")]
    ConnectionNotFound,

    #[error("Failed to send message")]
    SendFailed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GameEvent;

    fn level_up(user: &str) -> GameEvent {
        GameEvent::LevelUp {
            user_id: user.to_string(),
            previous_level: 1,
            level: 2,
        }
    }

    #[test]
    fn test_allowed_topics() {
        assert!(is_allowed_topic("u1", "user.u1"));
        assert!(is_allowed_topic("u1", "leaderboard"));
        assert!(is_allowed_topic("u1", "system"));

        assert!(!is_allowed_topic("u1", "user.u2"));
        assert!(!is_allowed_topic("u1", ""));
        assert!(!is_allowed_topic("u1", "user.*"));
    }

    #[tokio::test]
    async fn test_register_subscribes_own_topic() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();

        let id = hub.register("u1", tx).await.unwrap();
        assert_eq!(hub.connection_count().await, 1);
        assert_eq!(hub.subscription_count("user.u1").await, 1);

        hub.unregister(&id).await;
        assert_eq!(hub.connection_count().await, 0);
        assert_eq!(hub.subscription_count("user.u1").await, 0);
    }

    #[tokio::test]
    async fn test_subscribe_filters_foreign_topics() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        let id = hub.register("u1", tx).await.unwrap();

        let subscribed = hub
            .subscribe(&id, vec!["leaderboard".to_string(), "user.u2".to_string()])
            .await
            .unwrap();
        assert_eq!(subscribed, vec!["leaderboard"]);

        let unsubscribed = hub
            .unsubscribe(&id, vec!["leaderboard".to_string(), "system".to_string()])
            .await
            .unwrap();
        assert_eq!(unsubscribed, vec!["leaderboard"]);
        assert_eq!(hub.subscription_count("leaderboard").await, 0);
    }

    #[tokio::test]
    async fn test_connection_limit() {
        let hub = ConnectionHub::new(HubConfig { max_connections: 1 });
        let (tx1, _) = mpsc::unbounded_channel();
        let (tx2, _) = mpsc::unbounded_channel();

        hub.register("u1", tx1).await.unwrap();
        let result = hub.register("u2", tx2).await;
        assert!(matches!(result, Err(HubError::TooManyConnections(1))));
    }

    #[tokio::test]
    async fn test_broadcast_reaches_only_subscribers() {
        let hub = ConnectionHub::new(HubConfig::default());
        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        hub.register("u1", tx1).await.unwrap();
        hub.register("u2", tx2).await.unwrap();

        for event in WsEvent::from_game_event(&level_up("u1")) {
            hub.broadcast(&event).await;
        }

        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_forwarder_delivers_bus_events() {
        let hub = Arc::new(ConnectionHub::new(HubConfig::default()));
        let bus = EventBus::new(16);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = hub.register("u1", tx).await.unwrap();
        hub.subscribe(&id, vec!["leaderboard".to_string()]).await.unwrap();

        let forwarder = Arc::clone(&hub).forward_events(&bus);
        bus.publish(level_up("u1"));

        // Once on the user topic, once on the leaderboard
        for expected in ["user.u1", "leaderboard"] {
            match rx.recv().await.unwrap() {
                ServerMessage::Event { topic, .. } => assert_eq!(topic, expected),
                other => panic!("unexpected message {:?}", other),
            }
        }

        drop(bus);
        forwarder.await.unwrap();
    }
}
