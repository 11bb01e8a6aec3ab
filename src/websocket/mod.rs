//! Real-time game events over WebSocket
//!
//! - **ConnectionHub**: connections, topic subscriptions, event fan-out
//! - **Handler**: authenticated upgrade and per-connection message loop
//! - **Messages**: client and server message formats
//!
//! Clients connect to `/api/v1/ws?token=<token>` and are subscribed to their
//! own `user.<id>` topic automatically. They may also subscribe to:
//! - `leaderboard` - XP and level changes of every player
//! - `system` - server announcements
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8090/api/v1/ws?token=' + token);
//! ws.onopen = () => ws.send(JSON.stringify({type: 'subscribe', topics: ['leaderboard']}));
//! ws.onmessage = (event) => console.log(JSON.parse(event.data));
//! ```

mod handler;
mod hub;
mod messages;

pub use handler::websocket_handler;
pub use hub::{ConnectionHub, HubConfig, HubError};
pub use messages::{ClientMessage, ServerMessage, WsEvent};
