//! # TradeQuest
//!
//! Backend for a gamified crypto trading journal. Traders log trades, review
//! analytics and earn XP, levels and streaks for keeping the journal up.
//!
//! ## Modules
//!
//! - [`storage`]: SQLite store for profiles, trades, XP, challenges and plans
//! - [`trades`]: trade validation, CSV import and analytics
//! - [`credits`]: upload credits and batch uploads
//! - [`gamification`]: XP levels, streaks, daily challenges, comeback rewards
//! - [`pricing`] / [`entitlements`]: plan catalog and feature gating
//! - [`fx`], [`payments`], [`crypto`]: exchange rates, checkout lookup, credential encryption
//! - [`jobs`]: scheduled daily challenge seeding and inactivity scans
//! - [`api`] / [`websocket`]: REST API and live game events
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tradequest::{api, AppState, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let api_config = config.api.clone();
//!
//!     let state = AppState::from_config(config).await?;
//!     let _background = state.start_background();
//!
//!     api::serve(state, &api_config).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod credits;
pub mod crypto;
pub mod entitlements;
pub mod events;
pub mod fx;
pub mod gamification;
pub mod jobs;
pub mod layout;
pub mod payments;
pub mod pricing;
pub mod storage;
pub mod trades;
pub mod websocket;

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError};

pub use storage::{Database, StorageError, StorageResult, Trade, UserProfile};

pub use events::{EventBus, GameEvent};

pub use gamification::GamificationService;

pub use jobs::{Job, JobScheduler};

pub use websocket::{ConnectionHub, WsEvent};
