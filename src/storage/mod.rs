//! TradeQuest Storage
//!
//! SQLite-backed relational store standing in for the hosted backend:
//!
//! - **database**: connection handle, pragmas and schema
//! - **types**: row types (profiles, trades, XP, challenges, ...)
//! - **error**: error types
//! - one module per table group, each adding methods to [`Database`]
//!
//! The two stored procedures of the backend are transactional methods:
//! [`Database::add_xp`] and [`Database::deduct_upload_credit`].
//!
//! # Example
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use tradequest::storage::{Database, NewTrade, XpSource};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::open("./tradequest.db")?;
//!     let user = db.create_user("satoshi", None, 10, Utc::now())?;
//!
//!     db.deduct_upload_credit(&user.id)?;
//!     db.insert_trade(&user.id, &NewTrade::new("BTC/USDT", 42.0), Utc::now())?;
//!     db.add_xp(&user.id, 10, XpSource::TradeLogged, Utc::now())?;
//!
//!     Ok(())
//! }
//! ```

pub mod challenges;
pub mod credentials;
pub mod credits;
pub mod database;
pub mod error;
pub mod layout;
pub mod notifications;
pub mod profiles;
pub mod subscriptions;
pub mod trades;
pub mod types;
pub mod xp;

// Re-export commonly used types
pub use challenges::{ChallengeAdvance, NewChallenge};
pub use database::Database;
pub use error::{StorageError, StorageResult};
pub use profiles::hash_token;
pub use types::{
    ChallengeKind, CreditAccount, DailyChallenge, ExchangeCredential, NewTrade, Notification,
    Subscription, SubscriptionStatus, Trade, TradeFilter, TradeSide, UserProfile, WidgetPosition,
    XpAward, XpBoost, XpRecord, XpSource,
};
pub use xp::LeaderboardRow;
