//! Core data types for the TradeQuest persistence layer
//!
//! This module defines the rows the service reads and writes:
//! - `UserProfile`, `XpRecord`, `XpBoost`: player state
//! - `Trade` / `NewTrade`: journal entries
//! - `DailyChallenge`, `WidgetPosition`, `Notification`: per-user features
//! - `Subscription`, `CreditAccount`, `ExchangeCredential`: billing and secrets

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::pricing::{BillingCycle, PlanTier};

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    /// UUID v4
    pub id: String,
    /// Unique login name
    pub username: String,
    /// Shown on the leaderboard instead of the username when set
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Last time the user recorded any activity
    pub last_active_at: Option<DateTime<Utc>>,
}

/// XP, level and streak state for one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct XpRecord {
    pub user_id: String,
    /// Lifetime XP, never decreases
    pub total_xp: i64,
    /// Derived from `total_xp`, starts at 1
    pub level: u32,
    /// Consecutive active days ending at `last_activity_date`
    pub current_streak: u32,
    pub longest_streak: u32,
    /// UTC day of the last recorded activity
    pub last_activity_date: Option<NaiveDate>,
    pub updated_at: DateTime<Utc>,
}

impl XpRecord {
    /// Fresh record for a user who has never earned XP
    pub fn empty(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            total_xp: 0,
            level: 1,
            current_streak: 0,
            longest_streak: 0,
            last_activity_date: None,
            updated_at: now,
        }
    }
}

/// Why XP was awarded
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum XpSource {
    TradeLogged,
    Challenge,
    StreakMilestone,
    Comeback,
    Manual,
}

impl XpSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            XpSource::TradeLogged => "trade_logged",
            XpSource::Challenge => "challenge",
            XpSource::StreakMilestone => "streak_milestone",
            XpSource::Comeback => "comeback",
            XpSource::Manual => "manual",
        }
    }
}

impl fmt::Display for XpSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for XpSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trade_logged" => Ok(XpSource::TradeLogged),
            "challenge" => Ok(XpSource::Challenge),
            "streak_milestone" => Ok(XpSource::StreakMilestone),
            "comeback" => Ok(XpSource::Comeback),
            "manual" => Ok(XpSource::Manual),
            other => Err(format!("unknown xp source '{}'", other)),
        }
    }
}

/// Result of one `add_xp` call
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct XpAward {
    pub user_id: String,
    pub source: XpSource,
    /// Amount requested before boosts
    pub base_amount: i64,
    /// Multiplier of the strongest active boost (1.0 when none)
    pub multiplier: f64,
    /// Amount actually credited
    pub awarded: i64,
    /// Total after this award
    pub total_xp: i64,
    pub previous_level: u32,
    pub level: u32,
}

impl XpAward {
    pub fn leveled_up(&self) -> bool {
        self.level > self.previous_level
    }
}

/// Time-boxed XP multiplier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct XpBoost {
    pub id: String,
    pub user_id: String,
    /// Applied to base XP while active; overlapping boosts do not stack
    pub multiplier: f64,
    pub starts_at: DateTime<Utc>,
    /// Exclusive
    pub ends_at: DateTime<Utc>,
    /// Free text shown to the player, e.g. "weekend event"
    pub reason: Option<String>,
}

impl XpBoost {
    /// Boost window is half-open: `[starts_at, ends_at)`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now < self.ends_at
    }
}

/// Long or short
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Long,
    Short,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Long => "long",
            TradeSide::Short => "short",
        }
    }
}

impl FromStr for TradeSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "long" | "buy" => Ok(TradeSide::Long),
            "short" | "sell" => Ok(TradeSide::Short),
            other => Err(format!("unknown trade side '{}'", other)),
        }
    }
}

/// A journal entry as submitted by a client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTrade {
    /// Ticker or pair, normalized to upper case on validation
    pub symbol: String,
    /// Defaults to long
    #[serde(default = "default_side")]
    pub side: TradeSide,
    #[serde(default)]
    pub entry_price: Option<f64>,
    #[serde(default)]
    pub exit_price: Option<f64>,
    #[serde(default)]
    pub quantity: Option<f64>,
    /// Realized profit or loss in quote currency
    pub pnl: f64,
    /// Return on investment in percent
    #[serde(default)]
    pub roi: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Must be an http(s) URL
    #[serde(default)]
    pub screenshot_url: Option<String>,
    /// Defaults to the time of insertion
    #[serde(default)]
    pub traded_at: Option<DateTime<Utc>>,
}

fn default_side() -> TradeSide {
    TradeSide::Long
}

impl NewTrade {
    /// Minimal trade: symbol and realized PnL
    pub fn new(symbol: impl Into<String>, pnl: f64) -> Self {
        Self {
            symbol: symbol.into(),
            side: TradeSide::Long,
            entry_price: None,
            exit_price: None,
            quantity: None,
            pnl,
            roi: None,
            notes: None,
            screenshot_url: None,
            traded_at: None,
        }
    }

    /// Builder method: set the side
    pub fn side(mut self, side: TradeSide) -> Self {
        self.side = side;
        self
    }

    /// Builder method: set ROI in percent
    pub fn roi(mut self, roi: f64) -> Self {
        self.roi = Some(roi);
        self
    }

    /// Builder method: attach notes
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Builder method: attach a screenshot
    pub fn screenshot(mut self, url: impl Into<String>) -> Self {
        self.screenshot_url = Some(url.into());
        self
    }

    /// Builder method: set trade time
    pub fn traded_at(mut self, at: DateTime<Utc>) -> Self {
        self.traded_at = Some(at);
        self
    }
}

/// A persisted journal entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    pub id: String,
    pub user_id: String,
    pub symbol: String,
    pub side: TradeSide,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub quantity: Option<f64>,
    pub pnl: f64,
    /// Percent
    pub roi: Option<f64>,
    pub notes: Option<String>,
    pub screenshot_url: Option<String>,
    /// When the trade was closed, as reported by the client
    pub traded_at: DateTime<Utc>,
    /// When the row was stored
    pub created_at: DateTime<Utc>,
}

/// Optional filters for listing trades
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TradeFilter {
    /// Exact match on the normalized symbol
    pub symbol: Option<String>,
    /// Inclusive lower bound on `traded_at`
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Kind of daily challenge
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    LogTrades,
    AddNotes,
    AttachScreenshot,
    WinningTrade,
    ReviewAnalytics,
}

impl ChallengeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeKind::LogTrades => "log_trades",
            ChallengeKind::AddNotes => "add_notes",
            ChallengeKind::AttachScreenshot => "attach_screenshot",
            ChallengeKind::WinningTrade => "winning_trade",
            ChallengeKind::ReviewAnalytics => "review_analytics",
        }
    }
}

impl FromStr for ChallengeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log_trades" => Ok(ChallengeKind::LogTrades),
            "add_notes" => Ok(ChallengeKind::AddNotes),
            "attach_screenshot" => Ok(ChallengeKind::AttachScreenshot),
            "winning_trade" => Ok(ChallengeKind::WinningTrade),
            "review_analytics" => Ok(ChallengeKind::ReviewAnalytics),
            other => Err(format!("unknown challenge kind '{}'", other)),
        }
    }
}

/// One challenge instance for one user and day
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyChallenge {
    pub id: String,
    pub user_id: String,
    /// UTC day the challenge belongs to
    pub challenge_date: NaiveDate,
    pub kind: ChallengeKind,
    pub title: String,
    /// Progress needed to complete
    pub target: u32,
    /// Capped at `target`
    pub progress: u32,
    /// Credited once, when the challenge completes
    pub xp_reward: i64,
    /// Bonus challenge worth double XP
    pub is_mystery: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl DailyChallenge {
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Placement of a dashboard widget on the grid
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WidgetPosition {
    pub widget_id: String,
    /// Zero-based, left to right
    pub column: u32,
    /// Zero-based, top to bottom
    pub row: u32,
    /// Columns spanned
    #[serde(default = "default_span")]
    pub width: u32,
    #[serde(default = "default_span")]
    pub height: u32,
}

fn default_span() -> u32 {
    1
}

impl WidgetPosition {
    pub fn new(widget_id: impl Into<String>, column: u32, row: u32, width: u32, height: u32) -> Self {
        Self {
            widget_id: widget_id.into(),
            column,
            row,
            width,
            height,
        }
    }
}

/// Subscription lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Trialing => "trialing",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Canceled => "canceled",
        }
    }

    /// Whether the plan's features should be granted
    pub fn grants_access(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }
}

impl FromStr for SubscriptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(SubscriptionStatus::Active),
            "trialing" => Ok(SubscriptionStatus::Trialing),
            "past_due" => Ok(SubscriptionStatus::PastDue),
            "canceled" | "cancelled" => Ok(SubscriptionStatus::Canceled),
            other => Err(format!("unknown subscription status '{}'", other)),
        }
    }
}

/// A user's plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subscription {
    pub user_id: String,
    pub plan: PlanTier,
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    /// After this the plan falls back to basic regardless of status
    pub current_period_end: Option<DateTime<Utc>>,
}

/// Upload credit balance
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreditAccount {
    pub user_id: String,
    /// Trades the user may still upload; never negative
    pub balance: i64,
    /// Credits spent over the account's lifetime
    pub lifetime_used: i64,
}

/// In-app notification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    /// Machine-readable category, e.g. `inactivity`
    pub kind: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

/// Exchange API credentials, encrypted at rest
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeCredential {
    pub id: String,
    pub user_id: String,
    /// Lower-cased exchange name
    pub exchange: String,
    pub label: Option<String>,
    /// `hex(nonce):hex(ciphertext)` under AES-256-GCM
    pub api_key_ciphertext: String,
    pub api_secret_ciphertext: String,
    pub created_at: DateTime<Utc>,
}
