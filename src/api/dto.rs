//! Data Transfer Objects
//!
//! Request and response bodies for the API endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credits::BatchUploadReport;
use crate::entitlements::Entitlements;
use crate::gamification::{LeaderboardEntry, LevelProgress, TradesLoggedOutcome};
use crate::jobs::JobStatus;
use crate::pricing::{BillingCycle, Plan, PlanTier};
use crate::storage::{
    CreditAccount, NewTrade, Subscription, SubscriptionStatus, Trade, UserProfile, WidgetPosition,
    XpRecord,
};
use crate::trades::CsvImportResult;

// ============================================
// TRADES
// ============================================

/// Trades to store in one request, each costing one credit
#[derive(Debug, Deserialize)]
pub struct BatchUploadRequest {
    pub trades: Vec<NewTrade>,
}

/// Upload report plus whatever the inserted trades earned.
///
/// `rewards` is omitted when nothing was inserted or the rewards could not
/// be applied; the stored trades and spent credits stand either way.
#[derive(Debug, Serialize)]
pub struct BatchUploadResponse {
    #[serde(flatten)]
    pub report: BatchUploadReport,
    /// XP and challenge progress earned by the inserted trades
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewards: Option<TradesLoggedOutcome>,
}

#[derive(Debug, Serialize)]
pub struct CreateTradeResponse {
    pub trade: Trade,
    /// Balance after paying for this trade
    pub remaining_credits: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewards: Option<TradesLoggedOutcome>,
}

#[derive(Debug, Serialize)]
pub struct CsvImportResponse {
    /// Parse summary, including rows that were rejected
    pub import: CsvImportResult,
    /// Outcome of storing the parsed rows
    pub upload: BatchUploadResponse,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTradeRequest {
    /// Replaces the existing notes; blank clears them
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CountQuery {
    /// Trades the client intends to upload (default 1)
    pub count: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub symbol: Option<String>,
    /// Only trades closed at or after this instant
    pub since: Option<DateTime<Utc>>,
}

// ============================================
// PROFILE & GAMIFICATION
// ============================================

/// Everything the dashboard header needs in one call
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: UserProfile,
    pub xp: XpRecord,
    /// XP into the current level and XP still needed for the next
    pub progress: LevelProgress,
    pub credits: CreditAccount,
    pub entitlements: Entitlements,
    /// Absent for users who never subscribed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProgressRequest {
    /// Defaults to 1
    pub increment: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
    /// The caller's own standing, even outside the top entries
    pub me: Option<LeaderboardEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LayoutBody {
    pub widgets: Vec<WidgetPosition>,
}

// ============================================
// CREDENTIALS & PAYMENTS
// ============================================

#[derive(Debug, Deserialize)]
pub struct CreateCredentialRequest {
    pub exchange: String,
    #[serde(default)]
    pub label: Option<String>,
    /// Plaintext; encrypted before it reaches storage
    pub api_key: String,
    /// Plaintext; encrypted before it reaches storage and never echoed back
    pub api_secret: String,
}

/// Stored credential with the key masked and the secret never returned
#[derive(Debug, Serialize)]
pub struct CredentialResponse {
    pub id: String,
    pub exchange: String,
    pub label: Option<String>,
    /// First and last four characters of the key
    pub api_key_masked: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    #[serde(flatten)]
    pub plan: &'static Plan,
    /// Dollars saved per year on annual billing
    pub annual_savings: i64,
    /// Savings relative to twelve monthly payments, rounded
    pub savings_percent: u32,
}

#[derive(Debug, Deserialize)]
pub struct FxQuery {
    /// ISO 4217 code, any case
    pub from: String,
    pub to: String,
    #[serde(default = "default_amount")]
    pub amount: f64,
}

fn default_amount() -> f64 {
    1.0
}

#[derive(Debug, Serialize)]
pub struct FxResponse {
    pub from: String,
    pub to: String,
    pub amount: f64,
    /// `amount * rate`
    pub converted: f64,
    pub rate: f64,
    /// When the rate was fetched from the provider
    pub fetched_at: DateTime<Utc>,
    /// Served from cache past its freshness window because the provider failed
    pub stale: bool,
}

// ============================================
// ADMIN
// ============================================

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateUserResponse {
    pub user: UserProfile,
    /// Shown once
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct GrantCreditsRequest {
    pub user_id: String,
    /// Must be positive
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateBoostRequest {
    pub user_id: String,
    pub multiplier: f64,
    /// Defaults to now
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// Positive, and small enough that the end time stays representable
    pub duration_hours: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertSubscriptionRequest {
    pub user_id: String,
    pub plan: PlanTier,
    #[serde(default = "default_cycle")]
    pub billing_cycle: BillingCycle,
    pub status: SubscriptionStatus,
    /// None for plans without a fixed end
    #[serde(default)]
    pub current_period_end: Option<DateTime<Utc>>,
}

fn default_cycle() -> BillingCycle {
    BillingCycle::Monthly
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription: Subscription,
    /// Credits granted because the plan became active
    pub credits_granted: i64,
    pub credits: CreditAccount,
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobStatus>,
}

// ============================================
// HEALTH
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "unhealthy"
    pub status: String,
    /// "ok" or "error"
    pub database: String,
    pub scheduler: String,
    /// Open WebSocket connections
    pub ws_connections: usize,
    pub uptime_seconds: u64,
    pub version: String,
}
