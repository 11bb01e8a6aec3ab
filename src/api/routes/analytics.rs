//! Analytics and credit routes
//!
//! - GET /api/v1/analytics - Trade statistics; per-symbol breakdown on Pro
//! - GET /api/v1/credits/check - Whether `count` uploads would succeed

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::dto::{AnalyticsQuery, CountQuery};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::credits::{check_credits, CreditCheck};
use crate::entitlements::Feature;
use crate::storage::{ChallengeKind, TradeFilter};
use crate::trades::{compute_analytics, TradeAnalytics};

/// GET /api/v1/analytics
///
/// Viewing analytics counts toward the review challenge.
pub async fn get_analytics(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<AnalyticsQuery>,
) -> ApiResult<Json<TradeAnalytics>> {
    let entitlements = user.entitlements(&state).await?;

    let filter = TradeFilter {
        symbol: query.symbol.map(|s| s.trim().to_uppercase()),
        since: query.since,
        limit: None,
    };
    let trades = state.db.list_trades(&user.user_id, &filter)?;
    let analytics = compute_analytics(&trades, entitlements.allows(Feature::AdvancedAnalytics));

    if let Err(e) = state
        .gamification
        .advance_kind(&user.user_id, ChallengeKind::ReviewAnalytics, 1, Utc::now())
    {
        tracing::warn!(user_id = %user.user_id, error = %e, "Failed to advance review challenge");
    }

    Ok(Json(analytics))
}

/// GET /api/v1/credits/check?count=n
pub async fn check(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<CountQuery>,
) -> ApiResult<Json<CreditCheck>> {
    Ok(Json(check_credits(
        &state.db,
        &user.user_id,
        query.count.unwrap_or(1),
    )?))
}
