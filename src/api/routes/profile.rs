//! Profile Routes
//!
//! - GET /api/v1/profile - Profile, XP, level progress, credits and plan
//! - POST /api/v1/activity - Record a visit (streak and comeback bonus)

use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::dto::ProfileResponse;
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::gamification::{ActivityOutcome, LevelProgress};

/// GET /api/v1/profile
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = state.db.get_user(&user.user_id)?;
    let xp = state.db.get_xp_record(&user.user_id)?;
    let credits = state.db.credit_account(&user.user_id)?;
    let subscription = state.db.get_subscription(&user.user_id)?;
    let entitlements = user.entitlements(&state).await?;

    Ok(Json(ProfileResponse {
        progress: LevelProgress::from_total(xp.total_xp),
        profile,
        xp,
        credits,
        entitlements,
        subscription,
    }))
}

/// POST /api/v1/activity
pub async fn record_activity(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<ActivityOutcome>> {
    Ok(Json(state.gamification.record_activity(&user.user_id, Utc::now())?))
}
