//! Challenge and leaderboard routes
//!
//! - GET /api/v1/challenges/today - Today's challenges, seeded on first view
//! - POST /api/v1/challenges/:id/progress - Advance a challenge
//! - GET /api/v1/leaderboard - Top players and own rank

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::dto::{LeaderboardResponse, LimitQuery, ProgressRequest};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::gamification::ChallengeProgress;
use crate::storage::DailyChallenge;

const DEFAULT_LEADERBOARD_SIZE: usize = 10;
const MAX_LEADERBOARD_SIZE: usize = 100;

/// GET /api/v1/challenges/today
pub async fn todays_challenges(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<DailyChallenge>>> {
    Ok(Json(state.gamification.todays_challenges(&user.user_id, Utc::now())?))
}

/// POST /api/v1/challenges/:id/progress
///
/// Body is optional; the increment defaults to 1.
pub async fn progress_challenge(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    body: Option<Json<ProgressRequest>>,
) -> ApiResult<Json<ChallengeProgress>> {
    let increment = body
        .and_then(|Json(req)| req.increment)
        .unwrap_or(1)
        .max(1);

    let progress = state
        .gamification
        .progress_challenge(&user.user_id, &id, increment, Utc::now())?;
    Ok(Json(progress))
}

/// GET /api/v1/leaderboard
pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<LeaderboardResponse>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
        .clamp(1, MAX_LEADERBOARD_SIZE);
    let (entries, me) = state.gamification.leaderboard(&user.user_id, limit)?;
    Ok(Json(LeaderboardResponse { entries, me }))
}
