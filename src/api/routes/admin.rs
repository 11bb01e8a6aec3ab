//! Administration Routes (service role)
//!
//! - POST /api/v1/admin/users - Create a user and issue a token
//! - POST /api/v1/admin/credits - Grant upload credits
//! - POST /api/v1/admin/boosts - Grant a time-boxed XP boost
//! - PUT /api/v1/admin/subscriptions - Set a user's plan
//! - GET /api/v1/jobs - Scheduled job status
//! - POST /api/v1/jobs/:name/run - Run a job now

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{Duration, Utc};
use std::sync::Arc;

use crate::api::auth::ServiceRole;
use crate::api::dto::{
    CreateBoostRequest, CreateUserRequest, CreateUserResponse, GrantCreditsRequest,
    JobListResponse, SubscriptionResponse, UpsertSubscriptionRequest,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::events::GameEvent;
use crate::jobs::JobOutcome;
use crate::pricing::plan;
use crate::storage::{CreditAccount, Subscription, XpBoost};

/// POST /api/v1/admin/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    _role: ServiceRole,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<CreateUserResponse>)> {
    let now = Utc::now();
    let user = state.db.create_user(
        &req.username,
        req.display_name.as_deref(),
        state.config.credits.starting_credits,
        now,
    )?;
    let token = state.db.issue_token(&user.id, now)?;

    Ok((StatusCode::CREATED, Json(CreateUserResponse { user, token })))
}

/// POST /api/v1/admin/credits
pub async fn grant_credits(
    State(state): State<Arc<AppState>>,
    _role: ServiceRole,
    Json(req): Json<GrantCreditsRequest>,
) -> ApiResult<Json<CreditAccount>> {
    let account = state.db.grant_credits(&req.user_id, req.amount)?;
    state.events.publish(GameEvent::CreditsChanged {
        user_id: account.user_id.clone(),
        balance: account.balance,
    });

    tracing::info!(user_id = %req.user_id, amount = req.amount, "Granted credits");
    Ok(Json(account))
}

/// POST /api/v1/admin/boosts
pub async fn create_boost(
    State(state): State<Arc<AppState>>,
    _role: ServiceRole,
    Json(req): Json<CreateBoostRequest>,
) -> ApiResult<(StatusCode, Json<XpBoost>)> {
    if req.duration_hours <= 0 {
        return Err(ApiError::Validation("duration_hours must be positive".to_string()));
    }
    let starts_at = req.starts_at.unwrap_or_else(Utc::now);
    let ends_at = Duration::try_hours(req.duration_hours)
        .and_then(|duration| starts_at.checked_add_signed(duration))
        .ok_or_else(|| {
            ApiError::Validation(format!("duration_hours {} is out of range", req.duration_hours))
        })?;
    let boost = state.db.create_boost(
        &req.user_id,
        req.multiplier,
        starts_at,
        ends_at,
        req.reason.as_deref(),
    )?;

    Ok((StatusCode::CREATED, Json(boost)))
}

/// PUT /api/v1/admin/subscriptions
///
/// A plan that becomes active (new, reactivated or changed) grants the
/// plan's upload credits for the cycle.
pub async fn upsert_subscription(
    State(state): State<Arc<AppState>>,
    _role: ServiceRole,
    Json(req): Json<UpsertSubscriptionRequest>,
) -> ApiResult<Json<SubscriptionResponse>> {
    let subscription = Subscription {
        user_id: req.user_id,
        plan: req.plan,
        billing_cycle: req.billing_cycle,
        status: req.status,
        current_period_end: req.current_period_end,
    };

    let previous = state.db.get_subscription(&subscription.user_id)?;
    let activating = subscription.status.grants_access()
        && previous
            .as_ref()
            .map_or(true, |p| !p.status.grants_access() || p.plan != subscription.plan);

    state.db.upsert_subscription(&subscription, Utc::now())?;

    let credits_granted = if activating {
        plan(subscription.plan).upload_credits_per_cycle
    } else {
        0
    };
    let credits = if credits_granted > 0 {
        let account = state.db.grant_credits(&subscription.user_id, credits_granted)?;
        state.events.publish(GameEvent::CreditsChanged {
            user_id: account.user_id.clone(),
            balance: account.balance,
        });
        account
    } else {
        state.db.credit_account(&subscription.user_id)?
    };

    tracing::info!(
        user_id = %subscription.user_id,
        plan = %subscription.plan,
        status = subscription.status.as_str(),
        credits_granted,
        "Subscription updated"
    );

    Ok(Json(SubscriptionResponse {
        subscription,
        credits_granted,
        credits,
    }))
}

/// GET /api/v1/jobs
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    _role: ServiceRole,
) -> Json<JobListResponse> {
    Json(JobListResponse {
        jobs: state.scheduler.get_status().await,
    })
}

/// POST /api/v1/jobs/:name/run
pub async fn run_job(
    State(state): State<Arc<AppState>>,
    _role: ServiceRole,
    Path(name): Path<String>,
) -> ApiResult<Json<JobOutcome>> {
    Ok(Json(state.scheduler.trigger(&name).await?))
}
