//! Dashboard layout and notification routes
//!
//! - GET /api/v1/layout - Saved layout or the default
//! - PUT /api/v1/layout - Replace the layout
//! - GET /api/v1/notifications - Own notifications, unread first
//! - POST /api/v1/notifications/:id/read - Mark one read

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::dto::{LayoutBody, LimitQuery};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::layout::{load_layout, save_layout};
use crate::storage::Notification;

/// GET /api/v1/layout
pub async fn get_layout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<LayoutBody>> {
    Ok(Json(LayoutBody {
        widgets: load_layout(&state.db, &user.user_id)?,
    }))
}

/// PUT /api/v1/layout
pub async fn put_layout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(body): Json<LayoutBody>,
) -> ApiResult<Json<LayoutBody>> {
    save_layout(&state.db, &user.user_id, &body.widgets)?;
    Ok(Json(body))
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<Notification>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    Ok(Json(state.db.list_notifications(&user.user_id, limit)?))
}

/// POST /api/v1/notifications/:id/read
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .db
        .mark_notification_read(&user.user_id, &id, Utc::now())?;
    Ok(StatusCode::NO_CONTENT)
}
