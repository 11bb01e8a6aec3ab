//! Trade Routes
//!
//! - POST /api/v1/trades - Log one trade (costs one credit)
//! - POST /api/v1/trades/batch - Credit-gated batch upload
//! - POST /api/v1/trades/import - CSV import (Pro)
//! - GET /api/v1/trades - List own trades
//! - GET /api/v1/trades/:id - Get a trade
//! - PATCH /api/v1/trades/:id - Update notes
//! - DELETE /api/v1/trades/:id - Delete a trade

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::dto::{
    BatchUploadRequest, BatchUploadResponse, CreateTradeResponse, CsvImportResponse,
    UpdateTradeRequest,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::credits::{upload_in_chunks, BatchUploadReport};
use crate::entitlements::Feature;
use crate::events::GameEvent;
use crate::storage::{ChallengeKind, NewTrade, Trade, TradeFilter};
use crate::trades::{validate_notes, TradeCsvImporter};

/// Largest batch accepted in one request
pub const MAX_BATCH_SIZE: usize = 500;

const MAX_LIST_LIMIT: usize = 500;

/// 201 when everything was inserted, 207 for a mix, 402 when nothing was
/// inserted because credits ran out, 400 when every trade was invalid
pub fn batch_status(report: &BatchUploadReport) -> StatusCode {
    if report.failed.is_empty() {
        StatusCode::CREATED
    } else if !report.inserted.is_empty() {
        StatusCode::MULTI_STATUS
    } else if report.ran_out_of_credits() {
        StatusCode::PAYMENT_REQUIRED
    } else {
        StatusCode::BAD_REQUEST
    }
}

/// Run trades through the credit gate and reward the inserted ones.
///
/// Credits are spent and trades stored before rewards are computed, so a
/// reward failure is logged and the report still returned.
fn upload_and_reward(
    state: &AppState,
    user_id: &str,
    trades: &[NewTrade],
) -> ApiResult<(StatusCode, BatchUploadResponse)> {
    if trades.is_empty() {
        return Err(ApiError::Validation("no trades submitted".to_string()));
    }

    let now = Utc::now();
    let report = upload_in_chunks(&state.db, user_id, trades, MAX_BATCH_SIZE, now)?;

    let rewards = if report.inserted.is_empty() {
        None
    } else {
        state.events.publish(GameEvent::CreditsChanged {
            user_id: user_id.to_string(),
            balance: report.remaining_credits,
        });
        match state.gamification.on_trades_logged(user_id, &report.inserted, now) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    inserted = report.inserted.len(),
                    error = %e,
                    "Trades stored but rewards failed"
                );
                None
            }
        }
    };

    tracing::info!(
        user_id = %user_id,
        inserted = report.inserted.len(),
        failed = report.failed.len(),
        skipped = report.skipped,
        "Trade upload processed"
    );

    Ok((batch_status(&report), BatchUploadResponse { report, rewards }))
}

/// POST /api/v1/trades/batch
pub async fn upload_trades(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<BatchUploadRequest>,
) -> ApiResult<(StatusCode, Json<BatchUploadResponse>)> {
    if req.trades.len() > MAX_BATCH_SIZE {
        return Err(ApiError::Validation(format!(
            "batch of {} trades exceeds the limit of {}",
            req.trades.len(),
            MAX_BATCH_SIZE
        )));
    }
    let (status, body) = upload_and_reward(&state, &user.user_id, &req.trades)?;
    Ok((status, Json(body)))
}

/// POST /api/v1/trades
///
/// Single trade; failures are errors rather than a report.
pub async fn create_trade(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(trade): Json<NewTrade>,
) -> ApiResult<(StatusCode, Json<CreateTradeResponse>)> {
    let (_, body) = upload_and_reward(&state, &user.user_id, std::slice::from_ref(&trade))?;
    let BatchUploadResponse { report, rewards } = body;

    if let Some(failure) = report.failed.first() {
        return Err(if report.ran_out_of_credits() {
            ApiError::PaymentRequired("no upload credits left".to_string())
        } else {
            ApiError::Validation(failure.error.clone())
        });
    }

    let trade = report
        .inserted
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Internal("trade was neither inserted nor rejected".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTradeResponse {
            trade,
            remaining_credits: report.remaining_credits,
            rewards,
        }),
    ))
}

/// POST /api/v1/trades/import
///
/// Body is the raw CSV file. Parsed rows go through the batch upload in
/// chunks of [`MAX_BATCH_SIZE`].
pub async fn import_csv(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    body: String,
) -> ApiResult<(StatusCode, Json<CsvImportResponse>)> {
    user.require(&state, Feature::CsvImport).await?;

    let import = TradeCsvImporter::new().import_str(&body)?;
    if import.trades.is_empty() {
        let detail = import
            .errors
            .first()
            .cloned()
            .unwrap_or_else(|| "file contains no trades".to_string());
        return Err(ApiError::Validation(detail));
    }

    let (status, upload) = upload_and_reward(&state, &user.user_id, &import.trades)?;
    Ok((status, Json(CsvImportResponse { import, upload })))
}

/// GET /api/v1/trades
pub async fn list_trades(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(mut filter): Query<TradeFilter>,
) -> ApiResult<Json<Vec<Trade>>> {
    filter.symbol = filter.symbol.map(|s| s.trim().to_uppercase());
    filter.limit = Some(filter.limit.unwrap_or(100).clamp(1, MAX_LIST_LIMIT));
    Ok(Json(state.db.list_trades(&user.user_id, &filter)?))
}

/// GET /api/v1/trades/:id
pub async fn get_trade(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Trade>> {
    Ok(Json(state.db.get_trade(&user.user_id, &id)?))
}

/// PATCH /api/v1/trades/:id
///
/// Adding notes to a trade that had none counts toward the notes challenge.
pub async fn update_trade(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateTradeRequest>,
) -> ApiResult<Json<Trade>> {
    let notes = validate_notes(req.notes.as_deref())?;
    let before = state.db.get_trade(&user.user_id, &id)?;
    let updated = state
        .db
        .update_trade_notes(&user.user_id, &id, notes.as_deref())?;

    if before.notes.is_none() && updated.notes.is_some() {
        if let Err(e) = state
            .gamification
            .advance_kind(&user.user_id, ChallengeKind::AddNotes, 1, Utc::now())
        {
            tracing::warn!(user_id = %user.user_id, error = %e, "Failed to advance notes challenge");
        }
    }

    Ok(Json(updated))
}

/// DELETE /api/v1/trades/:id
///
/// Spent credits are not refunded.
pub async fn delete_trade(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.db.delete_trade(&user.user_id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
