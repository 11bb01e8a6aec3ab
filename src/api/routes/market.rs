//! Pricing, exchange-rate and checkout routes
//!
//! - GET /api/v1/pricing - Plan catalogue with annual savings
//! - GET /api/v1/fx - Currency conversion from the rate cache
//! - GET /api/v1/checkout/sessions/:id - Checkout session lookup

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::dto::{FxQuery, FxResponse, PlanResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::payments::{validate_session_id, CheckoutSession, PaymentError};
use crate::pricing::{get_savings, plans, savings_percent};

/// GET /api/v1/pricing
pub async fn pricing() -> Json<Vec<PlanResponse>> {
    Json(
        plans()
            .iter()
            .map(|plan| PlanResponse {
                plan,
                annual_savings: get_savings(plan),
                savings_percent: savings_percent(plan),
            })
            .collect(),
    )
}

/// GET /api/v1/fx?from=USD&to=EUR&amount=100
pub async fn convert(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FxQuery>,
) -> ApiResult<Json<FxResponse>> {
    if !query.amount.is_finite() {
        return Err(ApiError::Validation("amount must be a finite number".to_string()));
    }

    let (converted, quote) = state.rates.convert(query.amount, &query.from, &query.to).await?;

    Ok(Json(FxResponse {
        from: quote.from,
        to: quote.to,
        amount: query.amount,
        converted,
        rate: quote.rate,
        fetched_at: quote.fetched_at,
        stale: quote.stale,
    }))
}

/// GET /api/v1/checkout/sessions/:id
pub async fn checkout_session(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<CheckoutSession>> {
    let gateway = state.payments.as_ref().ok_or(PaymentError::NotConfigured)?;
    validate_session_id(&id)?;
    Ok(Json(gateway.retrieve_checkout_session(&id).await?))
}
