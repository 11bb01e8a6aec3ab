//! Exchange Credential Routes (Elite)
//!
//! - GET /api/v1/credentials - List, keys masked
//! - POST /api/v1/credentials - Store an encrypted key pair
//! - DELETE /api/v1/credentials/:id - Remove
//!
//! Secrets are encrypted at rest and never returned.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::auth::AuthUser;
use crate::api::dto::{CreateCredentialRequest, CredentialResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::crypto::{mask_secret, CredentialCipher};
use crate::entitlements::Feature;
use crate::storage::ExchangeCredential;

const MAX_FIELD_LEN: usize = 512;

fn cipher(state: &AppState) -> ApiResult<&CredentialCipher> {
    state
        .cipher
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("credential encryption not configured".to_string()))
}

fn to_response(cipher: &CredentialCipher, credential: ExchangeCredential) -> CredentialResponse {
    let api_key_masked = match cipher.decrypt(&credential.api_key_ciphertext) {
        Ok(key) => mask_secret(&key),
        Err(e) => {
            tracing::warn!(credential_id = %credential.id, error = %e, "Could not decrypt stored API key");
            "********".to_string()
        }
    };

    CredentialResponse {
        id: credential.id,
        exchange: credential.exchange,
        label: credential.label,
        api_key_masked,
        created_at: credential.created_at,
    }
}

fn required(name: &str, value: &str) -> ApiResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::Validation(format!("{} is required", name)));
    }
    if value.len() > MAX_FIELD_LEN {
        return Err(ApiError::Validation(format!("{} is too long", name)));
    }
    Ok(value.to_string())
}

/// GET /api/v1/credentials
pub async fn list_credentials(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<CredentialResponse>>> {
    user.require(&state, Feature::ExchangeCredentials).await?;
    let cipher = cipher(&state)?;

    let credentials = state.db.list_credentials(&user.user_id)?;
    Ok(Json(
        credentials
            .into_iter()
            .map(|c| to_response(cipher, c))
            .collect(),
    ))
}

/// POST /api/v1/credentials
pub async fn create_credential(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateCredentialRequest>,
) -> ApiResult<(StatusCode, Json<CredentialResponse>)> {
    user.require(&state, Feature::ExchangeCredentials).await?;
    let cipher = cipher(&state)?;

    let exchange = required("exchange", &req.exchange)?.to_lowercase();
    if !exchange.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        return Err(ApiError::Validation(format!("invalid exchange name '{}'", exchange)));
    }
    let api_key = required("api_key", &req.api_key)?;
    let api_secret = required("api_secret", &req.api_secret)?;
    let label = req
        .label
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    let credential = state.db.insert_credential(
        &user.user_id,
        &exchange,
        label,
        cipher.encrypt(&api_key)?,
        cipher.encrypt(&api_secret)?,
        Utc::now(),
    )?;

    tracing::info!(user_id = %user.user_id, exchange = %exchange, "Stored exchange credential");
    Ok((StatusCode::CREATED, Json(to_response(cipher, credential))))
}

/// DELETE /api/v1/credentials/:id
pub async fn delete_credential(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    user.require(&state, Feature::ExchangeCredentials).await?;
    state.db.delete_credential(&user.user_id, &id)?;
    Ok(StatusCode::NO_CONTENT)
}
