//! Request authentication
//!
//! Players authenticate with `Authorization: Bearer <token>` issued by the
//! admin endpoint or CLI. Administrative routes require the configured
//! service-role key in the same header.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::entitlements::{Entitlements, Feature};
use crate::storage::hash_token;

/// The authenticated player
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

/// Caller presented the service-role key
#[derive(Debug, Clone, Copy)]
pub struct ServiceRole;

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Resolve a raw token to its user
pub fn authenticate(state: &AppState, token: &str) -> Result<AuthUser, ApiError> {
    let user_id = state
        .db
        .user_for_token(token)?
        .ok_or_else(|| ApiError::Unauthorized("invalid token".to_string()))?;
    Ok(AuthUser { user_id })
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;
        authenticate(state, token)
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ServiceRole {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let expected = state
            .config
            .secrets
            .service_role_key
            .as_deref()
            .ok_or_else(|| ApiError::ServiceUnavailable("service role key not configured".to_string()))?;
        let presented = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Unauthorized("missing service role key".to_string()))?;

        // Compare digests so the comparison time does not depend on the key
        if hash_token(presented) != hash_token(expected) {
            return Err(ApiError::Unauthorized("invalid service role key".to_string()));
        }
        Ok(ServiceRole)
    }
}

impl AuthUser {
    pub async fn entitlements(&self, state: &AppState) -> Result<Entitlements, ApiError> {
        Ok(state.entitlements.resolve(&self.user_id).await?)
    }

    /// Fail with 403 unless the user's plan includes `feature`
    pub async fn require(&self, state: &AppState, feature: Feature) -> Result<Entitlements, ApiError> {
        let entitlements = self.entitlements(state).await?;
        if !entitlements.allows(feature) {
            return Err(ApiError::Forbidden(format!(
                "{} requires the {} plan",
                feature.as_str(),
                feature.required_tier().as_str()
            )));
        }
        Ok(entitlements)
    }
}
