//! Payment gateway
//!
//! Checkout sessions are created by the payment provider's hosted page; the
//! backend only looks them up to show receipts.

pub mod stripe;

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Payment provider not configured")]
    NotConfigured,

    #[error("Invalid checkout session id '{0}'")]
    InvalidSessionId(String),

    #[error("Checkout session not found: {0}")]
    NotFound(String),

    #[error("Payment provider unavailable")]
    Unavailable,

    #[error("Request timeout")]
    Timeout,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LineItem {
    pub description: Option<String>,
    pub quantity: Option<u64>,
    pub amount_total: Option<i64>,
    pub price_id: Option<String>,
}

/// Checkout session as surfaced to clients
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CheckoutSession {
    pub id: String,
    /// Minor currency units
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub payment_status: String,
    pub line_items: Vec<LineItem>,
    pub metadata: HashMap<String, String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError>;
}

/// Checkout session ids are opaque but always carry the `cs_` prefix
pub fn validate_session_id(session_id: &str) -> Result<(), PaymentError> {
    let valid = session_id.starts_with("cs_")
        && session_id.len() > 3
        && session_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PaymentError::InvalidSessionId(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_session_id() {
        assert!(validate_session_id("cs_test_a1B2c3").is_ok());
        assert!(validate_session_id("cs_").is_err());
        assert!(validate_session_id("pi_123").is_err());
        assert!(validate_session_id("cs_../../v1/customers").is_err());
    }
}
