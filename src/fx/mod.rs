//! Exchange rates
//!
//! - **provider**: [`RateProvider`] trait and the HTTP implementation
//! - **cache**: [`RateCache`], fresh/stale windows in front of a provider

pub mod cache;
pub mod provider;

use thiserror::Error;

pub use cache::{RateCache, RateQuote};
pub use provider::{HttpRateProvider, RateProvider};

/// Exchange-rate errors
#[derive(Debug, Error)]
pub enum FxError {
    #[error("Rate provider unavailable")]
    Unavailable,

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Invalid currency code '{0}'")]
    InvalidCurrency(String),

    #[error("No rate for {from}/{to}")]
    MissingRate { from: String, to: String },
}

/// Upper-case and check a currency code (3-5 ASCII letters or digits)
pub fn normalize_currency(code: &str) -> Result<String, FxError> {
    let code = code.trim().to_uppercase();
    if (3..=5).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphanumeric()) {
        Ok(code)
    } else {
        Err(FxError::InvalidCurrency(code))
    }
}
