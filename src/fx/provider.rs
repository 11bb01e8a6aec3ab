//! Rate providers

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::FxError;

/// Source of spot exchange rates
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Units of `to` per one unit of `from`
    async fn fetch_rate(&self, from: &str, to: &str) -> Result<f64, FxError>;
}

/// Provider speaking the `/latest?base=X&symbols=Y` JSON API
pub struct HttpRateProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

fn map_request_error(e: reqwest::Error) -> FxError {
    if e.is_timeout() {
        FxError::Timeout
    } else if e.is_connect() {
        FxError::Unavailable
    } else {
        FxError::Request(e)
    }
}

impl HttpRateProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FxError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn fetch_rate(&self, from: &str, to: &str) -> Result<f64, FxError> {
        let url = format!("{}/latest", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[("base", from), ("symbols", to)])
            .send()
            .await
            .map_err(map_request_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(FxError::ApiError {
                status: status.as_u16(),
                message: text,
            });
        }

        let body: LatestResponse = response.json().await.map_err(FxError::Request)?;
        body.rates
            .get(to)
            .copied()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| FxError::MissingRate {
                from: from.to_string(),
                to: to.to_string(),
            })
    }
}
