//! Stripe checkout session lookup

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{validate_session_id, CheckoutSession, LineItem, PaymentError, PaymentGateway};

pub struct StripeGateway {
    client: Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeSession {
    id: String,
    amount_total: Option<i64>,
    currency: Option<String>,
    customer_details: Option<StripeCustomer>,
    #[serde(default)]
    payment_status: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
    line_items: Option<StripeList<StripeLineItem>>,
}

#[derive(Debug, Deserialize)]
struct StripeCustomer {
    email: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeList<T> {
    data: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StripeLineItem {
    description: Option<String>,
    quantity: Option<u64>,
    amount_total: Option<i64>,
    price: Option<StripePrice>,
}

#[derive(Debug, Deserialize)]
struct StripePrice {
    id: String,
}

impl From<StripeSession> for CheckoutSession {
    fn from(s: StripeSession) -> Self {
        let (customer_email, customer_name) = s
            .customer_details
            .map(|c| (c.email, c.name))
            .unwrap_or((None, None));

        CheckoutSession {
            id: s.id,
            amount_total: s.amount_total,
            currency: s.currency,
            customer_email,
            customer_name,
            payment_status: s.payment_status,
            line_items: s
                .line_items
                .map(|list| list.data)
                .unwrap_or_default()
                .into_iter()
                .map(|item| LineItem {
                    description: item.description,
                    quantity: item.quantity,
                    amount_total: item.amount_total,
                    price_id: item.price.map(|p| p.id),
                })
                .collect(),
            metadata: s.metadata,
        }
    }
}

fn map_request_error(e: reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::Timeout
    } else if e.is_connect() {
        PaymentError::Unavailable
    } else {
        PaymentError::Request(e)
    }
}

impl StripeGateway {
    pub fn new(
        api_base: impl Into<String>,
        secret_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PaymentError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn retrieve_checkout_session(&self, session_id: &str) -> Result<CheckoutSession, PaymentError> {
        validate_session_id(session_id)?;
        let url = format!("{}/v1/checkout/sessions/{}", self.api_base, session_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .query(&[("expand[]", "line_items")])
            .send()
            .await
            .map_err(map_request_error)?;

        match response.status() {
            status if status.is_success() => {
                let session: StripeSession = response.json().await.map_err(PaymentError::Request)?;
                tracing::debug!(session_id = %session.id, status = %session.payment_status, "Retrieved checkout session");
                Ok(session.into())
            }
            StatusCode::NOT_FOUND => Err(PaymentError::NotFound(session_id.to_string())),
            status => {
                let text = response.text().await.unwrap_or_default();
                Err(PaymentError::ApiError {
                    status: status.as_u16(),
                    message: text,
                })
            }
        }
    }
}
