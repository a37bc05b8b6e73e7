//! HTTP client for the hosted-checkout payment gateway (Chapa-style API).
//!
//! `initialize` asks the gateway for a checkout link for a transaction
//! reference, `verify` reports the settled state of that reference.

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{config::PaymentConfig, db_access::Retryable, error::AppError};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("payment gateway is not configured")]
    NotConfigured,

    #[error("Parse error: {0}")]
    Parse(String),
}

impl Retryable for GatewayError {
    fn is_transient(&self) -> bool {
        match self {
            GatewayError::Http(err) => err.is_transient(),
            GatewayError::Api { status, .. } => *status >= 500,
            GatewayError::NotConfigured | GatewayError::Parse(_) => false,
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::NotConfigured => {
                AppError::BadRequest("Online payments are not configured".into())
            }
            other => AppError::Gateway(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifiedStatus {
    Success,
    Pending,
    Failed,
}

impl VerifiedStatus {
    pub fn from_gateway(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "success" | "successful" | "completed" => VerifiedStatus::Success,
            "pending" => VerifiedStatus::Pending,
            _ => VerifiedStatus::Failed,
        }
    }
}

#[derive(Debug, Serialize)]
struct InitializeBody<'a> {
    amount: String,
    currency: &'a str,
    email: &'a str,
    first_name: &'a str,
    tx_ref: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: String,
    #[serde(default)]
    message: serde_json::Value,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct CheckoutData {
    checkout_url: String,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
}

#[derive(Clone)]
pub struct PaymentGateway {
    client: reqwest::Client,
    base_url: String,
    configured: bool,
    callback_url: Option<String>,
    currency: String,
}

impl PaymentGateway {
    pub fn new(config: &PaymentConfig) -> Result<Self, GatewayError> {
        let mut headers = HeaderMap::new();
        if let Some(secret) = &config.secret_key {
            let value = HeaderValue::from_str(&format!("Bearer {secret}"))
                .map_err(|e| GatewayError::Parse(format!("Invalid secret key format: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
            configured: config.secret_key.is_some(),
            callback_url: config.callback_url.clone(),
            currency: config.currency.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Returns the hosted checkout URL for the transaction.
    pub async fn initialize(
        &self,
        amount: i64,
        email: &str,
        first_name: &str,
        tx_ref: &str,
    ) -> Result<String, GatewayError> {
        if !self.configured {
            return Err(GatewayError::NotConfigured);
        }
        let body = InitializeBody {
            amount: format_amount(amount),
            currency: &self.currency,
            email,
            first_name,
            tx_ref,
            callback_url: self.callback_url.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/transaction/initialize", self.base_url))
            .json(&body)
            .send()
            .await?;
        let envelope: Envelope<CheckoutData> = read_envelope(response).await?;
        envelope
            .data
            .map(|d| d.checkout_url)
            .ok_or_else(|| GatewayError::Parse("missing checkout_url".into()))
    }

    pub async fn verify(&self, tx_ref: &str) -> Result<VerifiedStatus, GatewayError> {
        if !self.configured {
            return Err(GatewayError::NotConfigured);
        }
        let response = self
            .client
            .get(format!("{}/transaction/verify/{}", self.base_url, tx_ref))
            .send()
            .await?;
        let envelope: Envelope<VerifyData> = read_envelope(response).await?;
        let status = envelope
            .data
            .map(|d| d.status)
            .unwrap_or(envelope.status);
        Ok(VerifiedStatus::from_gateway(&status))
    }
}

async fn read_envelope<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<Envelope<T>, GatewayError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(GatewayError::Api {
            status: status.as_u16(),
            message: text,
        });
    }

    let envelope: Envelope<T> =
        serde_json::from_str(&text).map_err(|e| GatewayError::Parse(e.to_string()))?;
    if !envelope.status.eq_ignore_ascii_case("success") && envelope.data.is_none() {
        return Err(GatewayError::Api {
            status: status.as_u16(),
            message: envelope.message.to_string(),
        });
    }
    Ok(envelope)
}

/// Renders minor units as a decimal string, e.g. `123450` -> `"1234.50"`.
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{sign}{}.{:02}", abs / 100, abs % 100)
}

/// Unique transaction reference for an order's payment attempt.
pub fn build_tx_ref(order_id: Uuid) -> String {
    let order = order_id.simple().to_string();
    let nonce = Uuid::new_v4().simple().to_string();
    format!("bridal-{}-{}", &order[..8], &nonce[..12])
}
