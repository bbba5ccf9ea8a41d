use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;

use crate::{
    app_error::{AppError, AppResult},
    infra::http_client::build_client,
};

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
    api_base: String,
}

/// Parameters for a subscription-mode checkout session.
pub struct CheckoutSessionParams<'a> {
    pub customer_id: &'a str,
    /// Existing recurring price; when absent an inline monthly price is sent.
    pub price_id: Option<&'a str>,
    pub unit_amount: i64,
    pub currency: &'a str,
    pub product_name: &'a str,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
    pub client_reference_id: &'a str,
    pub metadata: &'a [(&'a str, String)],
}

impl StripeClient {
    pub fn new(secret_key: SecretString, api_base: impl Into<String>) -> AppResult<Self> {
        let client = build_client().map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(Self {
            client,
            secret_key,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.secret_key.expose_secret()));
        format!("Basic {}", encoded)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    // ========================================================================
    // Customers
    // ========================================================================

    pub async fn create_customer(
        &self,
        email: &str,
        metadata: &[(&str, String)],
    ) -> AppResult<StripeCustomer> {
        let mut params: Vec<(String, String)> = vec![("email".to_string(), email.to_string())];
        for (key, value) in metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }

        let response = self
            .client
            .post(self.url("customers"))
            .header("Authorization", self.auth_header())
            .form(&params)
            .send()
            .await
            .map_err(request_failed)?;

        self.handle_response(response).await
    }

    pub async fn get_or_create_customer(
        &self,
        email: &str,
        metadata: &[(&str, String)],
    ) -> AppResult<StripeCustomer> {
        let response = self
            .client
            .get(self.url("customers"))
            .header("Authorization", self.auth_header())
            .query(&[("email", email), ("limit", "1")])
            .send()
            .await
            .map_err(request_failed)?;

        let list: StripeCustomerList = self.handle_response(response).await?;
        if let Some(customer) = list.data.into_iter().next() {
            return Ok(customer);
        }

        self.create_customer(email, metadata).await
    }

    // ========================================================================
    // Checkout Sessions
    // ========================================================================

    pub async fn create_checkout_session(
        &self,
        session: &CheckoutSessionParams<'_>,
    ) -> AppResult<StripeCheckoutSession> {
        let mut params: Vec<(String, String)> = vec![
            ("customer".to_string(), session.customer_id.to_string()),
            ("mode".to_string(), "subscription".to_string()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("success_url".to_string(), session.success_url.to_string()),
            ("cancel_url".to_string(), session.cancel_url.to_string()),
            (
                "client_reference_id".to_string(),
                session.client_reference_id.to_string(),
            ),
        ];

        match session.price_id {
            Some(price_id) => {
                params.push(("line_items[0][price]".to_string(), price_id.to_string()));
            }
            None => {
                let prefix = "line_items[0][price_data]";
                params.extend([
                    (format!("{prefix}[currency]"), session.currency.to_lowercase()),
                    (format!("{prefix}[unit_amount]"), session.unit_amount.to_string()),
                    (
                        format!("{prefix}[product_data][name]"),
                        session.product_name.to_string(),
                    ),
                    (format!("{prefix}[recurring][interval]"), "month".to_string()),
                ]);
            }
        }

        // Metadata goes on the session and on the subscription it creates,
        // so invoice and cancellation events can be attributed later.
        for (key, value) in session.metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
            params.push((format!("subscription_data[metadata][{}]", key), value.clone()));
        }

        let response = self
            .client
            .post(self.url("checkout/sessions"))
            .header("Authorization", self.auth_header())
            .form(&params)
            .send()
            .await
            .map_err(request_failed)?;

        self.handle_response(response).await
    }

    pub async fn get_checkout_session(&self, session_id: &str) -> AppResult<StripeCheckoutSession> {
        let response = self
            .client
            .get(self.url(&format!("checkout/sessions/{}", session_id)))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(request_failed)?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub async fn get_subscription(&self, subscription_id: &str) -> AppResult<StripeSubscription> {
        let response = self
            .client
            .get(self.url(&format!("subscriptions/{}", subscription_id)))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(request_failed)?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::ProviderUnavailable(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let message = serde_json::from_str::<StripeErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error.message.or(Some(e.error.error_type)))
                .unwrap_or_default();
            tracing::error!(status = %status, message = %message, "Stripe API error");
            return Err(map_status(status, message));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Stripe response");
            AppError::Internal(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

fn request_failed(e: reqwest::Error) -> AppError {
    tracing::error!(error = %e, "Stripe request failed");
    AppError::ProviderUnavailable(format!("Stripe request failed: {}", e))
}

fn map_status(status: StatusCode, message: String) -> AppError {
    if status == StatusCode::NOT_FOUND {
        AppError::NotFound
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        AppError::ProviderUnavailable(format!("Stripe returned {}", status))
    } else {
        AppError::Internal(format!("Stripe rejected request ({}): {}", status, message))
    }
}

// ============================================================================
// Stripe Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StripeCustomer {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeCustomerList {
    pub data: Vec<StripeCustomer>,
}

#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    pub client_reference_id: Option<String>,
    /// `open`, `complete` or `expired`
    pub status: Option<String>,
    /// `paid`, `unpaid` or `no_payment_required`
    pub payment_status: Option<String>,
    pub amount_total: Option<i64>,
    pub created: i64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl StripeCheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.status.as_deref() == Some("complete")
            && matches!(
                self.payment_status.as_deref(),
                Some("paid") | Some("no_payment_required")
            )
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub customer: String,
    pub status: String,
    pub canceled_at: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeSubscriptionDetails {
    /// Set on newer API versions, where the invoice links its subscription here
    pub subscription: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeInvoiceParent {
    pub subscription_details: Option<StripeSubscriptionDetails>,
}

#[derive(Debug, Deserialize)]
pub struct StripeInvoice {
    pub id: String,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    /// `subscription_create`, `subscription_cycle`, ...
    pub billing_reason: Option<String>,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub amount_due: i64,
    pub subscription_details: Option<StripeSubscriptionDetails>,
    pub parent: Option<StripeInvoiceParent>,
    pub created: i64,
}

impl StripeInvoice {
    fn details(&self) -> Option<&StripeSubscriptionDetails> {
        self.subscription_details.as_ref().or_else(|| {
            self.parent
                .as_ref()
                .and_then(|p| p.subscription_details.as_ref())
        })
    }

    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription
            .as_deref()
            .or_else(|| self.details().and_then(|d| d.subscription.as_deref()))
    }

    pub fn subscription_metadata(&self) -> Option<&HashMap<String, String>> {
        self.details().map(|d| &d.metadata)
    }
}

#[derive(Debug, Deserialize)]
pub struct StripeErrorResponse {
    pub error: StripeError,
}

#[derive(Debug, Deserialize)]
pub struct StripeError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: Option<String>,
    pub code: Option<String>,
}

// ============================================================================
// Webhook Event Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub created: i64,
    pub data: StripeWebhookEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeWebhookEventData {
    pub object: serde_json::Value,
}

impl StripeWebhookEvent {
    pub fn get_checkout_session(&self) -> Option<StripeCheckoutSession> {
        serde_json::from_value(self.data.object.clone()).ok()
    }

    pub fn get_subscription(&self) -> Option<StripeSubscription> {
        serde_json::from_value(self.data.object.clone()).ok()
    }

    pub fn get_invoice(&self) -> Option<StripeInvoice> {
        serde_json::from_value(self.data.object.clone()).ok()
    }
}
