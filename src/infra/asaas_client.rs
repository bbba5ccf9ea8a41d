use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::{
    app_error::{AppError, AppResult},
    infra::http_client::build_client,
};

/// Payment statuses that mean the money arrived.
pub const PAID_STATUSES: [&str; 3] = ["RECEIVED", "CONFIRMED", "RECEIVED_IN_CASH"];

#[derive(Clone)]
pub struct AsaasClient {
    client: Client,
    api_key: SecretString,
    api_base: String,
}

impl AsaasClient {
    pub fn new(api_key: SecretString, api_base: impl Into<String>) -> AppResult<Self> {
        let client = build_client().map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(Self {
            client,
            api_key,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(self.url(path))
            .header("access_token", self.api_key.expose_secret())
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.url(path))
            .header("access_token", self.api_key.expose_secret())
    }

    pub async fn create_customer(&self, customer: &NewAsaasCustomer<'_>) -> AppResult<AsaasCustomer> {
        let response = self
            .post("customers")
            .json(customer)
            .send()
            .await
            .map_err(request_failed)?;

        self.handle_response(response).await
    }

    pub async fn create_subscription(
        &self,
        subscription: &NewAsaasSubscription<'_>,
    ) -> AppResult<AsaasSubscription> {
        let response = self
            .post("subscriptions")
            .json(subscription)
            .send()
            .await
            .map_err(request_failed)?;

        self.handle_response(response).await
    }

    pub async fn get_subscription(&self, subscription_id: &str) -> AppResult<AsaasSubscription> {
        let response = self
            .get(&format!("subscriptions/{}", subscription_id))
            .send()
            .await
            .map_err(request_failed)?;

        let subscription: AsaasSubscription = self.handle_response(response).await?;
        // Asaas answers 200 with `deleted: true` for removed subscriptions.
        if subscription.deleted {
            return Err(AppError::NotFound);
        }
        Ok(subscription)
    }

    pub async fn list_subscription_payments(
        &self,
        subscription_id: &str,
    ) -> AppResult<Vec<AsaasPayment>> {
        let response = self
            .get(&format!("subscriptions/{}/payments", subscription_id))
            .send()
            .await
            .map_err(request_failed)?;

        let list: AsaasList<AsaasPayment> = self.handle_response(response).await?;
        Ok(list.data)
    }

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
            let errors = serde_json::from_str::<AsaasErrorResponse>(&body)
                .map(|e| e.errors)
                .unwrap_or_default();
            tracing::error!(status = %status, errors = ?errors, "Asaas API error");
            return Err(map_error(status, &errors));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, "Failed to parse Asaas response");
            AppError::Internal(format!("Failed to parse Asaas response: {}", e))
        })
    }
}

fn request_failed(e: reqwest::Error) -> AppError {
    tracing::error!(error = %e, "Asaas request failed");
    AppError::ProviderUnavailable(format!("Asaas request failed: {}", e))
}

fn map_error(status: StatusCode, errors: &[AsaasError]) -> AppError {
    match status {
        StatusCode::NOT_FOUND => AppError::NotFound,
        StatusCode::BAD_REQUEST => match errors.first() {
            Some(error) => AppError::InvalidCustomerData(customer_field(&error.code).to_string()),
            None => AppError::Internal("Asaas rejected request".into()),
        },
        s if s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS => {
            AppError::ProviderUnavailable(format!("Asaas returned {}", s))
        }
        s => AppError::Internal(format!("Asaas returned {}", s)),
    }
}

/// Maps an Asaas validation code (`invalid_cpfCnpj`, `invalid_mobilePhone`, ...)
/// to the checkout form field it concerns.
fn customer_field(code: &str) -> &'static str {
    let code = code.to_ascii_lowercase();
    if code.contains("cpfcnpj") {
        "tax_id"
    } else if code.contains("phone") {
        "phone"
    } else if code.contains("name") {
        "name"
    } else {
        "customer"
    }
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAsaasCustomer<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub cpf_cnpj: &'a str,
    pub mobile_phone: &'a str,
    pub external_reference: String,
    pub notification_disabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAsaasSubscription<'a> {
    pub customer: &'a str,
    pub billing_type: &'a str,
    pub value: f64,
    pub next_due_date: NaiveDate,
    pub cycle: &'a str,
    pub description: String,
    pub external_reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_payments: Option<u32>,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AsaasCustomer {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsaasSubscription {
    pub id: String,
    pub customer: Option<String>,
    /// `ACTIVE`, `INACTIVE` or `EXPIRED`
    pub status: Option<String>,
    pub next_due_date: Option<NaiveDate>,
    pub external_reference: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsaasPayment {
    pub id: String,
    pub customer: Option<String>,
    pub subscription: Option<String>,
    pub status: String,
    #[serde(default)]
    pub value: f64,
    pub invoice_url: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub confirmed_date: Option<NaiveDate>,
    pub external_reference: Option<String>,
}

impl AsaasPayment {
    pub fn is_paid(&self) -> bool {
        PAID_STATUSES.contains(&self.status.as_str())
    }

    pub fn value_cents(&self) -> i64 {
        (self.value * 100.0).round() as i64
    }
}

#[derive(Debug, Deserialize)]
pub struct AsaasList<T> {
    pub data: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AsaasErrorResponse {
    pub errors: Vec<AsaasError>,
}

#[derive(Debug, Deserialize)]
pub struct AsaasError {
    pub code: String,
    pub description: Option<String>,
}

// ============================================================================
// Webhook Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsaasWebhookEvent {
    pub id: Option<String>,
    pub event: String,
    /// Local Brasília time, `YYYY-MM-DD HH:MM:SS`
    pub date_created: Option<String>,
    pub payment: Option<AsaasPayment>,
    pub subscription: Option<AsaasSubscription>,
}
