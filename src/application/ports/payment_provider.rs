use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    app_error::AppResult,
    domain::entities::{
        payment_event::NormalizedPaymentEvent, payment_method::PaymentMethod,
        payment_provider::PaymentProvider, plan::Plan,
    },
};

// ============================================================================
// Port Types - Provider-agnostic domain types
// ============================================================================

/// Unique identifier for a customer in a payment provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a subscription in a payment provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Billing data required by boleto/PIX providers
#[derive(Debug, Clone, Deserialize)]
pub struct CustomerData {
    pub name: String,
    /// CPF or CNPJ, digits only after validation
    pub tax_id: String,
    /// Area code + number, digits only after validation
    pub phone: String,
}

/// URLs for checkout redirects
#[derive(Debug, Clone)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub user_id: Uuid,
    pub email: String,
    pub plan: Plan,
    pub method: PaymentMethod,
    pub customer: Option<CustomerData>,
    pub urls: CheckoutUrls,
}

/// Result of starting a checkout
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResult {
    /// URL to redirect the user to (hosted checkout page or invoice)
    pub redirect_url: Option<String>,
    /// Client secret for embedded card forms
    pub client_secret: Option<String>,
    /// Reference the success page passes back for verification
    pub session_ref: String,
}

// ============================================================================
// Payment Provider Port
// ============================================================================

/// Port for payment provider operations.
///
/// Implementations translate between the provider's API and the
/// provider-neutral [`NormalizedPaymentEvent`].
#[async_trait]
pub trait PaymentProviderPort: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    async fn initiate_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutResult>;

    /// Confirms with the provider that a checkout actually completed.
    ///
    /// # Errors
    /// - `SessionNotFound` if the provider does not know the reference
    /// - `SessionIncomplete` if the session exists but is unpaid
    async fn verify_completed_session(&self, session_ref: &str)
    -> AppResult<NormalizedPaymentEvent>;

    /// Authenticates and normalizes a webhook delivery.
    ///
    /// # Errors
    /// - `InvalidSignature` when the body does not authenticate
    async fn parse_webhook(
        &self,
        raw_body: &[u8],
        signature: &str,
    ) -> AppResult<NormalizedPaymentEvent>;
}
