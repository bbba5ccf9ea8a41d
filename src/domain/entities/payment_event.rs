use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::payment_provider::PaymentProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventKind {
    CheckoutCompleted,
    PaymentSucceeded,
    PaymentFailed,
    SubscriptionCanceled,
    /// Provider event with no bearing on entitlement.
    Ignored,
}

impl PaymentEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentEventKind::CheckoutCompleted => "checkout_completed",
            PaymentEventKind::PaymentSucceeded => "payment_succeeded",
            PaymentEventKind::PaymentFailed => "payment_failed",
            PaymentEventKind::SubscriptionCanceled => "subscription_canceled",
            PaymentEventKind::Ignored => "ignored",
        }
    }
}

/// Provider-neutral view of a billing event.
///
/// Both webhook deliveries and redirect-time verification produce this shape,
/// and the reconciler is the only consumer.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedPaymentEvent {
    pub kind: PaymentEventKind,
    pub provider: PaymentProvider,
    pub user_id: Option<Uuid>,
    pub plan_id: Option<Uuid>,
    pub plan_name: Option<String>,
    pub amount_cents: Option<i64>,
    pub external_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
    /// Next due date when the provider reports one
    pub period_end: Option<DateTime<Utc>>,
    /// When the provider says the event happened
    pub occurred_at: DateTime<Utc>,
    /// Stable reference used for deduplication
    pub provider_ref: String,
    /// Raw provider event type, kept for logs
    pub raw_type: String,
}

impl NormalizedPaymentEvent {
    pub fn new(
        kind: PaymentEventKind,
        provider: PaymentProvider,
        user_id: Option<Uuid>,
        provider_ref: impl Into<String>,
        occurred_at: DateTime<Utc>,
        raw_type: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            provider,
            user_id,
            plan_id: None,
            plan_name: None,
            amount_cents: None,
            external_customer_id: None,
            external_subscription_id: None,
            period_end: None,
            occurred_at,
            provider_ref: provider_ref.into(),
            raw_type: raw_type.into(),
        }
    }

    pub fn ignored(
        provider: PaymentProvider,
        provider_ref: impl Into<String>,
        occurred_at: DateTime<Utc>,
        raw_type: impl Into<String>,
    ) -> Self {
        Self::new(
            PaymentEventKind::Ignored,
            provider,
            None,
            provider_ref,
            occurred_at,
            raw_type,
        )
    }

    /// An event can only change state when it is relevant and attributable.
    pub fn is_actionable(&self) -> bool {
        self.kind != PaymentEventKind::Ignored && self.user_id.is_some()
    }
}
