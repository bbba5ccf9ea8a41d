use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_provider::{CheckoutRequest, CheckoutResult, PaymentProviderPort},
    domain::entities::{
        payment_event::{NormalizedPaymentEvent, PaymentEventKind},
        payment_provider::PaymentProvider,
    },
    infra::{
        stripe_client::{
            CheckoutSessionParams, StripeCheckoutSession, StripeClient, StripeInvoice,
            StripeSubscription, StripeWebhookEvent,
        },
        webhook_signature::{SIGNATURE_TOLERANCE_SECS, verify_signature_header},
    },
};

/// Adapter that wraps StripeClient to implement PaymentProviderPort.
///
/// Card subscriptions are created through hosted Checkout. Entitlement
/// periods are computed by the reconciler, not read from Stripe.
#[derive(Clone)]
pub struct StripePaymentAdapter {
    client: StripeClient,
    webhook_secret: SecretString,
}

impl StripePaymentAdapter {
    pub fn new(
        secret_key: SecretString,
        webhook_secret: SecretString,
        api_base: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            client: StripeClient::new(secret_key, api_base)?,
            webhook_secret,
        })
    }

    fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now)
    }

    fn checkout_event(
        session: &StripeCheckoutSession,
        occurred_at: DateTime<Utc>,
        raw_type: &str,
    ) -> NormalizedPaymentEvent {
        let user_id = metadata_uuid(&session.metadata, "user_id").or_else(|| {
            session
                .client_reference_id
                .as_deref()
                .and_then(|id| Uuid::parse_str(id).ok())
        });

        let mut event = NormalizedPaymentEvent::new(
            PaymentEventKind::CheckoutCompleted,
            PaymentProvider::CardCheckout,
            user_id,
            format!("checkout:{}", session.id),
            occurred_at,
            raw_type,
        );
        event.plan_id = metadata_uuid(&session.metadata, "plan_id");
        event.plan_name = session.metadata.get("plan_name").cloned();
        event.amount_cents = session.amount_total;
        event.external_customer_id = session.customer.clone();
        event.external_subscription_id = session.subscription.clone();
        event
    }

    /// Invoices carry the subscription metadata on recent API versions.
    /// Older payloads need the subscription fetched to attribute the event.
    async fn invoice_attribution(
        &self,
        invoice: &StripeInvoice,
    ) -> AppResult<Option<HashMap<String, String>>> {
        if let Some(metadata) = invoice.subscription_metadata() {
            if metadata.contains_key("user_id") {
                return Ok(Some(metadata.clone()));
            }
        }
        match invoice.subscription_id() {
            Some(subscription_id) => {
                let subscription = self.client.get_subscription(subscription_id).await?;
                Ok(Some(subscription.metadata))
            }
            None => Ok(None),
        }
    }

    async fn invoice_event(
        &self,
        kind: PaymentEventKind,
        invoice: &StripeInvoice,
        event: &StripeWebhookEvent,
    ) -> AppResult<NormalizedPaymentEvent> {
        let occurred_at = Self::timestamp_to_datetime(event.created);
        let suffix = match kind {
            PaymentEventKind::PaymentFailed => "failed",
            _ => "paid",
        };
        let metadata = self.invoice_attribution(invoice).await?.unwrap_or_default();

        let mut normalized = NormalizedPaymentEvent::new(
            kind,
            PaymentProvider::CardCheckout,
            metadata_uuid(&metadata, "user_id"),
            format!("invoice:{}:{}", invoice.id, suffix),
            occurred_at,
            &event.event_type,
        );
        normalized.plan_id = metadata_uuid(&metadata, "plan_id");
        normalized.plan_name = metadata.get("plan_name").cloned();
        normalized.amount_cents = Some(match kind {
            PaymentEventKind::PaymentFailed => invoice.amount_due,
            _ => invoice.amount_paid,
        });
        normalized.external_customer_id = invoice.customer.clone();
        normalized.external_subscription_id = invoice.subscription_id().map(str::to_string);
        Ok(normalized)
    }

    fn cancellation_event(
        subscription: &StripeSubscription,
        event: &StripeWebhookEvent,
    ) -> NormalizedPaymentEvent {
        let occurred_at =
            Self::timestamp_to_datetime(subscription.canceled_at.unwrap_or(event.created));
        let mut normalized = NormalizedPaymentEvent::new(
            PaymentEventKind::SubscriptionCanceled,
            PaymentProvider::CardCheckout,
            metadata_uuid(&subscription.metadata, "user_id"),
            format!("subscription:{}:deleted", subscription.id),
            occurred_at,
            &event.event_type,
        );
        normalized.plan_id = metadata_uuid(&subscription.metadata, "plan_id");
        normalized.external_customer_id = Some(subscription.customer.clone());
        normalized.external_subscription_id = Some(subscription.id.clone());
        normalized
    }

    async fn normalize(&self, event: StripeWebhookEvent) -> AppResult<NormalizedPaymentEvent> {
        let occurred_at = Self::timestamp_to_datetime(event.created);
        let ignored = || {
            NormalizedPaymentEvent::ignored(
                PaymentProvider::CardCheckout,
                event.id.clone(),
                occurred_at,
                &event.event_type,
            )
        };
        let malformed = || AppError::InvalidInput(format!("Malformed {} payload", event.event_type));

        let normalized = match event.event_type.as_str() {
            "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
                let session = event.get_checkout_session().ok_or_else(malformed)?;
                if session.is_paid() {
                    Self::checkout_event(&session, occurred_at, &event.event_type)
                } else {
                    // Delayed payment methods complete later with async_payment_succeeded.
                    ignored()
                }
            }
            "invoice.paid" | "invoice.payment_succeeded" => {
                let invoice = event.get_invoice().ok_or_else(malformed)?;
                if invoice.billing_reason.as_deref() == Some("subscription_create") {
                    // First invoice; the checkout session already granted the period.
                    ignored()
                } else {
                    self.invoice_event(PaymentEventKind::PaymentSucceeded, &invoice, &event)
                        .await?
                }
            }
            "invoice.payment_failed" => {
                let invoice = event.get_invoice().ok_or_else(malformed)?;
                self.invoice_event(PaymentEventKind::PaymentFailed, &invoice, &event)
                    .await?
            }
            "customer.subscription.deleted" => {
                let subscription = event.get_subscription().ok_or_else(malformed)?;
                Self::cancellation_event(&subscription, &event)
            }
            _ => ignored(),
        };

        if normalized.kind != PaymentEventKind::Ignored && normalized.user_id.is_none() {
            tracing::warn!(
                event_id = %event.id,
                event_type = %event.event_type,
                "Stripe event has no user_id metadata"
            );
            return Ok(ignored());
        }

        Ok(normalized)
    }
}

fn metadata_uuid(metadata: &HashMap<String, String>, key: &str) -> Option<Uuid> {
    metadata.get(key).and_then(|v| Uuid::parse_str(v).ok())
}

fn with_session_placeholder(success_url: &str) -> String {
    let separator = if success_url.contains('?') { '&' } else { '?' };
    format!("{}{}session_id={{CHECKOUT_SESSION_ID}}", success_url, separator)
}

#[async_trait]
impl PaymentProviderPort for StripePaymentAdapter {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::CardCheckout
    }

    async fn initiate_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutResult> {
        let metadata = [
            ("user_id", request.user_id.to_string()),
            ("plan_id", request.plan.id.to_string()),
            ("plan_name", request.plan.name.clone()),
        ];

        let customer = self
            .client
            .get_or_create_customer(&request.email, &metadata[..1])
            .await?;

        let success_url = with_session_placeholder(&request.urls.success_url);
        let client_reference_id = request.user_id.to_string();
        let session = self
            .client
            .create_checkout_session(&CheckoutSessionParams {
                customer_id: &customer.id,
                price_id: request.plan.external_price_id.as_deref(),
                unit_amount: request.plan.price_cents,
                currency: &request.plan.currency,
                product_name: &request.plan.name,
                success_url: &success_url,
                cancel_url: &request.urls.cancel_url,
                client_reference_id: &client_reference_id,
                metadata: &metadata,
            })
            .await?;

        tracing::info!(
            user_id = %request.user_id,
            session_id = %session.id,
            "Stripe checkout session created"
        );

        Ok(CheckoutResult {
            redirect_url: session.url,
            client_secret: None,
            session_ref: session.id,
        })
    }

    async fn verify_completed_session(
        &self,
        session_ref: &str,
    ) -> AppResult<NormalizedPaymentEvent> {
        let session = match self.client.get_checkout_session(session_ref).await {
            Ok(session) => session,
            Err(AppError::NotFound) => return Err(AppError::SessionNotFound),
            Err(e) => return Err(e),
        };

        if !session.is_paid() {
            tracing::info!(
                session_id = %session.id,
                status = ?session.status,
                payment_status = ?session.payment_status,
                "Stripe session not paid yet"
            );
            return Err(AppError::SessionIncomplete);
        }

        let occurred_at = Self::timestamp_to_datetime(session.created);
        Ok(Self::checkout_event(
            &session,
            occurred_at,
            "checkout.session.verified",
        ))
    }

    async fn parse_webhook(
        &self,
        raw_body: &[u8],
        signature: &str,
    ) -> AppResult<NormalizedPaymentEvent> {
        verify_signature_header(
            raw_body,
            signature,
            self.webhook_secret.expose_secret(),
            Utc::now().timestamp(),
            SIGNATURE_TOLERANCE_SECS,
        )?;

        let event: StripeWebhookEvent = serde_json::from_slice(raw_body).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Stripe webhook payload");
            AppError::InvalidInput("Malformed webhook payload".into())
        })?;

        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Stripe webhook received");
        self.normalize(event).await
    }
}
