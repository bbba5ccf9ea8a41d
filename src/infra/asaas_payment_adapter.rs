use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::payment_provider::{CheckoutRequest, CheckoutResult, PaymentProviderPort},
    domain::entities::{
        payment_event::{NormalizedPaymentEvent, PaymentEventKind},
        payment_provider::PaymentProvider,
    },
    infra::{
        asaas_client::{
            AsaasClient, AsaasPayment, AsaasSubscription, AsaasWebhookEvent, NewAsaasCustomer,
            NewAsaasSubscription,
        },
        webhook_signature::verify_shared_token,
    },
};

/// Asaas reports local times in Brasília (UTC-03:00, no DST since 2019).
const BRASILIA_OFFSET_SECS: i32 = 3 * 3600;

/// Adapter that wraps AsaasClient to implement PaymentProviderPort.
///
/// Subscriptions are monthly; boleto and PIX charges are issued by Asaas on
/// each due date and confirmed through webhooks.
#[derive(Clone)]
pub struct AsaasPaymentAdapter {
    client: AsaasClient,
    webhook_token: SecretString,
}

impl AsaasPaymentAdapter {
    pub fn new(
        api_key: SecretString,
        webhook_token: SecretString,
        api_base: impl Into<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            client: AsaasClient::new(api_key, api_base)?,
            webhook_token,
        })
    }

    async fn payment_event(
        &self,
        kind: PaymentEventKind,
        payment: &AsaasPayment,
        occurred_at: DateTime<Utc>,
        raw_type: &str,
    ) -> AppResult<NormalizedPaymentEvent> {
        let suffix = match kind {
            PaymentEventKind::PaymentFailed => "failed",
            _ => "succeeded",
        };

        // Charges issued by a subscription may omit the reference; the
        // subscription always carries it.
        let reference = match (&payment.external_reference, &payment.subscription) {
            (Some(reference), _) => Some(reference.clone()),
            (None, Some(subscription_id)) => {
                self.client
                    .get_subscription(subscription_id)
                    .await?
                    .external_reference
            }
            (None, None) => None,
        };
        let (user_id, plan_id) = parse_external_reference(reference.as_deref());

        let mut event = NormalizedPaymentEvent::new(
            kind,
            PaymentProvider::BoletoPix,
            user_id,
            format!("payment:{}:{}", payment.id, suffix),
            occurred_at,
            raw_type,
        );
        event.plan_id = plan_id;
        event.amount_cents = Some(payment.value_cents());
        event.external_customer_id = payment.customer.clone();
        event.external_subscription_id = payment.subscription.clone();
        Ok(event)
    }

    fn cancellation_event(
        subscription: &AsaasSubscription,
        occurred_at: DateTime<Utc>,
        raw_type: &str,
    ) -> NormalizedPaymentEvent {
        let (user_id, plan_id) =
            parse_external_reference(subscription.external_reference.as_deref());
        let mut event = NormalizedPaymentEvent::new(
            PaymentEventKind::SubscriptionCanceled,
            PaymentProvider::BoletoPix,
            user_id,
            format!("subscription:{}:canceled", subscription.id),
            occurred_at,
            raw_type,
        );
        event.plan_id = plan_id;
        event.external_customer_id = subscription.customer.clone();
        event.external_subscription_id = Some(subscription.id.clone());
        event
    }

    async fn normalize(&self, webhook: AsaasWebhookEvent) -> AppResult<NormalizedPaymentEvent> {
        let occurred_at = webhook
            .date_created
            .as_deref()
            .and_then(parse_local_datetime)
            .unwrap_or_else(Utc::now);
        let raw_type = webhook.event.as_str();
        let fallback_ref = webhook.id.clone().unwrap_or_else(|| {
            let object_id = webhook
                .payment
                .as_ref()
                .map(|p| p.id.as_str())
                .or(webhook.subscription.as_ref().map(|s| s.id.as_str()))
                .unwrap_or("unknown");
            format!("{}:{}", raw_type, object_id)
        });
        let ignored =
            || NormalizedPaymentEvent::ignored(PaymentProvider::BoletoPix, fallback_ref.clone(), occurred_at, raw_type);
        let malformed = || AppError::InvalidInput(format!("Malformed {} payload", raw_type));

        let normalized = match raw_type {
            "PAYMENT_RECEIVED" | "PAYMENT_CONFIRMED" => {
                let payment = webhook.payment.as_ref().ok_or_else(malformed)?;
                self.payment_event(PaymentEventKind::PaymentSucceeded, payment, occurred_at, raw_type)
                    .await?
            }
            "PAYMENT_OVERDUE" | "PAYMENT_CREDIT_CARD_CAPTURE_REFUSED" => {
                let payment = webhook.payment.as_ref().ok_or_else(malformed)?;
                self.payment_event(PaymentEventKind::PaymentFailed, payment, occurred_at, raw_type)
                    .await?
            }
            "SUBSCRIPTION_DELETED" | "SUBSCRIPTION_INACTIVATED" => {
                let subscription = webhook.subscription.as_ref().ok_or_else(malformed)?;
                Self::cancellation_event(subscription, occurred_at, raw_type)
            }
            _ => ignored(),
        };

        if normalized.kind != PaymentEventKind::Ignored && normalized.user_id.is_none() {
            tracing::warn!(
                event = %raw_type,
                provider_ref = %normalized.provider_ref,
                "Asaas event has no usable externalReference"
            );
            return Ok(ignored());
        }

        Ok(normalized)
    }
}

fn brasilia() -> Option<FixedOffset> {
    FixedOffset::west_opt(BRASILIA_OFFSET_SECS)
}

/// Parses Asaas `YYYY-MM-DD HH:MM:SS` local timestamps.
fn parse_local_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M:%S").ok()?;
    brasilia()?
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Midnight of a local Asaas date.
fn local_date_start(date: NaiveDate) -> Option<DateTime<Utc>> {
    parse_local_datetime(&format!("{} 00:00:00", date))
}

/// First due date for a new subscription: tomorrow in Brasília.
fn first_due_date(now: DateTime<Utc>) -> NaiveDate {
    let today = brasilia()
        .map(|offset| now.with_timezone(&offset).date_naive())
        .unwrap_or_else(|| now.date_naive());
    today + Duration::days(1)
}

fn external_reference(user_id: Uuid, plan_id: Uuid) -> String {
    format!("{}:{}", user_id, plan_id)
}

/// Splits `"<user_id>:<plan_id>"`. A bare user id is accepted.
fn parse_external_reference(reference: Option<&str>) -> (Option<Uuid>, Option<Uuid>) {
    let Some(reference) = reference else {
        return (None, None);
    };
    let mut parts = reference.splitn(2, ':');
    let user_id = parts.next().and_then(|p| Uuid::parse_str(p.trim()).ok());
    let plan_id = parts.next().and_then(|p| Uuid::parse_str(p.trim()).ok());
    (user_id, plan_id)
}

fn with_session_ref(success_url: &str, session_ref: &str) -> String {
    let separator = if success_url.contains('?') { '&' } else { '?' };
    format!("{}{}session_id={}", success_url, separator, session_ref)
}

#[async_trait]
impl PaymentProviderPort for AsaasPaymentAdapter {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::BoletoPix
    }

    async fn initiate_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutResult> {
        let customer_data = request
            .customer
            .as_ref()
            .ok_or_else(|| AppError::InvalidCustomerData("customer".into()))?;

        let customer = self
            .client
            .create_customer(&NewAsaasCustomer {
                name: &customer_data.name,
                email: &request.email,
                cpf_cnpj: &customer_data.tax_id,
                mobile_phone: &customer_data.phone,
                external_reference: request.user_id.to_string(),
                notification_disabled: false,
            })
            .await?;

        let subscription = self
            .client
            .create_subscription(&NewAsaasSubscription {
                customer: &customer.id,
                billing_type: request.method.asaas_billing_type(),
                value: request.plan.price_major_units(),
                next_due_date: first_due_date(Utc::now()),
                cycle: "MONTHLY",
                description: format!("Assinatura do plano {}", request.plan.name),
                external_reference: external_reference(request.user_id, request.plan.id),
                max_payments: None,
            })
            .await?;

        tracing::info!(
            user_id = %request.user_id,
            subscription_id = %subscription.id,
            billing_type = %request.method.asaas_billing_type(),
            "Asaas subscription created"
        );

        // The first charge is issued with the subscription; send the user to
        // its invoice page when we can find it.
        let invoice_url = match self.client.list_subscription_payments(&subscription.id).await {
            Ok(payments) => payments.into_iter().find_map(|p| p.invoice_url),
            Err(e) => {
                tracing::warn!(error = %e, subscription_id = %subscription.id, "Could not load first Asaas charge");
                None
            }
        };

        Ok(CheckoutResult {
            redirect_url: Some(
                invoice_url
                    .unwrap_or_else(|| with_session_ref(&request.urls.success_url, &subscription.id)),
            ),
            client_secret: None,
            session_ref: subscription.id,
        })
    }

    async fn verify_completed_session(
        &self,
        session_ref: &str,
    ) -> AppResult<NormalizedPaymentEvent> {
        let subscription = match self.client.get_subscription(session_ref).await {
            Ok(subscription) => subscription,
            Err(AppError::NotFound) => return Err(AppError::SessionNotFound),
            Err(e) => return Err(e),
        };

        let payments = self.client.list_subscription_payments(&subscription.id).await?;
        let Some(payment) = payments.iter().find(|p| p.is_paid()) else {
            tracing::info!(subscription_id = %subscription.id, "No paid Asaas charge yet");
            return Err(AppError::SessionIncomplete);
        };

        let (user_id, plan_id) =
            parse_external_reference(subscription.external_reference.as_deref());
        let occurred_at = payment
            .confirmed_date
            .or(payment.payment_date)
            .and_then(local_date_start)
            .unwrap_or_else(Utc::now);

        // Same reference as the PAYMENT_RECEIVED webhook for this charge.
        let mut event = NormalizedPaymentEvent::new(
            PaymentEventKind::CheckoutCompleted,
            PaymentProvider::BoletoPix,
            user_id,
            format!("payment:{}:succeeded", payment.id),
            occurred_at,
            "SUBSCRIPTION_VERIFIED",
        );
        event.plan_id = plan_id;
        event.amount_cents = Some(payment.value_cents());
        event.external_customer_id = subscription.customer.clone();
        event.external_subscription_id = Some(subscription.id.clone());
        event.period_end = subscription.next_due_date.and_then(local_date_start);
        Ok(event)
    }

    async fn parse_webhook(
        &self,
        raw_body: &[u8],
        signature: &str,
    ) -> AppResult<NormalizedPaymentEvent> {
        verify_shared_token(signature, self.webhook_token.expose_secret())?;

        let webhook: AsaasWebhookEvent = serde_json::from_slice(raw_body).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse Asaas webhook payload");
            AppError::InvalidInput("Malformed webhook payload".into())
        })?;

        tracing::debug!(event = %webhook.event, id = ?webhook.id, "Asaas webhook received");
        self.normalize(webhook).await
    }
}
