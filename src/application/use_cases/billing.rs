use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_provider::{CheckoutRequest, CheckoutResult, CheckoutUrls, CustomerData},
        validators::{is_valid_email, is_valid_tax_id, normalize_phone},
    },
    domain::entities::{
        payment_method::PaymentMethod,
        payment_provider::PaymentProvider,
        payment_status::LastPaymentStatus,
        plan::Plan,
        subscription_state::SubscriptionState,
        user::{Identity, User, UserRole},
    },
};

use super::{
    payment_provider_registry::PaymentProviderRegistry,
    subscription_reconciler::{ReconcileOutcome, SubscriptionReconciler, SubscriptionStateRepoTrait},
};

// ============================================================================
// Repository Traits
// ============================================================================

#[async_trait]
pub trait UserRepoTrait: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>>;
}

#[async_trait]
pub trait PlanRepoTrait: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>>;
    async fn list_active(&self) -> AppResult<Vec<Plan>>;
}

// ============================================================================
// Input / Output Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutInput {
    pub plan_id: Uuid,
    pub method: PaymentMethod,
    #[serde(default)]
    pub customer: Option<CustomerData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    None,
    Active,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
        }
    }
}

/// What the dashboard shows about a professional's plan.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionOverview {
    pub status: SubscriptionStatus,
    pub plan_name: Option<String>,
    pub provider: Option<PaymentProvider>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub last_payment_status: LastPaymentStatus,
    pub canceled: bool,
    pub manually_granted: bool,
}

impl SubscriptionOverview {
    pub fn from_state(state: Option<&SubscriptionState>, now: DateTime<Utc>) -> Self {
        let Some(state) = state else {
            return Self::empty();
        };
        let status = match state.current_period_end {
            None => SubscriptionStatus::None,
            Some(_) if state.is_entitled_at(now) => SubscriptionStatus::Active,
            Some(_) => SubscriptionStatus::Expired,
        };
        Self {
            status,
            plan_name: state.plan_name.clone(),
            provider: state.provider,
            current_period_end: state.current_period_end,
            last_payment_status: state.last_payment_status,
            canceled: state.is_canceled(),
            manually_granted: state.manually_granted_by.is_some(),
        }
    }

    fn empty() -> Self {
        Self {
            status: SubscriptionStatus::None,
            plan_name: None,
            provider: None,
            current_period_end: None,
            last_payment_status: LastPaymentStatus::None,
            canceled: false,
            manually_granted: false,
        }
    }
}

// ============================================================================
// Use Cases
// ============================================================================

#[derive(Clone)]
pub struct BillingUseCases {
    user_repo: Arc<dyn UserRepoTrait>,
    plan_repo: Arc<dyn PlanRepoTrait>,
    subscription_repo: Arc<dyn SubscriptionStateRepoTrait>,
    reconciler: Arc<SubscriptionReconciler>,
    providers: PaymentProviderRegistry,
    app_origin: Url,
}

impl BillingUseCases {
    pub fn new(
        user_repo: Arc<dyn UserRepoTrait>,
        plan_repo: Arc<dyn PlanRepoTrait>,
        subscription_repo: Arc<dyn SubscriptionStateRepoTrait>,
        providers: PaymentProviderRegistry,
        app_origin: Url,
    ) -> Self {
        let reconciler = Arc::new(SubscriptionReconciler::new(subscription_repo.clone()));
        Self {
            user_repo,
            plan_repo,
            subscription_repo,
            reconciler,
            providers,
            app_origin,
        }
    }

    pub fn configured_providers(&self) -> Vec<PaymentProvider> {
        self.providers.configured()
    }

    pub async fn list_plans(&self) -> AppResult<Vec<Plan>> {
        self.plan_repo.list_active().await
    }

    /// Starts a checkout for the calling professional.
    ///
    /// # Errors
    /// - `Forbidden` for non-professionals
    /// - `NotFound` when the caller has no user record or professional profile
    /// - `InvalidPlan` for unknown or inactive plans
    /// - `InvalidCustomerData` when boleto/PIX billing data is missing or malformed
    /// - `ProviderNotConfigured` when no provider handles the method
    pub async fn initiate_checkout(
        &self,
        identity: &Identity,
        input: CheckoutInput,
    ) -> AppResult<CheckoutResult> {
        if identity.role != UserRole::Professional {
            return Err(AppError::Forbidden);
        }
        self.ensure_known_professional(identity).await?;
        if !is_valid_email(&identity.email) {
            return Err(AppError::InvalidCustomerData("email".into()));
        }

        let plan = self
            .plan_repo
            .get_by_id(input.plan_id)
            .await?
            .filter(|p| p.active)
            .ok_or(AppError::InvalidPlan)?;

        let adapter = self.providers.for_method(input.method)?;
        let provider = adapter.provider();

        let customer = if input.method.requires_customer_data()
            || provider == PaymentProvider::BoletoPix
        {
            let raw = input
                .customer
                .ok_or_else(|| AppError::InvalidCustomerData("customer".into()))?;
            Some(validate_customer(raw)?)
        } else {
            None
        };

        let request = CheckoutRequest {
            user_id: identity.user_id,
            email: identity.email.trim().to_string(),
            plan,
            method: input.method,
            customer,
            urls: self.checkout_urls(provider)?,
        };

        let result = adapter.initiate_checkout(&request).await?;
        tracing::info!(
            user_id = %identity.user_id,
            plan_id = %request.plan.id,
            provider = %provider,
            method = %input.method,
            session_ref = %result.session_ref,
            "Checkout initiated"
        );
        Ok(result)
    }

    /// Authenticates a webhook delivery and feeds it to the reconciler.
    pub async fn reconcile_webhook(
        &self,
        provider: PaymentProvider,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> AppResult<ReconcileOutcome> {
        let adapter = self.providers.get(provider)?;
        let signature = signature.ok_or(AppError::InvalidSignature)?;
        let event = adapter.parse_webhook(raw_body, signature).await?;

        let outcome = self.reconciler.apply(&event).await?;
        tracing::info!(
            provider = %provider,
            raw_type = %event.raw_type,
            event_ref = %event.provider_ref,
            outcome = outcome.as_str(),
            "Webhook reconciled"
        );
        Ok(outcome)
    }

    /// Confirms a checkout from the success page and applies it right away,
    /// so the user does not have to wait for the webhook.
    pub async fn reconcile_from_redirect(
        &self,
        identity: &Identity,
        provider: PaymentProvider,
        session_ref: &str,
    ) -> AppResult<SubscriptionOverview> {
        if session_ref.trim().is_empty() {
            return Err(AppError::SessionNotFound);
        }
        let adapter = self.providers.get(provider)?;
        let event = adapter.verify_completed_session(session_ref).await?;

        if event.user_id != Some(identity.user_id) {
            tracing::warn!(
                user_id = %identity.user_id,
                session_ref = %session_ref,
                "Checkout session belongs to another user"
            );
            return Err(AppError::Forbidden);
        }

        let outcome = self.reconciler.apply(&event).await?;
        tracing::info!(
            user_id = %identity.user_id,
            provider = %provider,
            outcome = outcome.as_str(),
            "Checkout verified from redirect"
        );
        self.subscription_overview(identity.user_id).await
    }

    pub async fn activate_manually(
        &self,
        admin: &Identity,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> AppResult<SubscriptionOverview> {
        if !admin.role.is_admin() {
            return Err(AppError::Forbidden);
        }
        let user = self.user_repo.get_by_id(user_id).await?.ok_or(AppError::NotFound)?;
        if user.role != UserRole::Professional {
            return Err(AppError::InvalidInput(
                "Only professionals have subscriptions".into(),
            ));
        }
        let plan = self
            .plan_repo
            .get_by_id(plan_id)
            .await?
            .ok_or(AppError::InvalidPlan)?;

        self.reconciler
            .activate_manually(user.id, &plan, admin.user_id, Utc::now())
            .await?;
        self.subscription_overview(user.id).await
    }

    pub async fn subscription_overview(&self, user_id: Uuid) -> AppResult<SubscriptionOverview> {
        let state = match self.subscription_repo.get_subscription_state(user_id).await {
            Ok(state) => state,
            Err(AppError::NotFound) => None,
            Err(e) => return Err(e),
        };
        Ok(SubscriptionOverview::from_state(state.as_ref(), Utc::now()))
    }

    /// A payment for someone the reconciler cannot attribute would be
    /// charged and never applied, so both records must exist up front.
    async fn ensure_known_professional(&self, identity: &Identity) -> AppResult<()> {
        let user = self.user_repo.get_by_id(identity.user_id).await?;
        if !user.is_some_and(|u| u.role == UserRole::Professional) {
            tracing::warn!(user_id = %identity.user_id, "Checkout for unknown professional");
            return Err(AppError::NotFound);
        }
        // NotFound when the professional profile is missing.
        self.subscription_repo
            .get_subscription_state(identity.user_id)
            .await
            .inspect_err(|e| {
                if matches!(e, AppError::NotFound) {
                    tracing::warn!(user_id = %identity.user_id, "Checkout without professional profile");
                }
            })?;
        Ok(())
    }

    fn checkout_urls(&self, provider: PaymentProvider) -> AppResult<CheckoutUrls> {
        let mut success = self
            .app_origin
            .join("/payment-success")
            .map_err(|e| AppError::Internal(e.to_string()))?;
        success
            .query_pairs_mut()
            .append_pair("provider", provider.as_ref());
        let cancel = self
            .app_origin
            .join("/plans")
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(CheckoutUrls {
            success_url: success.to_string(),
            cancel_url: cancel.to_string(),
        })
    }
}

fn validate_customer(raw: CustomerData) -> AppResult<CustomerData> {
    let name = raw.name.trim();
    if name.is_empty() {
        return Err(AppError::InvalidCustomerData("name".into()));
    }
    if !is_valid_tax_id(&raw.tax_id) {
        return Err(AppError::InvalidCustomerData("tax_id".into()));
    }
    let phone = normalize_phone(&raw.phone)
        .ok_or_else(|| AppError::InvalidCustomerData("phone".into()))?;
    Ok(CustomerData {
        name: name.to_string(),
        tax_id: crate::application::validators::digits_only(&raw.tax_id),
        phone,
    })
}
