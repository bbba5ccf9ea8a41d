use async_trait::async_trait;
use chrono::{DateTime, Duration, Months, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::{
        payment_event::{NormalizedPaymentEvent, PaymentEventKind},
        payment_status::LastPaymentStatus,
        plan::Plan,
        subscription_state::{SubscriptionPatch, SubscriptionState},
    },
};

/// Result of a conditional subscription write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    /// A newer event was stored between our read and our write.
    Stale,
}

#[async_trait]
pub trait SubscriptionStateRepoTrait: Send + Sync {
    /// Returns `NotFound` when the user has no professional profile.
    async fn get_subscription_state(&self, user_id: Uuid) -> AppResult<Option<SubscriptionState>>;

    /// Merges the patch into the stored state unless a newer event already
    /// landed. Fields the patch does not mention are left untouched.
    async fn patch_subscription_state(
        &self,
        user_id: Uuid,
        patch: &SubscriptionPatch,
        occurred_at: DateTime<Utc>,
    ) -> AppResult<PatchOutcome>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied,
    /// Provider reference already applied recently.
    Duplicate,
    /// Older than the last applied event.
    Stale,
    /// Valid event that does not change anything.
    Unchanged,
    /// Irrelevant, unattributable, or for an unknown user.
    Ignored,
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Applied => "applied",
            ReconcileOutcome::Duplicate => "duplicate",
            ReconcileOutcome::Stale => "stale",
            ReconcileOutcome::Unchanged => "unchanged",
            ReconcileOutcome::Ignored => "ignored",
        }
    }
}

/// One billing cycle after `from`. Falls back to 30 days if the calendar
/// arithmetic overflows.
pub fn add_billing_cycle(from: DateTime<Utc>) -> DateTime<Utc> {
    from.checked_add_months(Months::new(1))
        .unwrap_or(from + Duration::days(30))
}

fn activation_patch(event: &NormalizedPaymentEvent, now: DateTime<Utc>) -> SubscriptionPatch {
    let period_end = match event.period_end {
        Some(end) if event.provider.supplies_period_end() && end > now => end,
        _ => add_billing_cycle(now),
    };
    SubscriptionPatch {
        active: Some(true),
        plan_id: event.plan_id,
        plan_name: event.plan_name.clone(),
        provider: Some(event.provider),
        external_customer_id: event.external_customer_id.clone(),
        external_subscription_id: event.external_subscription_id.clone(),
        current_period_start: Some(now),
        current_period_end: Some(period_end),
        last_payment_status: Some(LastPaymentStatus::Succeeded),
        canceled_at: Some(None),
        manually_granted_by: Some(None),
        ..Default::default()
    }
}

/// Pure state transition for one event. `None` means nothing to write.
pub fn transition(
    current: Option<&SubscriptionState>,
    event: &NormalizedPaymentEvent,
    now: DateTime<Utc>,
) -> Option<SubscriptionPatch> {
    match event.kind {
        PaymentEventKind::Ignored => None,
        PaymentEventKind::CheckoutCompleted => Some(activation_patch(event, now)),
        PaymentEventKind::PaymentSucceeded => {
            let Some(end) = current.and_then(|s| s.current_period_end) else {
                return Some(activation_patch(event, now));
            };
            // Paying early extends from the current end, paying late from now.
            let base = end.max(now);
            Some(SubscriptionPatch {
                active: Some(true),
                plan_id: event.plan_id,
                plan_name: event.plan_name.clone(),
                provider: Some(event.provider),
                external_customer_id: event.external_customer_id.clone(),
                external_subscription_id: event.external_subscription_id.clone(),
                current_period_start: Some(base),
                current_period_end: Some(add_billing_cycle(base)),
                last_payment_status: Some(LastPaymentStatus::Succeeded),
                ..Default::default()
            })
        }
        PaymentEventKind::PaymentFailed => Some(SubscriptionPatch {
            active: Some(false),
            last_payment_status: Some(LastPaymentStatus::Failed),
            ..Default::default()
        }),
        PaymentEventKind::SubscriptionCanceled => {
            let current = current?;
            if current.is_canceled() {
                return None;
            }
            Some(SubscriptionPatch {
                active: Some(false),
                canceled_at: Some(Some(event.occurred_at)),
                ..Default::default()
            })
        }
    }
}

/// Applies normalized payment events to professionals' subscription state.
///
/// Safe to call with the same event from both the webhook and the
/// post-checkout redirect, in any order and any number of times.
pub struct SubscriptionReconciler {
    repo: Arc<dyn SubscriptionStateRepoTrait>,
}

impl SubscriptionReconciler {
    pub fn new(repo: Arc<dyn SubscriptionStateRepoTrait>) -> Self {
        Self { repo }
    }

    pub async fn apply(&self, event: &NormalizedPaymentEvent) -> AppResult<ReconcileOutcome> {
        self.apply_at(event, Utc::now()).await
    }

    pub async fn apply_at(
        &self,
        event: &NormalizedPaymentEvent,
        now: DateTime<Utc>,
    ) -> AppResult<ReconcileOutcome> {
        if !event.is_actionable() {
            tracing::debug!(
                provider = %event.provider,
                raw_type = %event.raw_type,
                event_ref = %event.provider_ref,
                "Ignoring payment event"
            );
            return Ok(ReconcileOutcome::Ignored);
        }
        let Some(user_id) = event.user_id else {
            return Ok(ReconcileOutcome::Ignored);
        };

        let current = match self.repo.get_subscription_state(user_id).await {
            Ok(state) => state,
            Err(AppError::NotFound) => {
                tracing::warn!(
                    user_id = %user_id,
                    event_ref = %event.provider_ref,
                    "Payment event for user without professional profile"
                );
                return Ok(ReconcileOutcome::Ignored);
            }
            Err(e) => return Err(e),
        };

        if let Some(state) = current.as_ref() {
            if state.has_applied(&event.provider_ref) {
                tracing::debug!(user_id = %user_id, event_ref = %event.provider_ref, "Duplicate payment event");
                return Ok(ReconcileOutcome::Duplicate);
            }
            if state.is_stale(event.occurred_at) {
                tracing::info!(
                    user_id = %user_id,
                    event_ref = %event.provider_ref,
                    occurred_at = %event.occurred_at,
                    "Skipping out-of-order payment event"
                );
                return Ok(ReconcileOutcome::Stale);
            }
        }

        let Some(patch) = transition(current.as_ref(), event, now) else {
            return Ok(ReconcileOutcome::Unchanged);
        };
        let patch = patch.stamped(current.as_ref(), event.provider_ref.clone(), event.occurred_at);

        self.write(user_id, &patch, event.occurred_at).await.map(|outcome| {
            if outcome == ReconcileOutcome::Applied {
                tracing::info!(
                    user_id = %user_id,
                    kind = event.kind.as_str(),
                    provider = %event.provider,
                    event_ref = %event.provider_ref,
                    "Applied payment event"
                );
            }
            outcome
        })
    }

    /// Grants a billing cycle without a payment, e.g. for support cases.
    ///
    /// The grant has no provider timestamp, so the ordering watermark is left
    /// as is and provider events issued before the grant still apply.
    pub async fn activate_manually(
        &self,
        user_id: Uuid,
        plan: &Plan,
        granted_by: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<ReconcileOutcome> {
        let current = self.repo.get_subscription_state(user_id).await?;
        let base = current
            .as_ref()
            .and_then(|s| s.current_period_end)
            .map_or(now, |end| end.max(now));

        let patch = SubscriptionPatch {
            active: Some(true),
            plan_id: Some(plan.id),
            plan_name: Some(plan.name.clone()),
            current_period_start: Some(base),
            current_period_end: Some(add_billing_cycle(base)),
            canceled_at: Some(None),
            manually_granted_by: Some(Some(granted_by)),
            ..Default::default()
        }
        .recording(current.as_ref(), format!("manual:{}", Uuid::new_v4()));

        let watermark = current
            .as_ref()
            .and_then(|s| s.last_event_at)
            .unwrap_or(now);
        let outcome = self.write(user_id, &patch, watermark).await?;
        tracing::info!(user_id = %user_id, granted_by = %granted_by, plan_id = %plan.id, "Subscription activated manually");
        Ok(outcome)
    }

    async fn write(
        &self,
        user_id: Uuid,
        patch: &SubscriptionPatch,
        occurred_at: DateTime<Utc>,
    ) -> AppResult<ReconcileOutcome> {
        match self
            .repo
            .patch_subscription_state(user_id, patch, occurred_at)
            .await
        {
            Ok(PatchOutcome::Applied) => Ok(ReconcileOutcome::Applied),
            Ok(PatchOutcome::Stale) => {
                tracing::info!(user_id = %user_id, "Newer payment event stored concurrently");
                Ok(ReconcileOutcome::Stale)
            }
            Err(AppError::NotFound) => {
                tracing::warn!(user_id = %user_id, "Professional profile disappeared before write");
                Ok(ReconcileOutcome::Ignored)
            }
            Err(e) => Err(e),
        }
    }
}
