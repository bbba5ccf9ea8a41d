use chrono::{DateTime, Utc};
use std::{sync::Arc, time::Duration};

use crate::domain::entities::{
    access::{AccessDecision, ResourceClass},
    subscription_state::SubscriptionState,
    user::{Identity, UserRole},
};

use super::subscription_reconciler::SubscriptionStateRepoTrait;

/// Decides whether a navigation may proceed.
///
/// Rules, first match wins:
/// 1. no identity: login
/// 2. admins: allow
/// 3. plan selection pages: allow
/// 4. non-professionals: allow
/// 5. professionals: allow only while `current_period_end` is in the future
pub fn decide_access(
    identity: Option<&Identity>,
    state: Option<&SubscriptionState>,
    resource: ResourceClass,
    now: DateTime<Utc>,
) -> AccessDecision {
    let Some(identity) = identity else {
        return AccessDecision::RedirectToLogin;
    };
    if identity.role == UserRole::Admin || resource == ResourceClass::PlanSelection {
        return AccessDecision::Allow;
    }
    if !identity.role.requires_entitlement() {
        return AccessDecision::Allow;
    }
    match state {
        Some(state) if state.is_entitled_at(now) => AccessDecision::Allow,
        _ => AccessDecision::RedirectToPlanSelection,
    }
}

pub struct AccessGateUseCases {
    repo: Arc<dyn SubscriptionStateRepoTrait>,
    read_timeout: Duration,
}

impl AccessGateUseCases {
    pub fn new(repo: Arc<dyn SubscriptionStateRepoTrait>, read_timeout: Duration) -> Self {
        Self { repo, read_timeout }
    }

    pub async fn decide_for_path(&self, identity: Option<&Identity>, path: &str) -> AccessDecision {
        self.decide_at(identity, ResourceClass::from_path(path), Utc::now())
            .await
    }

    /// Loads the subscription only when the decision depends on it. A read
    /// that fails or exceeds the timeout denies access.
    pub async fn decide_at(
        &self,
        identity: Option<&Identity>,
        resource: ResourceClass,
        now: DateTime<Utc>,
    ) -> AccessDecision {
        let needs_state = matches!(identity, Some(i) if i.role.requires_entitlement())
            && resource != ResourceClass::PlanSelection;
        if !needs_state {
            return decide_access(identity, None, resource, now);
        }
        let Some(user) = identity else {
            return AccessDecision::RedirectToLogin;
        };

        let state = match tokio::time::timeout(
            self.read_timeout,
            self.repo.get_subscription_state(user.user_id),
        )
        .await
        {
            Ok(Ok(state)) => state,
            Ok(Err(e)) => {
                tracing::warn!(user_id = %user.user_id, error = %e, "Subscription read failed, denying access");
                return AccessDecision::RedirectToPlanSelection;
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %user.user_id,
                    timeout_ms = self.read_timeout.as_millis() as u64,
                    "Subscription read timed out, denying access"
                );
                return AccessDecision::RedirectToPlanSelection;
            }
        };

        decide_access(identity, state.as_ref(), resource, now)
    }
}
