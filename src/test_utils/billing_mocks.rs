//! In-memory mock implementations for billing-related repository traits
//! and a scriptable payment provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::payment_provider::{CheckoutRequest, CheckoutResult, PaymentProviderPort},
        use_cases::{
            billing::{PlanRepoTrait, UserRepoTrait},
            profile::{ProfessionalProfileRepoTrait, ProfileUpdate},
            subscription_reconciler::{PatchOutcome, SubscriptionStateRepoTrait},
        },
    },
    domain::entities::{
        payment_event::NormalizedPaymentEvent,
        payment_provider::PaymentProvider,
        plan::Plan,
        professional_profile::ProfessionalProfile,
        subscription_state::{SubscriptionPatch, SubscriptionState},
        user::User,
    },
};

// ============================================================================
// InMemoryProfessionalStore
// ============================================================================

/// Professional profiles with their embedded subscription state.
/// Applies patches with the same merge and ordering rules as Postgres.
#[derive(Default)]
pub struct InMemoryProfessionalStore {
    pub profiles: Mutex<HashMap<Uuid, ProfessionalProfile>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
    read_delay: Option<Duration>,
}

impl InMemoryProfessionalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profiles(profiles: Vec<ProfessionalProfile>) -> Self {
        let map = profiles.into_iter().map(|p| (p.user_id, p)).collect();
        Self {
            profiles: Mutex::new(map),
            ..Default::default()
        }
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn subscription_of(&self, user_id: Uuid) -> Option<SubscriptionState> {
        self.profiles
            .lock()
            .unwrap()
            .get(&user_id)
            .and_then(|p| p.subscription.clone())
    }
}

#[async_trait]
impl SubscriptionStateRepoTrait for InMemoryProfessionalStore {
    async fn get_subscription_state(&self, user_id: Uuid) -> AppResult<Option<SubscriptionState>> {
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        self.profiles
            .lock()
            .unwrap()
            .get(&user_id)
            .map(|p| p.subscription.clone())
            .ok_or(AppError::NotFound)
    }

    async fn patch_subscription_state(
        &self,
        user_id: Uuid,
        patch: &SubscriptionPatch,
        occurred_at: DateTime<Utc>,
    ) -> AppResult<PatchOutcome> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database("simulated write failure".into()));
        }
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.get_mut(&user_id).ok_or(AppError::NotFound)?;
        if profile
            .subscription
            .as_ref()
            .is_some_and(|s| s.is_stale(occurred_at))
        {
            return Ok(PatchOutcome::Stale);
        }
        let merged = SubscriptionState::merged(profile.subscription.as_ref(), patch)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        profile.subscription = Some(merged);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(PatchOutcome::Applied)
    }
}

#[async_trait]
impl ProfessionalProfileRepoTrait for InMemoryProfessionalStore {
    async fn get_by_user_id(&self, user_id: Uuid) -> AppResult<Option<ProfessionalProfile>> {
        Ok(self.profiles.lock().unwrap().get(&user_id).cloned())
    }

    async fn update_fields(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> AppResult<ProfessionalProfile> {
        let mut profiles = self.profiles.lock().unwrap();
        let profile = profiles.get_mut(&user_id).ok_or(AppError::NotFound)?;
        if let Some(name) = &update.name {
            profile.name = Some(name.clone());
        }
        if let Some(category) = &update.category {
            profile.category = Some(category.clone());
        }
        if let Some(rate) = update.hourly_rate_cents {
            profile.hourly_rate_cents = Some(rate);
        }
        if let Some(location) = &update.location {
            profile.location = Some(location.clone());
        }
        if let Some(phone) = &update.phone {
            profile.phone = Some(phone.clone());
        }
        Ok(profile.clone())
    }
}

// ============================================================================
// InMemoryUserRepo / InMemoryPlanRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepo {
    pub users: Mutex<HashMap<Uuid, User>>,
}

impl InMemoryUserRepo {
    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Mutex::new(users.into_iter().map(|u| (u.id, u)).collect()),
        }
    }
}

#[async_trait]
impl UserRepoTrait for InMemoryUserRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.users.lock().unwrap().get(&id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryPlanRepo {
    pub plans: Mutex<Vec<Plan>>,
}

impl InMemoryPlanRepo {
    pub fn with_plans(plans: Vec<Plan>) -> Self {
        Self {
            plans: Mutex::new(plans),
        }
    }
}

#[async_trait]
impl PlanRepoTrait for InMemoryPlanRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn list_active(&self) -> AppResult<Vec<Plan>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.active)
            .cloned()
            .collect())
    }
}

// ============================================================================
// FakePaymentProvider
// ============================================================================

/// Payment provider whose sessions and webhook payloads are set up by the test.
pub struct FakePaymentProvider {
    provider: PaymentProvider,
    checkouts: Mutex<Vec<CheckoutRequest>>,
    /// `None` marks a session that exists but is unpaid
    sessions: Mutex<HashMap<String, Option<NormalizedPaymentEvent>>>,
    webhook_event: Mutex<Option<NormalizedPaymentEvent>>,
    unavailable: AtomicBool,
}

impl FakePaymentProvider {
    pub const VALID_SIGNATURE: &'static str = "valid-signature";

    pub fn new(provider: PaymentProvider) -> Self {
        Self {
            provider,
            checkouts: Mutex::new(Vec::new()),
            sessions: Mutex::new(HashMap::new()),
            webhook_event: Mutex::new(None),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn checkout_requests(&self) -> Vec<CheckoutRequest> {
        self.checkouts.lock().unwrap().clone()
    }

    pub fn add_completed_session(&self, session_ref: &str, event: NormalizedPaymentEvent) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session_ref.to_string(), Some(event));
    }

    pub fn add_pending_session(&self, session_ref: &str) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session_ref.to_string(), None);
    }

    pub fn set_webhook_event(&self, event: NormalizedPaymentEvent) {
        *self.webhook_event.lock().unwrap() = Some(event);
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentProviderPort for FakePaymentProvider {
    fn provider(&self) -> PaymentProvider {
        self.provider
    }

    async fn initiate_checkout(&self, request: &CheckoutRequest) -> AppResult<CheckoutResult> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::ProviderUnavailable("fake outage".into()));
        }
        let mut checkouts = self.checkouts.lock().unwrap();
        checkouts.push(request.clone());
        let session_ref = format!("sess_{}", checkouts.len());
        Ok(CheckoutResult {
            redirect_url: Some(format!("https://pay.example.com/{}", session_ref)),
            client_secret: None,
            session_ref,
        })
    }

    async fn verify_completed_session(&self, session_ref: &str) -> AppResult<NormalizedPaymentEvent> {
        match self.sessions.lock().unwrap().get(session_ref) {
            Some(Some(event)) => Ok(event.clone()),
            Some(None) => Err(AppError::SessionIncomplete),
            None => Err(AppError::SessionNotFound),
        }
    }

    async fn parse_webhook(
        &self,
        _raw_body: &[u8],
        signature: &str,
    ) -> AppResult<NormalizedPaymentEvent> {
        if signature != Self::VALID_SIGNATURE {
            return Err(AppError::InvalidSignature);
        }
        self.webhook_event
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| AppError::InvalidInput("no webhook event scripted".into()))
    }
}
