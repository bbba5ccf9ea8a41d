//! Test app state builder for HTTP-level testing.
//!
//! `TestAppStateBuilder` wires the real use cases to in-memory repositories
//! and whatever payment adapters the test registers.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use url::Url;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        jwt,
        ports::payment_provider::PaymentProviderPort,
        use_cases::{
            access_gate::AccessGateUseCases, billing::BillingUseCases,
            payment_provider_registry::PaymentProviderRegistry, profile::ProfileUseCases,
        },
    },
    domain::entities::{plan::Plan, professional_profile::ProfessionalProfile, user::{Identity, User}},
    infra::config::AppConfig,
    test_utils::{InMemoryPlanRepo, InMemoryProfessionalStore, InMemoryUserRepo},
};

pub const TEST_JWT_SECRET: &str = "test_jwt_secret";
pub const TEST_APP_ORIGIN: &str = "http://localhost:3000";

/// Signs a token for `identity` with the secret used by [`TestAppStateBuilder`].
pub fn bearer_token(identity: &Identity) -> String {
    jwt::issue(
        identity,
        &SecretString::from(TEST_JWT_SECRET.to_string()),
        time::Duration::hours(1),
    )
    .unwrap()
}

pub fn test_config() -> AppConfig {
    AppConfig {
        jwt_secret: SecretString::from(TEST_JWT_SECRET.to_string()),
        app_origin: Url::parse(TEST_APP_ORIGIN).unwrap(),
        cors_origin: HeaderValue::from_static(TEST_APP_ORIGIN),
        bind_addr: "127.0.0.1:3001".parse::<SocketAddr>().unwrap(),
        database_url: String::new(),
        gate_read_timeout: std::time::Duration::from_millis(200),
        card_checkout: None,
        boleto_pix: None,
    }
}

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// # Example
///
/// ```ignore
/// let card = Arc::new(FakePaymentProvider::new(PaymentProvider::CardCheckout));
/// let (app_state, store) = TestAppStateBuilder::new()
///     .with_user(user)
///     .with_profile(profile)
///     .with_plan(plan)
///     .with_provider(card.clone())
///     .build_with_store();
/// ```
#[derive(Default)]
pub struct TestAppStateBuilder {
    users: Vec<User>,
    profiles: Vec<ProfessionalProfile>,
    plans: Vec<Plan>,
    providers: PaymentProviderRegistry,
    store: Option<Arc<InMemoryProfessionalStore>>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_profile(mut self, profile: ProfessionalProfile) -> Self {
        self.profiles.push(profile);
        self
    }

    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plans.push(plan);
        self
    }

    pub fn with_provider(mut self, adapter: Arc<dyn PaymentProviderPort>) -> Self {
        self.providers = self.providers.with_provider(adapter);
        self
    }

    /// Uses a pre-built store, e.g. one with a read delay. Profiles added
    /// with [`Self::with_profile`] are ignored in that case.
    pub fn with_store(mut self, store: Arc<InMemoryProfessionalStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> AppState {
        self.build_with_store().0
    }

    pub fn build_with_store(self) -> (AppState, Arc<InMemoryProfessionalStore>) {
        let config = test_config();
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryProfessionalStore::with_profiles(self.profiles)));

        let billing_use_cases = BillingUseCases::new(
            Arc::new(InMemoryUserRepo::with_users(self.users)),
            Arc::new(InMemoryPlanRepo::with_plans(self.plans)),
            store.clone(),
            self.providers,
            config.app_origin.clone(),
        );
        let access_gate = AccessGateUseCases::new(store.clone(), config.gate_read_timeout);
        let profile_use_cases = ProfileUseCases::new(store.clone());

        let app_state = AppState {
            config: Arc::new(config),
            billing_use_cases: Arc::new(billing_use_cases),
            access_gate: Arc::new(access_gate),
            profile_use_cases: Arc::new(profile_use_cases),
        };
        (app_state, store)
    }
}
