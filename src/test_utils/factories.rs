//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible defaults.
//! Use the closure parameter to override specific fields as needed.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::{
    application::ports::payment_provider::CustomerData,
    domain::entities::{
        payment_event::{NormalizedPaymentEvent, PaymentEventKind},
        payment_provider::PaymentProvider,
        payment_status::LastPaymentStatus,
        plan::Plan,
        professional_profile::ProfessionalProfile,
        subscription_state::SubscriptionState,
        user::{Identity, User, UserRole},
    },
};

/// Fixed reference instant used across tests.
pub fn test_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap()
}

fn test_datetime() -> NaiveDateTime {
    test_time().naive_utc()
}

pub fn create_test_identity(role: UserRole, overrides: impl FnOnce(&mut Identity)) -> Identity {
    let mut identity = Identity::new(Uuid::new_v4(), "pro@example.com", role);
    overrides(&mut identity);
    identity
}

pub fn create_test_user(role: UserRole, overrides: impl FnOnce(&mut User)) -> User {
    let mut user = User {
        id: Uuid::new_v4(),
        email: "pro@example.com".to_string(),
        role,
        created_at: Some(test_datetime()),
    };
    overrides(&mut user);
    user
}

/// Create an active monthly plan.
pub fn create_test_plan(overrides: impl FnOnce(&mut Plan)) -> Plan {
    let mut plan = Plan {
        id: Uuid::new_v4(),
        name: "Profissional".to_string(),
        description: Some("Listagem no marketplace".to_string()),
        price_cents: 4990,
        currency: "brl".to_string(),
        external_price_id: Some("price_test_123".to_string()),
        active: true,
        created_at: Some(test_datetime()),
    };
    overrides(&mut plan);
    plan
}

/// Create a subscription paid through the card provider, entitled until
/// two weeks after [`test_time`].
pub fn create_test_state(overrides: impl FnOnce(&mut SubscriptionState)) -> SubscriptionState {
    let mut state = SubscriptionState {
        active: true,
        plan_id: Some(Uuid::new_v4()),
        plan_name: Some("Profissional".to_string()),
        provider: Some(PaymentProvider::CardCheckout),
        external_customer_id: Some("cus_test_123".to_string()),
        external_subscription_id: Some("sub_test_123".to_string()),
        current_period_start: Some(test_time() - Duration::days(16)),
        current_period_end: Some(test_time() + Duration::days(14)),
        last_payment_status: LastPaymentStatus::Succeeded,
        canceled_at: None,
        last_event_ref: None,
        last_event_at: None,
        recent_event_refs: Vec::new(),
        manually_granted_by: None,
    };
    overrides(&mut state);
    state
}

pub fn create_test_event(
    kind: PaymentEventKind,
    user_id: Option<Uuid>,
    overrides: impl FnOnce(&mut NormalizedPaymentEvent),
) -> NormalizedPaymentEvent {
    let mut event = NormalizedPaymentEvent::new(
        kind,
        PaymentProvider::CardCheckout,
        user_id,
        format!("evt_{}", Uuid::new_v4()),
        test_time(),
        kind.as_str(),
    );
    event.plan_id = Some(Uuid::new_v4());
    event.plan_name = Some("Profissional".to_string());
    event.external_customer_id = Some("cus_test_123".to_string());
    event.external_subscription_id = Some("sub_test_123".to_string());
    overrides(&mut event);
    event
}

pub fn create_test_profile(overrides: impl FnOnce(&mut ProfessionalProfile)) -> ProfessionalProfile {
    let mut profile = ProfessionalProfile {
        user_id: Uuid::new_v4(),
        name: Some("Ana Souza".to_string()),
        category: Some("eletricista".to_string()),
        hourly_rate_cents: Some(9000),
        location: Some("São Paulo".to_string()),
        phone: Some("11987654321".to_string()),
        subscription: None,
        updated_at: Some(test_datetime()),
    };
    overrides(&mut profile);
    profile
}

pub fn create_test_customer_data(overrides: impl FnOnce(&mut CustomerData)) -> CustomerData {
    let mut customer = CustomerData {
        name: "Ana Souza".to_string(),
        tax_id: "529.982.247-25".to_string(),
        phone: "(11) 98765-4321".to_string(),
    };
    overrides(&mut customer);
    customer
}
