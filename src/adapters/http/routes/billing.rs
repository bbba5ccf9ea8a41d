use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::{
        app_error_impl::{HttpResult, Localize},
        app_state::AppState,
        extractors::AuthIdentity,
    },
    application::{dictionaries::subscription_banner, language::UserLanguage},
    domain::entities::{payment_provider::PaymentProvider, plan::Plan},
    use_cases::billing::{CheckoutInput, SubscriptionOverview},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/plans", get(list_plans))
        .route("/subscription", get(get_subscription))
        .route("/checkout", post(create_checkout))
        .route("/checkout/verify", get(verify_checkout))
}

#[derive(Serialize)]
struct PlansResponse {
    plans: Vec<Plan>,
    providers: Vec<PaymentProvider>,
}

/// GET /api/billing/plans
async fn list_plans(
    State(app_state): State<AppState>,
    lang: UserLanguage,
) -> HttpResult<impl IntoResponse> {
    let billing = &app_state.billing_use_cases;
    let plans = billing.list_plans().await.localize(lang)?;
    Ok(Json(PlansResponse {
        plans,
        providers: billing.configured_providers(),
    }))
}

#[derive(Serialize)]
struct SubscriptionResponse {
    #[serde(flatten)]
    overview: SubscriptionOverview,
    banner: String,
}

impl SubscriptionResponse {
    fn new(overview: SubscriptionOverview, lang: UserLanguage) -> Self {
        let banner = subscription_banner(lang, overview.status.as_str());
        Self { overview, banner }
    }
}

/// GET /api/billing/subscription
async fn get_subscription(
    State(app_state): State<AppState>,
    lang: UserLanguage,
    AuthIdentity(identity): AuthIdentity,
) -> HttpResult<impl IntoResponse> {
    let overview = app_state
        .billing_use_cases
        .subscription_overview(identity.user_id)
        .await
        .localize(lang)?;
    Ok(Json(SubscriptionResponse::new(overview, lang)))
}

/// POST /api/billing/checkout
async fn create_checkout(
    State(app_state): State<AppState>,
    lang: UserLanguage,
    AuthIdentity(identity): AuthIdentity,
    Json(input): Json<CheckoutInput>,
) -> HttpResult<impl IntoResponse> {
    let result = app_state
        .billing_use_cases
        .initiate_checkout(&identity, input)
        .await
        .localize(lang)?;
    Ok(Json(result))
}

#[derive(Deserialize)]
struct VerifyQuery {
    provider: PaymentProvider,
    session_id: String,
}

/// GET /api/billing/checkout/verify?provider=card-checkout&session_id=...
///
/// Called from the payment success page. Activates the plan immediately when
/// the provider confirms payment; the webhook for the same checkout is then
/// a duplicate.
async fn verify_checkout(
    State(app_state): State<AppState>,
    lang: UserLanguage,
    AuthIdentity(identity): AuthIdentity,
    Query(query): Query<VerifyQuery>,
) -> HttpResult<impl IntoResponse> {
    let overview = app_state
        .billing_use_cases
        .reconcile_from_redirect(&identity, query.provider, &query.session_id)
        .await
        .localize(lang)?;
    Ok(Json(SubscriptionResponse::new(overview, lang)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;
    use std::sync::Arc;

    use crate::domain::entities::{
        payment_event::PaymentEventKind, payment_provider::PaymentProvider, user::UserRole,
    };
    use crate::test_utils::{
        FakePaymentProvider, TestAppStateBuilder, bearer_token, create_test_event,
        create_test_identity, create_test_plan, create_test_profile, create_test_user,
    };

    fn build_test_router(app_state: AppState) -> Router<()> {
        router().with_state(app_state)
    }

    #[tokio::test]
    async fn plans_are_public() {
        let plan = create_test_plan(|_| {});
        let inactive = create_test_plan(|p| p.active = false);
        let card = Arc::new(FakePaymentProvider::new(PaymentProvider::CardCheckout));
        let app_state = TestAppStateBuilder::new()
            .with_plan(plan.clone())
            .with_plan(inactive)
            .with_provider(card)
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server.get("/plans").await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["plans"].as_array().unwrap().len(), 1);
        assert_eq!(body["plans"][0]["id"], plan.id.to_string());
        assert_eq!(body["providers"], json!(["card-checkout"]));
    }

    #[tokio::test]
    async fn subscription_requires_sign_in() {
        let server = TestServer::new(build_test_router(TestAppStateBuilder::new().build())).unwrap();

        let response = server.get("/subscription").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(response.json::<serde_json::Value>()["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn subscription_without_plan_shows_none_banner() {
        let pro = create_test_identity(UserRole::Professional, |_| {});
        let profile = create_test_profile(|p| p.user_id = pro.user_id);
        let app_state = TestAppStateBuilder::new().with_profile(profile).build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .get("/subscription")
            .authorization_bearer(bearer_token(&pro))
            .add_header(
                axum::http::HeaderName::from_static("accept-language"),
                axum::http::HeaderValue::from_static("en-US"),
            )
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["status"], "none");
        assert_eq!(
            body["banner"],
            "You do not have a plan yet. Pick one to be listed on the marketplace."
        );
    }

    #[tokio::test]
    async fn checkout_with_bad_tax_id_is_rejected() {
        let pro = create_test_identity(UserRole::Professional, |_| {});
        let plan = create_test_plan(|_| {});
        let boleto = Arc::new(FakePaymentProvider::new(PaymentProvider::BoletoPix));
        let app_state = TestAppStateBuilder::new()
            .with_user(create_test_user(UserRole::Professional, |u| u.id = pro.user_id))
            .with_profile(create_test_profile(|p| p.user_id = pro.user_id))
            .with_plan(plan.clone())
            .with_provider(boleto.clone())
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/checkout")
            .authorization_bearer(bearer_token(&pro))
            .json(&json!({
                "plan_id": plan.id,
                "method": "pix",
                "customer": { "name": "Ana Souza", "tax_id": "111.111.111-11", "phone": "11987654321" }
            }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "INVALID_CUSTOMER_DATA");
        assert_eq!(body["field"], "tax_id");
        assert!(boleto.checkout_requests().is_empty());
    }

    #[tokio::test]
    async fn checkout_returns_redirect() {
        let pro = create_test_identity(UserRole::Professional, |_| {});
        let plan = create_test_plan(|_| {});
        let card = Arc::new(FakePaymentProvider::new(PaymentProvider::CardCheckout));
        let app_state = TestAppStateBuilder::new()
            .with_user(create_test_user(UserRole::Professional, |u| u.id = pro.user_id))
            .with_profile(create_test_profile(|p| p.user_id = pro.user_id))
            .with_plan(plan.clone())
            .with_provider(card.clone())
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/checkout")
            .authorization_bearer(bearer_token(&pro))
            .json(&json!({ "plan_id": plan.id, "method": "credit_card" }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["session_ref"], "sess_1");
        assert_eq!(body["redirect_url"], "https://pay.example.com/sess_1");
        assert_eq!(card.checkout_requests().len(), 1);
    }

    #[tokio::test]
    async fn checkout_for_unregistered_professional_is_not_found() {
        let pro = create_test_identity(UserRole::Professional, |_| {});
        let plan = create_test_plan(|_| {});
        let card = Arc::new(FakePaymentProvider::new(PaymentProvider::CardCheckout));
        let app_state = TestAppStateBuilder::new()
            .with_plan(plan.clone())
            .with_provider(card.clone())
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .post("/checkout")
            .authorization_bearer(bearer_token(&pro))
            .json(&json!({ "plan_id": plan.id, "method": "credit_card" }))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<serde_json::Value>()["code"], "NOT_FOUND");
        assert!(card.checkout_requests().is_empty());
    }

    #[tokio::test]
    async fn verify_activates_plan() {
        let pro = create_test_identity(UserRole::Professional, |_| {});
        let profile = create_test_profile(|p| p.user_id = pro.user_id);
        let card = Arc::new(FakePaymentProvider::new(PaymentProvider::CardCheckout));
        card.add_completed_session(
            "cs_paid",
            create_test_event(PaymentEventKind::CheckoutCompleted, Some(pro.user_id), |e| {
                e.provider_ref = "checkout:cs_paid".into();
                e.occurred_at = chrono::Utc::now();
            }),
        );
        let (app_state, store) = TestAppStateBuilder::new()
            .with_profile(profile)
            .with_provider(card)
            .build_with_store();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .get("/checkout/verify")
            .add_query_param("provider", "card-checkout")
            .add_query_param("session_id", "cs_paid")
            .authorization_bearer(bearer_token(&pro))
            .await;

        response.assert_status_ok();
        assert_eq!(response.json::<serde_json::Value>()["status"], "active");
        let state = store.subscription_of(pro.user_id).unwrap();
        assert_eq!(state.last_event_ref.as_deref(), Some("checkout:cs_paid"));
    }

    #[tokio::test]
    async fn verify_unpaid_session_is_conflict() {
        let pro = create_test_identity(UserRole::Professional, |_| {});
        let profile = create_test_profile(|p| p.user_id = pro.user_id);
        let card = Arc::new(FakePaymentProvider::new(PaymentProvider::CardCheckout));
        card.add_pending_session("cs_open");
        let (app_state, store) = TestAppStateBuilder::new()
            .with_profile(profile)
            .with_provider(card)
            .build_with_store();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .get("/checkout/verify")
            .add_query_param("provider", "card-checkout")
            .add_query_param("session_id", "cs_open")
            .authorization_bearer(bearer_token(&pro))
            .await;

        response.assert_status(StatusCode::CONFLICT);
        assert_eq!(
            response.json::<serde_json::Value>()["code"],
            "PAYMENT_NOT_CONFIRMED"
        );
        assert!(store.subscription_of(pro.user_id).is_none());
    }
}
