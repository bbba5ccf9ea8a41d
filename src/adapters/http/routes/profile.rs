use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use crate::{
    adapters::http::{
        app_error_impl::{HttpResult, Localize},
        app_state::AppState,
        extractors::AuthIdentity,
    },
    application::language::UserLanguage,
    use_cases::profile::ProfileUpdate,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile).patch(update_profile))
}

/// GET /api/profile
async fn get_profile(
    State(app_state): State<AppState>,
    lang: UserLanguage,
    AuthIdentity(identity): AuthIdentity,
) -> HttpResult<impl IntoResponse> {
    let profile = app_state
        .profile_use_cases
        .get_profile(&identity)
        .await
        .localize(lang)?;
    Ok(Json(profile))
}

/// PATCH /api/profile
async fn update_profile(
    State(app_state): State<AppState>,
    lang: UserLanguage,
    AuthIdentity(identity): AuthIdentity,
    Json(update): Json<ProfileUpdate>,
) -> HttpResult<impl IntoResponse> {
    let profile = app_state
        .profile_use_cases
        .update_profile(&identity, update)
        .await
        .localize(lang)?;
    Ok(Json(profile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;

    use crate::domain::entities::user::UserRole;
    use crate::test_utils::{
        TestAppStateBuilder, bearer_token, create_test_identity, create_test_profile,
        create_test_state,
    };

    fn build_test_router(app_state: AppState) -> Router<()> {
        router().with_state(app_state)
    }

    #[tokio::test]
    async fn profile_does_not_expose_subscription() {
        let pro = create_test_identity(UserRole::Professional, |_| {});
        let profile = create_test_profile(|p| {
            p.user_id = pro.user_id;
            p.subscription = Some(create_test_state(|_| {}));
        });
        let app_state = TestAppStateBuilder::new().with_profile(profile).build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .get("/profile")
            .authorization_bearer(bearer_token(&pro))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["name"], "Ana Souza");
        assert!(body.get("subscription").is_none());
    }

    #[tokio::test]
    async fn patch_keeps_subscription() {
        let pro = create_test_identity(UserRole::Professional, |_| {});
        let state = create_test_state(|_| {});
        let profile = create_test_profile(|p| {
            p.user_id = pro.user_id;
            p.subscription = Some(state.clone());
        });
        let (app_state, store) = TestAppStateBuilder::new()
            .with_profile(profile)
            .build_with_store();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .patch("/profile")
            .authorization_bearer(bearer_token(&pro))
            .json(&json!({ "location": "Campinas", "hourly_rate_cents": 11000 }))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["location"], "Campinas");
        assert_eq!(body["hourly_rate_cents"], 11000);
        assert_eq!(store.subscription_of(pro.user_id), Some(state));
    }

    #[tokio::test]
    async fn client_cannot_edit_profile() {
        let client = create_test_identity(UserRole::Client, |_| {});
        let server = TestServer::new(build_test_router(TestAppStateBuilder::new().build())).unwrap();

        let response = server
            .patch("/profile")
            .authorization_bearer(bearer_token(&client))
            .json(&json!({ "name": "Bruno" }))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn empty_patch_is_bad_request() {
        let pro = create_test_identity(UserRole::Professional, |_| {});
        let app_state = TestAppStateBuilder::new()
            .with_profile(create_test_profile(|p| p.user_id = pro.user_id))
            .build();
        let server = TestServer::new(build_test_router(app_state)).unwrap();

        let response = server
            .patch("/profile")
            .authorization_bearer(bearer_token(&pro))
            .json(&json!({}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<serde_json::Value>()["code"], "INVALID_INPUT");
    }
}
