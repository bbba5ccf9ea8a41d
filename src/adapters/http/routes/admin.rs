use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    adapters::http::{
        app_error_impl::{HttpResult, Localize},
        app_state::AppState,
        extractors::AuthIdentity,
    },
    application::language::UserLanguage,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/subscriptions/{user_id}/activate", post(activate_subscription))
}

#[derive(Deserialize)]
struct ActivateRequest {
    plan_id: Uuid,
}

/// POST /api/admin/subscriptions/{user_id}/activate
async fn activate_subscription(
    State(app_state): State<AppState>,
    lang: UserLanguage,
    AuthIdentity(admin): AuthIdentity,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<ActivateRequest>,
) -> HttpResult<impl IntoResponse> {
    let overview = app_state
        .billing_use_cases
        .activate_manually(&admin, user_id, payload.plan_id)
        .await
        .localize(lang)?;
    Ok(Json(overview))
}
