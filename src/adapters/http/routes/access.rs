use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::{app_state::AppState, extractors::MaybeIdentity},
    domain::entities::access::AccessDecision,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/access", get(decide))
}

#[derive(Deserialize)]
struct AccessQuery {
    path: String,
}

#[derive(Serialize)]
struct AccessResponse {
    decision: AccessDecision,
    redirect_to: Option<&'static str>,
}

/// GET /api/access?path=/marketplace
///
/// Never fails: an unreadable subscription yields a redirect, not an error.
async fn decide(
    State(app_state): State<AppState>,
    MaybeIdentity(identity): MaybeIdentity,
    Query(query): Query<AccessQuery>,
) -> impl IntoResponse {
    let decision = app_state
        .access_gate
        .decide_for_path(identity.as_ref(), &query.path)
        .await;

    Json(AccessResponse {
        decision,
        redirect_to: decision.redirect_target(),
    })
}
