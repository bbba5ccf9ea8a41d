pub mod access;
pub mod admin;
pub mod billing;
pub mod profile;
pub mod webhooks;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(access::router())
        .merge(profile::router())
        .nest(
            "/billing",
            billing::router().nest("/webhooks", webhooks::router()),
        )
        .nest("/admin", admin::router())
}
