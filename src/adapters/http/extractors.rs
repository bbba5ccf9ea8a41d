//! Request extractors for the caller's identity and language.
//!
//! Tokens are issued by the external auth provider and carried as
//! `Authorization: Bearer <jwt>`.

use axum::{
    extract::FromRequestParts,
    http::{header::ACCEPT_LANGUAGE, request::Parts},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use crate::{
    adapters::http::{app_error_impl::LocalizedError, app_state::AppState},
    app_error::AppError,
    application::{jwt, language::UserLanguage},
    domain::entities::user::Identity,
};

/// Identity when a valid token is present; anonymous otherwise.
pub struct MaybeIdentity(pub Option<Identity>);

/// Identity of a signed-in caller; rejects anonymous requests with 401.
pub struct AuthIdentity(pub Identity);

async fn identity_from_parts(parts: &mut Parts, state: &AppState) -> Option<Identity> {
    let TypedHeader(Authorization(bearer)) =
        TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
            .await
            .ok()?;

    jwt::verify(bearer.token(), &state.config.jwt_secret)
        .and_then(|claims| claims.into_identity())
        .ok()
}

impl FromRequestParts<AppState> for MaybeIdentity {
    type Rejection = LocalizedError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeIdentity(identity_from_parts(parts, state).await))
    }
}

impl FromRequestParts<AppState> for AuthIdentity {
    type Rejection = LocalizedError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let lang = language_of(parts);
        identity_from_parts(parts, state)
            .await
            .map(AuthIdentity)
            .ok_or_else(|| LocalizedError::new(AppError::Unauthorized, lang))
    }
}

fn language_of(parts: &Parts) -> UserLanguage {
    UserLanguage::from_raw(
        parts
            .headers
            .get(ACCEPT_LANGUAGE)
            .and_then(|v| v.to_str().ok()),
    )
}

impl<S: Send + Sync> FromRequestParts<S> for UserLanguage {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(language_of(parts))
    }
}
