use crate::{
    app_error::{AppError, AppResult, ErrorCode},
    application::{
        dictionaries::{customer_field_message, error_message},
        language::UserLanguage,
    },
};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// An error paired with the caller's language, rendered as
/// `{ "code": ..., "message": ... }`.
#[derive(Debug)]
pub struct LocalizedError {
    pub error: AppError,
    pub lang: UserLanguage,
}

impl LocalizedError {
    pub fn new(error: AppError, lang: UserLanguage) -> Self {
        Self { error, lang }
    }
}

pub type HttpResult<T> = Result<T, LocalizedError>;

pub trait Localize<T> {
    fn localize(self, lang: UserLanguage) -> HttpResult<T>;
}

impl<T> Localize<T> for AppResult<T> {
    fn localize(self, lang: UserLanguage) -> HttpResult<T> {
        self.map_err(|error| LocalizedError::new(error, lang))
    }
}

impl From<AppError> for LocalizedError {
    fn from(error: AppError) -> Self {
        Self::new(error, UserLanguage::default())
    }
}

pub fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::InvalidInput(_)
        | AppError::InvalidSignature
        | AppError::InvalidPlan
        | AppError::InvalidCustomerData(_)
        | AppError::ProviderNotConfigured => StatusCode::BAD_REQUEST,
        AppError::Unauthorized => StatusCode::UNAUTHORIZED,
        AppError::Forbidden => StatusCode::FORBIDDEN,
        AppError::NotFound => StatusCode::NOT_FOUND,
        AppError::SessionNotFound | AppError::SessionIncomplete => StatusCode::CONFLICT,
        AppError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for LocalizedError {
    fn into_response(self) -> Response {
        let status = status_for(&self.error);
        // Log the error before it gets converted into a status response.
        if status.is_server_error() {
            tracing::error!(error = ?self.error, "Request failed");
        } else {
            tracing::debug!(error = ?self.error, "Request rejected");
        }

        let code = self.error.code();
        let message = match self.error {
            // Validation detail is safe to echo back.
            AppError::InvalidInput(msg) => msg,
            AppError::InvalidCustomerData(field) => {
                return error_resp(
                    status,
                    code,
                    customer_field_message(self.lang, &field),
                    Some(field),
                );
            }
            // Provider and database detail stays in the logs.
            _ => error_message(self.lang, code),
        };
        error_resp(status, code, message, None)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        LocalizedError::from(self).into_response()
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: String, field: Option<String>) -> Response {
    let body = match field {
        Some(field) => serde_json::json!({ "code": code.as_str(), "message": message, "field": field }),
        None => serde_json::json!({ "code": code.as_str(), "message": message }),
    };
    (status, Json(body)).into_response()
}
