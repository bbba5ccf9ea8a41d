use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
};
use serde::Serialize;

use crate::{
    adapters::http::app_state::AppState, app_error::AppError,
    domain::entities::payment_provider::PaymentProvider,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/card-checkout", post(card_checkout_webhook))
        .route("/boleto-pix", post(boleto_pix_webhook))
}

#[derive(Serialize)]
struct WebhookAck {
    acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

/// Header carrying the delivery's authenticity proof.
fn signature_header(provider: PaymentProvider) -> &'static str {
    match provider {
        PaymentProvider::CardCheckout => "stripe-signature",
        PaymentProvider::BoletoPix => "asaas-access-token",
    }
}

/// Returns `true` if the error is transient, meaning the provider should
/// redeliver. Everything else is acknowledged so it is not retried forever.
fn is_retryable_error(error: &AppError) -> bool {
    match error {
        AppError::Database(_) | AppError::Internal(_) | AppError::ProviderUnavailable(_) => true,

        AppError::InvalidInput(_)
        | AppError::Unauthorized
        | AppError::Forbidden
        | AppError::NotFound
        | AppError::InvalidSignature
        | AppError::SessionNotFound
        | AppError::SessionIncomplete
        | AppError::InvalidPlan
        | AppError::InvalidCustomerData(_)
        | AppError::ProviderNotConfigured => false,
    }
}

/// POST /api/billing/webhooks/card-checkout
async fn card_checkout_webhook(
    state: State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    handle_webhook(state, PaymentProvider::CardCheckout, headers, body).await
}

/// POST /api/billing/webhooks/boleto-pix
async fn boleto_pix_webhook(
    state: State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    handle_webhook(state, PaymentProvider::BoletoPix, headers, body).await
}

async fn handle_webhook(
    State(app_state): State<AppState>,
    provider: PaymentProvider,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<WebhookAck>) {
    let signature = headers
        .get(signature_header(provider))
        .and_then(|v| v.to_str().ok());

    let result = app_state
        .billing_use_cases
        .reconcile_webhook(provider, &body, signature)
        .await;

    match result {
        Ok(outcome) => (
            StatusCode::OK,
            Json(WebhookAck {
                acknowledged: true,
                outcome: Some(outcome.as_str()),
                code: None,
            }),
        ),
        Err(error @ (AppError::InvalidSignature | AppError::ProviderNotConfigured)) => {
            tracing::warn!(provider = %provider, error = %error, "Webhook rejected");
            (
                StatusCode::BAD_REQUEST,
                Json(WebhookAck {
                    acknowledged: false,
                    outcome: None,
                    code: Some(error.code().as_str()),
                }),
            )
        }
        Err(error) if is_retryable_error(&error) => {
            tracing::error!(
                provider = %provider,
                error = %error,
                retryable = true,
                "Webhook processing failed"
            );
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WebhookAck {
                    acknowledged: false,
                    outcome: None,
                    code: Some(error.code().as_str()),
                }),
            )
        }
        Err(error) => {
            tracing::warn!(
                provider = %provider,
                error = %error,
                retryable = false,
                "Webhook not processable, acknowledging"
            );
            (
                StatusCode::OK,
                Json(WebhookAck {
                    acknowledged: true,
                    outcome: None,
                    code: Some(error.code().as_str()),
                }),
            )
        }
    }
}
