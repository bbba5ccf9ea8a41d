use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, parse_json_with_fallback},
    app_error::{AppError, AppResult},
    application::use_cases::subscription_reconciler::{PatchOutcome, SubscriptionStateRepoTrait},
    domain::entities::subscription_state::{SubscriptionPatch, SubscriptionState},
};

#[async_trait]
impl SubscriptionStateRepoTrait for PostgresPersistence {
    async fn get_subscription_state(&self, user_id: Uuid) -> AppResult<Option<SubscriptionState>> {
        let row = sqlx::query("SELECT subscription FROM professionals WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?
            .ok_or(AppError::NotFound)?;
        let json: Option<serde_json::Value> = row.get("subscription");
        Ok(parse_json_with_fallback(
            &json.unwrap_or(serde_json::Value::Null),
            "subscription",
            "professional",
            &user_id.to_string(),
        ))
    }

    async fn patch_subscription_state(
        &self,
        user_id: Uuid,
        patch: &SubscriptionPatch,
        occurred_at: DateTime<Utc>,
    ) -> AppResult<PatchOutcome> {
        let patch_json = patch
            .to_json()
            .map_err(|e| AppError::Internal(e.to_string()))?;

        // Single statement: merge the touched keys and refuse to overwrite a
        // newer event. Concurrent deliveries serialize on the row lock.
        let updated = sqlx::query(
            r#"
            UPDATE professionals
            SET subscription = COALESCE(subscription, '{}'::jsonb) || $2::jsonb,
                updated_at = CURRENT_TIMESTAMP
            WHERE user_id = $1
              AND (
                subscription->>'last_event_at' IS NULL
                OR (subscription->>'last_event_at')::timestamptz <= $3
              )
            RETURNING user_id
            "#,
        )
        .bind(user_id)
        .bind(&patch_json)
        .bind(occurred_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;

        if updated.is_some() {
            return Ok(PatchOutcome::Applied);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM professionals WHERE user_id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(AppError::from)?;
        if exists {
            Ok(PatchOutcome::Stale)
        } else {
            Err(AppError::NotFound)
        }
    }
}
