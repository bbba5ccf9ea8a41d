use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, parse_json_with_fallback},
    app_error::{AppError, AppResult},
    application::use_cases::profile::{ProfessionalProfileRepoTrait, ProfileUpdate},
    domain::entities::{
        professional_profile::ProfessionalProfile, subscription_state::SubscriptionState,
    },
};

fn row_to_profile(row: &sqlx::postgres::PgRow) -> ProfessionalProfile {
    let user_id: Uuid = row.get("user_id");
    let subscription_json: Option<serde_json::Value> = row.get("subscription");
    let subscription: Option<SubscriptionState> = parse_json_with_fallback(
        &subscription_json.unwrap_or(serde_json::Value::Null),
        "subscription",
        "professional",
        &user_id.to_string(),
    );
    ProfessionalProfile {
        user_id,
        name: row.get("name"),
        category: row.get("category"),
        hourly_rate_cents: row.get("hourly_rate_cents"),
        location: row.get("location"),
        phone: row.get("phone"),
        subscription,
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str =
    "user_id, name, category, hourly_rate_cents, location, phone, subscription, updated_at";

#[async_trait]
impl ProfessionalProfileRepoTrait for PostgresPersistence {
    async fn get_by_user_id(&self, user_id: Uuid) -> AppResult<Option<ProfessionalProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM professionals WHERE user_id = $1",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn update_fields(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> AppResult<ProfessionalProfile> {
        // The subscription column is not part of this statement.
        let row = sqlx::query(&format!(
            r#"
            UPDATE professionals SET
                name = COALESCE($2, name),
                category = COALESCE($3, category),
                hourly_rate_cents = COALESCE($4, hourly_rate_cents),
                location = COALESCE($5, location),
                phone = COALESCE($6, phone),
                updated_at = CURRENT_TIMESTAMP
            WHERE user_id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(user_id)
        .bind(&update.name)
        .bind(&update.category)
        .bind(update.hourly_rate_cents)
        .bind(&update.location)
        .bind(&update.phone)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        row.as_ref().map(row_to_profile).ok_or(AppError::NotFound)
    }
}
