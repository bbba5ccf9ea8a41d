use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::billing::PlanRepoTrait,
    domain::entities::plan::Plan,
};

fn row_to_plan(row: &sqlx::postgres::PgRow) -> Plan {
    Plan {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        price_cents: row.get("price_cents"),
        currency: row.get("currency"),
        external_price_id: row.get("external_price_id"),
        active: row.get("active"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str =
    "id, name, description, price_cents, currency, external_price_id, active, created_at";

#[async_trait]
impl PlanRepoTrait for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Plan>> {
        let row = sqlx::query(&format!("SELECT {} FROM plans WHERE id = $1", SELECT_COLS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_plan))
    }

    async fn list_active(&self) -> AppResult<Vec<Plan>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM plans WHERE active = TRUE ORDER BY price_cents ASC, name ASC",
            SELECT_COLS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_plan).collect())
    }
}
