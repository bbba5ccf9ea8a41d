use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::billing::UserRepoTrait,
    domain::entities::user::{User, UserRole},
};

#[async_trait]
impl UserRepoTrait for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT id, email, role, created_at FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.map(|r| User {
            id: r.get("id"),
            email: r.get("email"),
            role: r.get::<UserRole, _>("role"),
            created_at: r.get("created_at"),
        }))
    }
}
