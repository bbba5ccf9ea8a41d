use sqlx::PgPool;

use crate::app_error::AppError;

const MAX_JSON_LOG_LEN: usize = 200;

/// Parse a JSONB column into the target type, logging a warning on failure.
///
/// SQL NULL yields the default without logging. Corrupt documents also
/// yield the default so one bad row cannot take a request down.
pub fn parse_json_with_fallback<T: serde::de::DeserializeOwned + Default>(
    json: &serde_json::Value,
    field_name: &str,
    entity_type: &str,
    entity_id: &str,
) -> T {
    if json.is_null() {
        return T::default();
    }

    serde_json::from_value(json.clone()).unwrap_or_else(|err| {
        let raw_str = json.to_string();
        let truncated = if raw_str.len() > MAX_JSON_LOG_LEN {
            let cut = (0..=MAX_JSON_LOG_LEN)
                .rev()
                .find(|i| raw_str.is_char_boundary(*i))
                .unwrap_or(0);
            format!("{}...", &raw_str[..cut])
        } else {
            raw_str
        };

        tracing::warn!(
            field = field_name,
            entity_type = entity_type,
            entity_id = entity_id,
            raw_json = %truncated,
            error = %err,
            "Failed to parse JSON field, using default value"
        );
        T::default()
    })
}

pub mod plan;
pub mod professional_profile;
pub mod subscription_state;
pub mod user;

#[derive(Clone)]
pub struct PostgresPersistence {
    pool: PgPool,
}

impl PostgresPersistence {
    pub fn new(pool: PgPool) -> Self {
        PostgresPersistence { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound,
            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();
                if msg.contains("duplicate key") || msg.contains("unique constraint") {
                    AppError::InvalidInput("A record with this value already exists".into())
                } else if msg.contains("violates foreign key") {
                    AppError::InvalidInput("Referenced record not found".into())
                } else {
                    tracing::error!(error = ?err, "Database error");
                    AppError::Database("Database operation failed".into())
                }
            }
            _ => {
                tracing::error!(error = ?err, "Database error");
                AppError::Database("Database operation failed".into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::subscription_state::SubscriptionState;

    #[test]
    fn parse_subscription_document() {
        let json = serde_json::json!({
            "active": true,
            "current_period_end": "2026-04-10T12:00:00Z",
            "last_payment_status": "succeeded"
        });
        let state: Option<SubscriptionState> =
            parse_json_with_fallback(&json, "subscription", "professional", "123");
        let state = state.unwrap();
        assert!(state.active);
        assert!(state.current_period_end.is_some());
    }

    #[test]
    fn parse_sql_null_returns_none() {
        let state: Option<SubscriptionState> =
            parse_json_with_fallback(&serde_json::Value::Null, "subscription", "professional", "123");
        assert!(state.is_none());
    }

    #[test]
    fn parse_corrupt_document_returns_none() {
        let json = serde_json::json!({ "current_period_end": "next tuesday" });
        let state: Option<SubscriptionState> =
            parse_json_with_fallback(&json, "subscription", "professional", "123");
        assert!(state.is_none());
    }

    #[test]
    fn parse_long_multibyte_payload_does_not_panic() {
        let json = serde_json::json!({ "current_period_end": "ã".repeat(300) });
        let state: Option<SubscriptionState> =
            parse_json_with_fallback(&json, "subscription", "professional", "123");
        assert!(state.is_none());
    }
}
