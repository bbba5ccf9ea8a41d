use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

/// A subscription plan a professional can buy.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    /// Price identifier at the card checkout provider
    pub external_price_id: Option<String>,
    pub active: bool,
    pub created_at: Option<NaiveDateTime>,
}

impl Plan {
    /// Price formatted the way Asaas expects the `value` field (major units).
    pub fn price_major_units(&self) -> f64 {
        self.price_cents as f64 / 100.0
    }
}
