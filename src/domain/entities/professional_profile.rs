use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use super::subscription_state::SubscriptionState;

/// Public marketplace profile of a professional.
#[derive(Debug, Clone, Serialize)]
pub struct ProfessionalProfile {
    pub user_id: Uuid,
    pub name: Option<String>,
    pub category: Option<String>,
    pub hourly_rate_cents: Option<i64>,
    pub location: Option<String>,
    pub phone: Option<String>,
    /// Owned by the reconciler; profile edits never write it.
    #[serde(skip_serializing)]
    pub subscription: Option<SubscriptionState>,
    pub updated_at: Option<NaiveDateTime>,
}
