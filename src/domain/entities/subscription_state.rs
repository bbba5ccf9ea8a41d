use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{payment_provider::PaymentProvider, payment_status::LastPaymentStatus};

/// How many applied provider references are kept for deduplication.
pub const RECENT_EVENT_REFS: usize = 20;

/// Subscription record embedded in a professional's profile.
///
/// Stored as a JSON document so older records with missing keys still load.
/// `current_period_end` is the single source of truth for entitlement; the
/// `active` flag mirrors what the provider last told us and is informational.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriptionState {
    pub active: bool,
    pub plan_id: Option<Uuid>,
    pub plan_name: Option<String>,
    pub provider: Option<PaymentProvider>,
    pub external_customer_id: Option<String>,
    pub external_subscription_id: Option<String>,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub last_payment_status: LastPaymentStatus,
    pub canceled_at: Option<DateTime<Utc>>,
    pub last_event_ref: Option<String>,
    pub last_event_at: Option<DateTime<Utc>>,
    /// Most recent applied references, oldest first.
    pub recent_event_refs: Vec<String>,
    pub manually_granted_by: Option<Uuid>,
}

impl SubscriptionState {
    /// Entitled while the paid period has not elapsed, regardless of `active`.
    pub fn is_entitled_at(&self, now: DateTime<Utc>) -> bool {
        self.current_period_end.is_some_and(|end| end > now)
    }

    /// Whether an event with this reference was already applied. Providers
    /// may redeliver an old reference after newer events have landed.
    pub fn has_applied(&self, event_ref: &str) -> bool {
        self.last_event_ref.as_deref() == Some(event_ref)
            || self.recent_event_refs.iter().any(|r| r == event_ref)
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled_at.is_some()
    }

    /// True when an event older than the last applied one arrives.
    pub fn is_stale(&self, occurred_at: DateTime<Utc>) -> bool {
        self.last_event_at.is_some_and(|last| occurred_at < last)
    }

    /// Applies a patch on top of the stored document, key by key.
    ///
    /// Keys the patch does not mention keep their stored value. This mirrors
    /// the `jsonb || jsonb` merge the Postgres repository performs.
    pub fn merged(current: Option<&Self>, patch: &SubscriptionPatch) -> Result<Self, serde_json::Error> {
        let mut base = match current {
            Some(state) => serde_json::to_value(state)?,
            None => serde_json::Value::Object(Default::default()),
        };
        let patch_value = serde_json::to_value(patch)?;
        if let (Some(base_obj), serde_json::Value::Object(patch_obj)) =
            (base.as_object_mut(), patch_value)
        {
            base_obj.extend(patch_obj);
        }
        serde_json::from_value(base)
    }
}

/// Field-scoped update to a [`SubscriptionState`].
///
/// `None` leaves the stored key untouched. For nullable keys `Some(None)`
/// writes an explicit null.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubscriptionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<PaymentProvider>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_start: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_payment_status: Option<LastPaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canceled_at: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_event_refs: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manually_granted_by: Option<Option<Uuid>>,
}

impl SubscriptionPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Records which event produced this patch, appending it to the
    /// bounded list of applied references carried over from `current`.
    pub fn recording(mut self, current: Option<&SubscriptionState>, event_ref: impl Into<String>) -> Self {
        let event_ref = event_ref.into();
        let mut refs = current
            .map(|s| s.recent_event_refs.clone())
            .unwrap_or_default();
        refs.retain(|r| r != &event_ref);
        refs.push(event_ref.clone());
        if refs.len() > RECENT_EVENT_REFS {
            refs.drain(..refs.len() - RECENT_EVENT_REFS);
        }
        self.recent_event_refs = Some(refs);
        self.last_event_ref = Some(event_ref);
        self
    }

    /// Like [`Self::recording`], and also moves the ordering watermark to
    /// the provider timestamp.
    pub fn stamped(
        self,
        current: Option<&SubscriptionState>,
        event_ref: impl Into<String>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        let mut patch = self.recording(current, event_ref);
        patch.last_event_at = Some(occurred_at);
        patch
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
