use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::validators::normalize_phone,
    domain::entities::{professional_profile::ProfessionalProfile, user::{Identity, UserRole}},
};

/// Editable profile fields. The subscription is not editable here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub hourly_rate_cents: Option<i64>,
    pub location: Option<String>,
    pub phone: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.hourly_rate_cents.is_none()
            && self.location.is_none()
            && self.phone.is_none()
    }
}

#[async_trait]
pub trait ProfessionalProfileRepoTrait: Send + Sync {
    async fn get_by_user_id(&self, user_id: Uuid) -> AppResult<Option<ProfessionalProfile>>;

    /// Writes only the provided fields; never touches the subscription.
    async fn update_fields(
        &self,
        user_id: Uuid,
        update: &ProfileUpdate,
    ) -> AppResult<ProfessionalProfile>;
}

#[derive(Clone)]
pub struct ProfileUseCases {
    repo: Arc<dyn ProfessionalProfileRepoTrait>,
}

impl ProfileUseCases {
    pub fn new(repo: Arc<dyn ProfessionalProfileRepoTrait>) -> Self {
        Self { repo }
    }

    pub async fn get_profile(&self, identity: &Identity) -> AppResult<ProfessionalProfile> {
        if identity.role != UserRole::Professional {
            return Err(AppError::Forbidden);
        }
        self.repo
            .get_by_user_id(identity.user_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn update_profile(
        &self,
        identity: &Identity,
        update: ProfileUpdate,
    ) -> AppResult<ProfessionalProfile> {
        if identity.role != UserRole::Professional {
            return Err(AppError::Forbidden);
        }
        if update.is_empty() {
            return Err(AppError::InvalidInput("No fields to update".into()));
        }
        let update = normalize_update(update)?;
        let profile = self.repo.update_fields(identity.user_id, &update).await?;
        tracing::info!(user_id = %identity.user_id, "Professional profile updated");
        Ok(profile)
    }
}

fn normalize_update(update: ProfileUpdate) -> AppResult<ProfileUpdate> {
    let trimmed = |v: Option<String>, field: &str| -> AppResult<Option<String>> {
        match v.map(|s| s.trim().to_string()) {
            Some(s) if s.is_empty() => Err(AppError::InvalidInput(format!("{} cannot be empty", field))),
            other => Ok(other),
        }
    };
    if update.hourly_rate_cents.is_some_and(|c| c < 0) {
        return Err(AppError::InvalidInput("hourly_rate_cents must not be negative".into()));
    }
    let phone = match update.phone {
        Some(raw) => Some(
            normalize_phone(&raw).ok_or_else(|| AppError::InvalidInput("Invalid phone".into()))?,
        ),
        None => None,
    };
    Ok(ProfileUpdate {
        name: trimmed(update.name, "name")?,
        category: trimmed(update.category, "category")?,
        hourly_rate_cents: update.hourly_rate_cents,
        location: trimmed(update.location, "location")?,
        phone,
    })
}
