//! Local user profile (a single stored record).

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::store::{RecordStore, StoreError, UserProfile};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ProfileError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ProfileError::Store(e) => e.user_message(),
        }
    }
}

/// Partial profile update; only `Some` fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl ProfilePatch {
    fn apply_to(self, profile: &mut UserProfile) {
        if let Some(name) = self.name {
            profile.name = name;
        }
        if let Some(email) = self.email {
            profile.email = email;
        }
        if let Some(phone) = self.phone {
            profile.phone = phone;
        }
        if let Some(avatar) = self.avatar {
            profile.avatar = Some(avatar);
        }
    }
}

/// Owns the in-memory profile and keeps it in sync with the store.
pub struct ProfileService {
    store: Arc<dyn RecordStore<UserProfile>>,
    profile: UserProfile,
}

impl ProfileService {
    pub fn new(store: Arc<dyn RecordStore<UserProfile>>) -> Self {
        Self {
            store,
            profile: UserProfile::default(),
        }
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    /// Id of the stored record, once one exists
    pub fn profile_id(&self) -> Option<i64> {
        self.profile.id
    }

    /// Read the stored profile, if any, into memory.
    pub async fn load(&mut self) -> Result<(), ProfileError> {
        let stored = self
            .store
            .get_all()
            .inspect_err(|e| tracing::error!("Failed to load profile: {}", e))?;
        if let Some(stored) = stored.into_iter().next() {
            tracing::debug!("Loaded profile {:?}", stored.id);
            self.profile = stored;
        }
        Ok(())
    }

    /// Merge `patch` into the profile and persist it.
    ///
    /// Creates the record on first use and updates it in place afterwards.
    /// The in-memory profile only changes once the write has succeeded.
    pub async fn update(&mut self, patch: ProfilePatch) -> Result<(), ProfileError> {
        let mut updated = self.profile.clone();
        patch.apply_to(&mut updated);

        let created = updated.id.is_none();
        let saved = self
            .store
            .save(updated)
            .inspect_err(|e| tracing::error!("Failed to save profile: {}", e))?;
        if created {
            tracing::info!("Created profile {:?}", saved.id);
        } else {
            tracing::info!("Updated profile {:?}", saved.id);
        }

        self.profile = saved;
        Ok(())
    }
}
