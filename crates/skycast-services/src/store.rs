//! Record store trait and error types.
//!
//! This module defines the `RecordStore` trait that abstracts over the local
//! keyed store holding saved locations and the user profile.

use serde::{Deserialize, Serialize};
use skycast_core::DatabaseError;
use skycast_weather::Location;
use thiserror::Error;

/// Errors that can occur during record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Record was not found.
    #[error("Record not found: {0}")]
    NotFound(i64),

    /// Validation error (e.g., empty required field).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Another record already holds a value that must be unique.
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Underlying database failure.
    #[error("Storage error: {0}")]
    Database(#[from] DatabaseError),
}

impl StoreError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            StoreError::NotFound(_) => "The saved item no longer exists.",
            StoreError::Validation(_) => "Some fields are invalid. Please check and try again.",
            StoreError::Duplicate(_) => "That place is already saved.",
            StoreError::Database(e) => e.user_message(),
        }
    }
}

/// Result type for record store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// A value kept in a record store, keyed by an auto-assigned integer id.
pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> Option<i64>;

    fn with_id(self, id: i64) -> Self;
}

/// Trait for keyed record stores.
///
/// One store instance may hold several collections; each record type gets its
/// own `RecordStore<R>` implementation.
pub trait RecordStore<R: Record>: Send + Sync {
    /// Insert a record and return its newly assigned id.
    ///
    /// Any id already set on `record` is ignored.
    ///
    /// # Errors
    /// Returns `StoreError::Duplicate` if the record clashes with a stored
    /// one on a unique field.
    fn add(&self, record: &R) -> StoreResult<i64>;

    /// All records, oldest first, with ids set.
    fn get_all(&self) -> StoreResult<Vec<R>>;

    /// Get a record by id.
    ///
    /// Returns `None` if the record doesn't exist.
    fn get(&self, id: i64) -> StoreResult<Option<R>>;

    /// Replace the stored fields of record `id`.
    ///
    /// # Errors
    /// Returns `StoreError::NotFound` if the record doesn't exist.
    fn update(&self, id: i64, record: &R) -> StoreResult<()>;

    /// Delete a record. Deleting a missing id is not an error.
    fn delete(&self, id: i64) -> StoreResult<()>;

    /// Delete every record in the collection.
    fn clear(&self) -> StoreResult<()>;

    fn count(&self) -> StoreResult<usize> {
        Ok(self.get_all()?.len())
    }

    /// Insert `record` if it has no id yet, otherwise update it in place.
    /// Returns the record with its id set.
    fn save(&self, record: R) -> StoreResult<R> {
        match record.id() {
            Some(id) => {
                self.update(id, &record)?;
                Ok(record)
            }
            None => {
                let id = self.add(&record)?;
                Ok(record.with_id(id))
            }
        }
    }
}

impl Record for Location {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

/// The single local user profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

impl Record for UserProfile {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

/// Validate a location before it is written.
///
/// # Errors
/// Returns `StoreError::Validation` if the city or country is blank.
pub fn validate_location(location: &Location) -> StoreResult<()> {
    if location.city.trim().is_empty() {
        return Err(StoreError::validation("City cannot be empty"));
    }
    if location.country.trim().is_empty() {
        return Err(StoreError::validation("Country cannot be empty"));
    }
    Ok(())
}
