//! Application services for SkyCast
//!
//! Local persistence, the saved-location registry, the user profile, and the
//! `AppServices` container that wires them to the weather cache.

pub mod app_services;
pub mod profile;
pub mod registry;
pub mod sqlite_store;
pub mod store;

#[cfg(test)]
mod test_logs;

pub use app_services::AppServices;
pub use profile::{ProfileError, ProfilePatch, ProfileService};
pub use registry::{AddOutcome, LocationRegistry, RegistryError};
pub use sqlite_store::SqliteStore;
pub use store::{Record, RecordStore, StoreError, StoreResult, UserProfile};
