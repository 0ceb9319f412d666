//! Saved-location registry.
//!
//! Owns the ordered in-memory list of saved locations (most recent first) and
//! keeps it in step with the record store and the weather cache.

use skycast_weather::{validate_coordinates, ForecastCache, Location, WeatherError};
use std::sync::Arc;
use thiserror::Error;

use crate::store::{Record, RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("Unknown location: {0}")]
    UnknownLocation(i64),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Weather(#[from] WeatherError),
}

impl RegistryError {
    pub fn user_message(&self) -> &'static str {
        match self {
            RegistryError::InvalidCoordinates { .. } => "Invalid location coordinates.",
            RegistryError::UnknownLocation(_) => "That location is no longer saved.",
            RegistryError::Store(e) => e.user_message(),
            RegistryError::Weather(e) => e.user_message(),
        }
    }
}

/// Outcome of adding a location
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// Persisted, listed first, and current weather cached
    Added(Location),
    /// A saved location already has these coordinates; nothing changed
    Duplicate,
}

pub struct LocationRegistry<C: ForecastCache> {
    store: Arc<dyn RecordStore<Location>>,
    cache: Arc<C>,
    locations: Vec<Location>,
    selected: Option<i64>,
}

impl<C: ForecastCache> LocationRegistry<C> {
    pub fn new(store: Arc<dyn RecordStore<Location>>, cache: Arc<C>) -> Self {
        Self {
            store,
            cache,
            locations: Vec::new(),
            selected: None,
        }
    }

    /// Saved locations, most recent first
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == Some(id))
    }

    pub fn selected(&self) -> Option<i64> {
        self.selected
    }

    pub fn selected_location(&self) -> Option<&Location> {
        self.selected.and_then(|id| self.get(id))
    }

    /// Select the location whose details are shown, or clear the selection.
    pub fn set_selected(&mut self, id: Option<i64>) {
        self.selected = id;
    }

    /// Replace the in-memory list with the persisted locations, newest first.
    pub async fn load(&mut self) -> Result<(), RegistryError> {
        let mut locations = self
            .store
            .get_all()
            .inspect_err(|e| tracing::error!("Failed to load saved locations: {}", e))?;
        locations.reverse();
        tracing::info!("Loaded {} saved locations", locations.len());
        self.locations = locations;
        Ok(())
    }

    /// Save a new location and fetch its current weather.
    ///
    /// Coordinates already in the list or in the store give
    /// `AddOutcome::Duplicate`. If the weather fetch fails the location is
    /// removed again and the fetch error is returned; the registry and the
    /// store end up as they were before the call.
    pub async fn add(&mut self, location: Location) -> Result<AddOutcome, RegistryError> {
        validate_coordinates(location.lat, location.lon).map_err(|_| {
            RegistryError::InvalidCoordinates {
                lat: location.lat,
                lon: location.lon,
            }
        })?;

        if self.locations.iter().any(|l| l.same_coordinates(&location)) {
            tracing::debug!("Location {} already saved", location.display_name());
            return Ok(AddOutcome::Duplicate);
        }

        let id = match self.store.add(&location) {
            Ok(id) => id,
            Err(StoreError::Duplicate(reason)) => {
                tracing::debug!("Store rejected {}: {}", location.display_name(), reason);
                return Ok(AddOutcome::Duplicate);
            }
            Err(e) => {
                tracing::error!("Failed to save {}: {}", location.display_name(), e);
                return Err(e.into());
            }
        };
        let saved = location.with_id(id);
        self.locations.insert(0, saved.clone());

        if let Err(e) = self.cache.fetch_current(id, saved.lat, saved.lon).await {
            tracing::warn!(
                "Rolling back {} (id {}): weather fetch failed: {}",
                saved.display_name(),
                id,
                e
            );
            if let Err(rollback) = self.store.delete(id) {
                tracing::error!("Failed to remove location {} during rollback: {}", id, rollback);
            }
            self.locations.retain(|l| l.id != Some(id));
            return Err(RegistryError::Weather(e));
        }

        tracing::info!("Added location {} (id {})", saved.display_name(), id);
        Ok(AddOutcome::Added(saved))
    }

    /// Remove a saved location and its cached weather.
    ///
    /// Returns `false` if nothing with that id was saved.
    pub async fn delete(&mut self, id: i64) -> Result<bool, RegistryError> {
        self.store
            .delete(id)
            .inspect_err(|e| tracing::error!("Failed to delete location {}: {}", id, e))?;

        let before = self.locations.len();
        self.locations.retain(|l| l.id != Some(id));
        let removed = self.locations.len() != before;

        self.cache.invalidate(id);
        if self.selected == Some(id) {
            self.selected = None;
        }

        if removed {
            tracing::info!("Deleted location {}", id);
        }
        Ok(removed)
    }

    /// Remove every saved location and all cached weather for them.
    pub async fn remove_all(&mut self) -> Result<(), RegistryError> {
        self.store
            .clear()
            .inspect_err(|e| tracing::error!("Failed to remove saved locations: {}", e))?;

        let ids: Vec<i64> = self.locations.iter().filter_map(|l| l.id).collect();
        self.locations.clear();
        for id in &ids {
            self.cache.invalidate(*id);
        }
        self.selected = None;

        tracing::info!("Removed all {} saved locations", ids.len());
        Ok(())
    }
}
