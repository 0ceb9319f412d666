use anyhow::{Context, Result};
use skycast_core::{AppError, Config, ConfigError};
use skycast_weather::{
    search_locations, ForecastDetails, GeocodingResult, WeatherCache, WeatherClient, WeatherError,
};
use std::sync::Arc;

use crate::profile::ProfileService;
use crate::registry::{LocationRegistry, RegistryError};
use crate::sqlite_store::SqliteStore;
use crate::store::StoreError;

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Database(db) => AppError::Database(db),
            other => AppError::Other(other.into()),
        }
    }
}

fn client_error(e: WeatherError) -> AppError {
    match e {
        WeatherError::Network(net) => AppError::Network(net),
        other => AppError::Other(other.into()),
    }
}

/// Application-wide services, wired once at startup.
///
/// Construction order is store, weather client, weather cache, registry,
/// then profile. The registry and the profile share the one SQLite store.
pub struct AppServices {
    weather: Arc<WeatherCache>,
    registry: LocationRegistry<WeatherCache>,
    profile: ProfileService,
    search_limit: u32,
}

impl AppServices {
    /// Validate `config` and open every service it describes.
    ///
    /// Failures carry an `AppError` that can be recovered with
    /// `downcast_ref`.
    pub fn open(config: &Config) -> Result<Self> {
        let validation = config.validate();
        if !validation.is_valid() {
            return Err(AppError::Config(ConfigError::Invalid(validation.error_summary())).into());
        }

        std::fs::create_dir_all(&config.data_dir)
            .map_err(AppError::Io)
            .with_context(|| {
                format!("Failed to create data directory {}", config.data_dir.display())
            })?;

        let db_path = config.database_path();
        let store = Arc::new(
            SqliteStore::open(&db_path)
                .map_err(AppError::from)
                .with_context(|| format!("Failed to open database at {}", db_path.display()))?,
        );
        tracing::info!("Opened database at {}", db_path.display());

        let client = WeatherClient::from_config(&config.weather)
            .map_err(client_error)
            .context("Failed to build weather client")?;

        Ok(Self::new(store, client, config.weather.search_limit))
    }

    /// Build services from parts.
    pub fn new(store: Arc<SqliteStore>, client: WeatherClient, search_limit: u32) -> Self {
        let weather = Arc::new(WeatherCache::new(client));
        let registry = LocationRegistry::new(store.clone(), weather.clone());
        let profile = ProfileService::new(store);

        Self {
            weather,
            registry,
            profile,
            search_limit,
        }
    }

    /// Load saved locations and the profile from the store.
    pub async fn initialize(&mut self) -> Result<()> {
        self.registry
            .load()
            .await
            .context("Failed to load saved locations")?;
        self.profile.load().await.context("Failed to load profile")?;

        tracing::info!(
            "Services initialized with {} saved locations",
            self.registry.len()
        );
        Ok(())
    }

    /// Refresh current weather for every saved location.
    ///
    /// Failures are logged and leave the previous entry cached. Returns how
    /// many locations were refreshed.
    pub async fn refresh_current_all(&self) -> usize {
        let targets: Vec<(i64, f64, f64)> = self
            .registry
            .locations()
            .iter()
            .filter_map(|l| l.id.map(|id| (id, l.lat, l.lon)))
            .collect();

        let mut refreshed = 0;
        for (id, lat, lon) in targets {
            match self.weather.fetch_current(id, lat, lon).await {
                Ok(_) => refreshed += 1,
                Err(e) => tracing::warn!("Keeping previous weather for location {}: {}", id, e),
            }
        }

        tracing::debug!("Refreshed current weather for {} locations", refreshed);
        refreshed
    }

    /// Fetch hourly and daily forecasts for a saved location.
    pub async fn refresh_details(&self, id: i64) -> Result<ForecastDetails, RegistryError> {
        let (lat, lon) = self
            .registry
            .get(id)
            .map(|l| (l.lat, l.lon))
            .ok_or(RegistryError::UnknownLocation(id))?;

        Ok(self.weather.fetch_details(id, lat, lon).await?)
    }

    /// Location suggestions for `query`, capped at the configured limit.
    pub async fn search(&self, query: &str) -> Result<Vec<GeocodingResult>, WeatherError> {
        search_locations(self.weather.client(), query, self.search_limit).await
    }

    pub fn registry(&self) -> &LocationRegistry<WeatherCache> {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut LocationRegistry<WeatherCache> {
        &mut self.registry
    }

    pub fn profile(&self) -> &ProfileService {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut ProfileService {
        &mut self.profile
    }

    pub fn weather(&self) -> &WeatherCache {
        &self.weather
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use skycast_core::Units;
    use std::time::Duration;

    fn services() -> AppServices {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        // Nothing listens here; these tests never reach the network
        let client =
            WeatherClient::new("http://127.0.0.1:9", "key", Units::Metric, Duration::from_secs(1))
                .unwrap();
        AppServices::new(store, client, 5)
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        config.weather.timeout_secs = 0;

        let err = AppServices::open(&config).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::Config(ConfigError::Invalid(_)))
        ));
        assert!(!config.database_path().exists());
    }

    #[test]
    fn test_open_reports_unusable_data_dir_as_io() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = Config {
            data_dir: file.path().to_path_buf(),
            ..Default::default()
        };

        let err = AppServices::open(&config).err().unwrap();
        assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::Io(_))));
    }

    #[test]
    fn test_store_errors_convert_to_app_errors() {
        let db = AppError::from(StoreError::Database(skycast_core::DatabaseError::Busy(
            "locked".into(),
        )));
        assert!(matches!(db, AppError::Database(_)));

        let other = AppError::from(StoreError::NotFound(1));
        assert!(matches!(other, AppError::Other(_)));
    }

    #[test]
    fn test_open_creates_database_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().join("nested"),
            ..Default::default()
        };

        let services = AppServices::open(&config).unwrap();
        assert!(config.database_path().exists());
        assert!(services.registry().is_empty());
    }

    #[tokio::test]
    async fn test_initialize_on_empty_store() {
        let mut services = services();
        services.initialize().await.unwrap();
        assert!(services.registry().is_empty());
        assert!(services.profile().profile_id().is_none());
    }

    #[tokio::test]
    async fn test_refresh_details_unknown_location() {
        let services = services();
        let err = services.refresh_details(42).await.unwrap_err();
        assert!(matches!(err, RegistryError::UnknownLocation(42)));
    }

    #[tokio::test]
    async fn test_blank_search_skips_network() {
        let services = services();
        assert!(services.search("   ").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_with_no_locations() {
        let services = services();
        assert_eq!(services.refresh_current_all().await, 0);
    }
}
