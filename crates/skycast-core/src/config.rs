use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable that overrides `weather.api_key`
pub const API_KEY_ENV: &str = "SKYCAST_API_KEY";

/// Largest `limit` the geocoding endpoint accepts
pub const MAX_SEARCH_LIMIT: u32 = 5;

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the local database
    pub data_dir: PathBuf,

    /// Weather and geocoding API settings
    #[serde(default)]
    pub weather: WeatherConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Measurement system requested from the weather API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    /// Value of the `units` query parameter
    pub fn as_query(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeather API key (can also be set via `SKYCAST_API_KEY`)
    pub api_key: Option<String>,

    /// Base URL shared by the One Call and geocoding endpoints
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub units: Units,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Number of geocoding suggestions to request
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,
}

fn default_base_url() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_search_limit() -> u32 {
    MAX_SEARCH_LIMIT
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            units: Units::default(),
            timeout_secs: default_timeout_secs(),
            search_limit: default_search_limit(),
        }
    }
}

impl WeatherConfig {
    /// Check if an API key is present and not a placeholder
    pub fn is_configured(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty() && !k.starts_with("YOUR_"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skycast");

        Self {
            data_dir,
            weather: WeatherConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if it doesn't exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, writing defaults there on first run
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str::<Config>(&contents).context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save_to(path)?;
            config
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors. Warnings
    /// are returned for the caller to report once logging is set up.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        Self::load_validated_from(&Self::config_path()?)
    }

    /// Like `load_validated`, reading from `path`
    pub fn load_validated_from(path: &Path) -> Result<(Self, ValidationResult)> {
        let config = Self::load_from(path)?;
        let validation = config.validate();

        if !validation.is_valid() {
            anyhow::bail!(
                "Configuration validation failed: {}",
                validation.error_summary()
            );
        }

        Ok((config, validation))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.weather.api_key = Some(key);
            }
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(&self.weather.base_url, "weather.base_url", &mut result);

        if self.weather.timeout_secs == 0 {
            result.add_error("weather.timeout_secs", "Timeout must be greater than 0");
        } else if self.weather.timeout_secs > 300 {
            result.add_warning("weather.timeout_secs", "Timeout is unusually long (>300s)");
        }

        if self.weather.search_limit == 0 || self.weather.search_limit > MAX_SEARCH_LIMIT {
            result.add_error(
                "weather.search_limit",
                format!("Search limit must be between 1 and {}", MAX_SEARCH_LIMIT),
            );
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            result.add_error(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            );
        }

        if !self.weather.is_configured() {
            result.add_warning(
                "weather.api_key",
                format!("No API key configured - set {} or weather.api_key", API_KEY_ENV),
            );
        }

        result
    }

    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Path of the SQLite database holding locations and the profile
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("skycast.db")
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("skycast");

        Ok(config_dir.join("config.toml"))
    }
}
