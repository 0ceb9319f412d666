use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use skycast_core::NetworkError;

/// Weather condition categories mapped from OpenWeather icon codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Clear,
    FewClouds,
    ScatteredClouds,
    Overcast,
    ShowerRain,
    Rain,
    Thunderstorm,
    Snow,
    Mist,
    #[default]
    Unknown,
}

impl ConditionKind {
    /// Classify an icon code such as `"10d"` by its two-digit prefix.
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_icon(icon: &str) -> Self {
        match icon.get(..2) {
            Some("01") => Self::Clear,
            Some("02") => Self::FewClouds,
            Some("03") => Self::ScatteredClouds,
            Some("04") => Self::Overcast, // broken clouds
            Some("09") => Self::ShowerRain,
            Some("10") => Self::Rain,
            Some("11") => Self::Thunderstorm,
            Some("13") => Self::Snow,
            Some("50") => Self::Mist,
            _ => Self::Unknown,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::FewClouds => "Few Clouds",
            Self::ScatteredClouds => "Scattered Clouds",
            Self::Overcast => "Overcast",
            Self::ShowerRain => "Shower Rain",
            Self::Rain => "Rain",
            Self::Thunderstorm => "Thunderstorm",
            Self::Snow => "Snow",
            Self::Mist => "Mist",
            Self::Unknown => "Unknown",
        }
    }
}

/// Icon codes end in `d` for day and `n` for night.
pub fn is_daytime(icon: &str) -> bool {
    icon.ends_with('d')
}

/// Convert a unix timestamp to the location's wall-clock time.
pub fn local_time(dt: i64, timezone_offset: i32) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(timezone_offset)?;
    DateTime::<Utc>::from_timestamp(dt, 0).map(|t| t.with_timezone(&offset))
}

/// A saved or candidate location.
///
/// `id` is assigned by the store; before that, identity is the `(lat, lon)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(city: impl Into<String>, country: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: None,
            city: city.into(),
            state: None,
            country: country.into(),
            lat,
            lon,
        }
    }

    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Exact coordinate match, used for duplicate detection
    pub fn same_coordinates(&self, other: &Location) -> bool {
        self.lat == other.lat && self.lon == other.lon
    }

    /// "City, State, Country", skipping a missing or empty state
    pub fn display_name(&self) -> String {
        match self.state.as_deref().filter(|s| !s.is_empty()) {
            Some(state) => format!("{}, {}, {}", self.city, state, self.country),
            None => format!("{}, {}", self.city, self.country),
        }
    }
}

/// One entry of the `weather[]` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherCondition {
    pub id: u32,
    pub main: String,
    pub description: String,
    pub icon: String,
}

impl WeatherCondition {
    pub fn kind(&self) -> ConditionKind {
        ConditionKind::from_icon(&self.icon)
    }
}

/// Current conditions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub dt: i64,
    /// Absent in polar day/night
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
    pub temp: f64,
    pub feels_like: f64,
    /// hPa
    pub pressure: u32,
    /// Percent
    pub humidity: u8,
    #[serde(default)]
    pub dew_point: Option<f64>,
    #[serde(default)]
    pub uvi: Option<f64>,
    /// Percent
    pub clouds: u8,
    /// Metres
    #[serde(default)]
    pub visibility: Option<u32>,
    pub wind_speed: f64,
    #[serde(default)]
    pub wind_deg: Option<u16>,
    #[serde(default)]
    pub wind_gust: Option<f64>,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
}

impl CurrentWeather {
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.dt, 0)
    }

    /// Primary condition reported by the API
    pub fn condition(&self) -> Option<&WeatherCondition> {
        self.weather.first()
    }
}

/// Hourly forecast entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub dt: i64,
    pub temp: f64,
    pub feels_like: f64,
    pub pressure: u32,
    pub humidity: u8,
    pub clouds: u8,
    pub wind_speed: f64,
    #[serde(default)]
    pub wind_deg: Option<u16>,
    /// Probability of precipitation, 0.0 - 1.0
    #[serde(default)]
    pub pop: Option<f64>,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
}

impl HourlyForecast {
    pub fn condition(&self) -> Option<&WeatherCondition> {
        self.weather.first()
    }
}

/// Temperatures over the course of a day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyTemperature {
    pub day: f64,
    pub min: f64,
    pub max: f64,
    pub night: f64,
    pub eve: f64,
    pub morn: f64,
}

/// Daily forecast entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyForecast {
    pub dt: i64,
    #[serde(default)]
    pub sunrise: Option<i64>,
    #[serde(default)]
    pub sunset: Option<i64>,
    #[serde(default)]
    pub summary: Option<String>,
    pub temp: DailyTemperature,
    pub pressure: u32,
    pub humidity: u8,
    pub wind_speed: f64,
    #[serde(default)]
    pub wind_deg: Option<u16>,
    pub clouds: u8,
    #[serde(default)]
    pub pop: Option<f64>,
    #[serde(default)]
    pub uvi: Option<f64>,
    #[serde(default)]
    pub weather: Vec<WeatherCondition>,
}

impl DailyForecast {
    /// Calendar date at the forecast location
    pub fn date(&self, timezone_offset: i32) -> Option<NaiveDate> {
        local_time(self.dt, timezone_offset).map(|t| t.date_naive())
    }

    pub fn condition(&self) -> Option<&WeatherCondition> {
        self.weather.first()
    }
}

/// Current conditions for one location, as stored in the cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentReport {
    pub lat: f64,
    pub lon: f64,
    pub timezone: String,
    pub timezone_offset: i32,
    pub current: CurrentWeather,
    pub fetched_at: DateTime<Utc>,
}

/// Hourly and daily forecasts for one location, as stored in the cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastDetails {
    pub hourly: Vec<HourlyForecast>,
    pub daily: Vec<DailyForecast>,
    pub timezone: String,
    pub timezone_offset: i32,
    pub lat: f64,
    pub lon: f64,
    pub fetched_at: DateTime<Utc>,
}

/// One Call response when only `current` is requested
#[derive(Debug, Deserialize)]
pub(crate) struct OneCallCurrentResponse {
    pub lat: f64,
    pub lon: f64,
    pub timezone: String,
    pub timezone_offset: i32,
    pub current: CurrentWeather,
}

impl OneCallCurrentResponse {
    pub(crate) fn into_report(self) -> CurrentReport {
        CurrentReport {
            lat: self.lat,
            lon: self.lon,
            timezone: self.timezone,
            timezone_offset: self.timezone_offset,
            current: self.current,
            fetched_at: Utc::now(),
        }
    }
}

/// One Call response when `hourly` and `daily` are requested
#[derive(Debug, Deserialize)]
pub(crate) struct OneCallDetailsResponse {
    pub lat: f64,
    pub lon: f64,
    pub timezone: String,
    pub timezone_offset: i32,
    pub hourly: Vec<HourlyForecast>,
    pub daily: Vec<DailyForecast>,
}

impl OneCallDetailsResponse {
    pub(crate) fn into_details(self) -> ForecastDetails {
        ForecastDetails {
            hourly: self.hourly,
            daily: self.daily,
            timezone: self.timezone,
            timezone_offset: self.timezone_offset,
            lat: self.lat,
            lon: self.lon,
            fetched_at: Utc::now(),
        }
    }
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),
    #[error("Weather API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid coordinates: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            WeatherError::Network(e) => e.user_message(),
            WeatherError::Api { status, .. } if *status >= 500 => {
                "Weather service unavailable. Please try again later."
            }
            WeatherError::Api { .. } => "Weather service error. Please try again.",
            WeatherError::InvalidApiKey => "Weather API key is invalid. Check settings.",
            WeatherError::Parse(_) => "Received unexpected weather data.",
            WeatherError::InvalidCoordinates { .. } => "Invalid location coordinates.",
        }
    }
}

/// Coordinates must be finite degrees within the usual ranges
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<(), WeatherError> {
    let valid = lat.is_finite()
        && lon.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lon);

    if valid {
        Ok(())
    } else {
        Err(WeatherError::InvalidCoordinates { lat, lon })
    }
}
