//! Weather service for SkyCast
//!
//! Typed access to the OpenWeather One Call and geocoding APIs, plus an
//! in-memory cache of per-location weather.

pub mod cache;
pub mod client;
pub mod geocode;
pub mod types;

pub use cache::{ForecastCache, WeatherCache};
pub use client::WeatherClient;
pub use geocode::{search_locations, GeocodingResult};
pub use types::*;
