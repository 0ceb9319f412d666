//! Direct geocoding: turn a typed place name into candidate locations.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::client::WeatherClient;
use crate::types::{Location, WeatherError};

/// One candidate returned by the geocoding endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodingResult {
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub local_names: Option<HashMap<String, String>>,
}

impl GeocodingResult {
    /// Name in the given language, falling back to the default name
    pub fn localized_name(&self, lang: &str) -> &str {
        self.local_names
            .as_ref()
            .and_then(|names| names.get(lang))
            .map(String::as_str)
            .unwrap_or(&self.name)
    }

    /// Unsaved location built from this suggestion
    pub fn into_location(self) -> Location {
        Location {
            id: None,
            city: self.name,
            state: self.state,
            country: self.country,
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// Search for locations matching `query`.
///
/// Blank queries return no suggestions without touching the network.
/// Results sharing the exact same coordinates are collapsed to the first one.
pub async fn search_locations(
    client: &WeatherClient,
    query: &str,
    limit: u32,
) -> Result<Vec<GeocodingResult>, WeatherError> {
    let query = query.trim();
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let results = client.geocode(query, limit).await?;
    let deduped = dedupe_by_coordinates(results);
    tracing::debug!("Geocoding '{}' returned {} suggestions", query, deduped.len());
    Ok(deduped)
}

fn dedupe_by_coordinates(results: Vec<GeocodingResult>) -> Vec<GeocodingResult> {
    let mut out: Vec<GeocodingResult> = Vec::with_capacity(results.len());
    for r in results {
        if !out.iter().any(|seen| seen.lat == r.lat && seen.lon == r.lon) {
            out.push(r);
        }
    }
    out
}
