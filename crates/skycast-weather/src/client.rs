//! OpenWeather One Call and geocoding client.

use reqwest::Client;
use skycast_core::{ReqwestErrorExt, Units, WeatherConfig};
use std::time::Duration;
use tracing::instrument;

use crate::geocode::GeocodingResult;
use crate::types::{
    validate_coordinates, CurrentReport, ForecastDetails, OneCallCurrentResponse,
    OneCallDetailsResponse, WeatherError,
};

const ONE_CALL_PATH: &str = "/data/3.0/onecall";
const GEOCODING_PATH: &str = "/geo/1.0/direct";

/// Subsets dropped when only current conditions are wanted
pub const CURRENT_EXCLUDE: &str = "minutely,hourly,daily,alerts";
/// Subsets dropped when fetching hourly and daily forecasts
pub const DETAILS_EXCLUDE: &str = "current,minutely";

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    units: Units,
}

impl WeatherClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        units: Units,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            units,
        })
    }

    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        Self::new(
            &config.base_url,
            config.api_key.as_deref().unwrap_or_default(),
            config.units,
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn units(&self) -> Units {
        self.units
    }

    fn one_call_url(&self, lat: f64, lon: f64, exclude: &str) -> String {
        format!(
            "{}{}?lat={}&lon={}&exclude={}&appid={}&units={}",
            self.base_url,
            ONE_CALL_PATH,
            lat,
            lon,
            exclude,
            urlencoding::encode(&self.api_key),
            self.units.as_query(),
        )
    }

    /// Fetch current conditions only.
    #[instrument(skip(self), level = "debug")]
    pub async fn current(&self, lat: f64, lon: f64) -> Result<CurrentReport, WeatherError> {
        validate_coordinates(lat, lon)?;
        let url = self.one_call_url(lat, lon, CURRENT_EXCLUDE);

        let resp: OneCallCurrentResponse = self.get_json(&url).await?;
        Ok(resp.into_report())
    }

    /// Fetch hourly and daily forecasts.
    #[instrument(skip(self), level = "debug")]
    pub async fn details(&self, lat: f64, lon: f64) -> Result<ForecastDetails, WeatherError> {
        validate_coordinates(lat, lon)?;
        let url = self.one_call_url(lat, lon, DETAILS_EXCLUDE);

        let resp: OneCallDetailsResponse = self.get_json(&url).await?;
        Ok(resp.into_details())
    }

    /// Direct geocoding: place name to candidate coordinates.
    #[instrument(skip(self), level = "debug")]
    pub async fn geocode(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<GeocodingResult>, WeatherError> {
        let url = format!(
            "{}{}?q={}&limit={}&appid={}",
            self.base_url,
            GEOCODING_PATH,
            urlencoding::encode(query),
            limit,
            urlencoding::encode(&self.api_key),
        );

        self.get_json(&url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, WeatherError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| WeatherError::Network(e.into_network_error()))?;

        let status = response.status();

        if status.is_success() {
            let body = response
                .bytes()
                .await
                .map_err(|e| WeatherError::Network(e.into_network_error()))?;
            serde_json::from_slice(&body)
                .map_err(|e| WeatherError::Parse(format!("JSON parse error: {}", e)))
        } else if status.as_u16() == 401 {
            Err(WeatherError::InvalidApiKey)
        } else {
            let text = response.text().await.unwrap_or_default();
            tracing::debug!("Weather API returned status {}: {}", status, text);
            Err(WeatherError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    fn client() -> WeatherClient {
        WeatherClient::new(
            "https://api.example.com/",
            "k e y",
            Units::Metric,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_one_call_url_shape() {
        let url = client().one_call_url(51.5074, -0.1278, CURRENT_EXCLUDE);
        assert_eq!(
            url,
            "https://api.example.com/data/3.0/onecall?lat=51.5074&lon=-0.1278\
             &exclude=minutely,hourly,daily,alerts&appid=k%20e%20y&units=metric"
        );
    }

    #[test]
    fn test_from_config_uses_units() {
        let mut config = WeatherConfig::default();
        config.units = Units::Imperial;
        config.api_key = Some("abc".into());
        let client = WeatherClient::from_config(&config).unwrap();
        assert_eq!(client.units(), Units::Imperial);
    }

    #[tokio::test]
    async fn test_invalid_coordinates_rejected_before_request() {
        let err = client().current(f64::NAN, 0.0).await.unwrap_err();
        assert!(matches!(err, WeatherError::InvalidCoordinates { .. }));
    }
}
