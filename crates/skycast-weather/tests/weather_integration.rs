//! Integration tests for WeatherClient and WeatherCache using wiremock.

use skycast_core::Units;
use skycast_weather::{search_locations, WeatherCache, WeatherClient, WeatherError};
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> WeatherClient {
    WeatherClient::new(&server.uri(), "test-key", Units::Metric, Duration::from_secs(5)).unwrap()
}

fn condition(icon: &str) -> serde_json::Value {
    serde_json::json!({"id": 500, "main": "Rain", "description": "light rain", "icon": icon})
}

fn current_body(temp: f64) -> serde_json::Value {
    serde_json::json!({
        "lat": 51.5074,
        "lon": -0.1278,
        "timezone": "Europe/London",
        "timezone_offset": 0,
        "current": {
            "dt": 1_718_000_000,
            "sunrise": 1_717_990_000,
            "sunset": 1_718_050_000,
            "temp": temp,
            "feels_like": temp - 1.0,
            "pressure": 1015,
            "humidity": 72,
            "dew_point": 9.1,
            "uvi": 3.2,
            "clouds": 40,
            "visibility": 10000,
            "wind_speed": 4.6,
            "wind_deg": 250,
            "weather": [condition("10d")]
        }
    })
}

fn details_body() -> serde_json::Value {
    serde_json::json!({
        "lat": 51.5074,
        "lon": -0.1278,
        "timezone": "Europe/London",
        "timezone_offset": 3600,
        "hourly": [
            {"dt": 1_718_000_000, "temp": 14.0, "feels_like": 13.0, "pressure": 1015,
             "humidity": 70, "clouds": 40, "wind_speed": 4.0, "wind_deg": 240, "pop": 0.2,
             "weather": [condition("03d")]},
            {"dt": 1_718_003_600, "temp": 15.0, "feels_like": 14.2, "pressure": 1014,
             "humidity": 68, "clouds": 55, "wind_speed": 4.4, "pop": 0.35,
             "weather": [condition("10d")]}
        ],
        "daily": [
            {"dt": 1_718_017_200, "sunrise": 1_717_990_000, "sunset": 1_718_050_000,
             "summary": "Rain in the afternoon",
             "temp": {"day": 16.0, "min": 10.0, "max": 18.0,
                      "night": 11.0, "eve": 15.0, "morn": 10.5},
             "pressure": 1014, "humidity": 65, "wind_speed": 5.2, "wind_deg": 230,
             "clouds": 60, "pop": 0.6, "uvi": 4.1, "weather": [condition("10d")]}
        ]
    })
}

#[tokio::test]
async fn test_current_sends_expected_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .and(query_param("lat", "51.5074"))
        .and(query_param("lon", "-0.1278"))
        .and(query_param("exclude", "minutely,hourly,daily,alerts"))
        .and(query_param("appid", "test-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(14.5)))
        .expect(1)
        .mount(&server)
        .await;

    let report = client(&server).current(51.5074, -0.1278).await.unwrap();

    assert_eq!(report.current.temp, 14.5);
    assert_eq!(report.current.humidity, 72);
    assert_eq!(report.timezone, "Europe/London");
    assert_eq!(report.current.condition().unwrap().description, "light rain");
}

#[tokio::test]
async fn test_details_excludes_current_and_minutely() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .and(query_param("exclude", "current,minutely"))
        .respond_with(ResponseTemplate::new(200).set_body_json(details_body()))
        .expect(1)
        .mount(&server)
        .await;

    let details = client(&server).details(51.5074, -0.1278).await.unwrap();

    assert_eq!(details.hourly.len(), 2);
    assert_eq!(details.daily.len(), 1);
    assert_eq!(details.timezone_offset, 3600);
    assert_eq!(details.daily[0].temp.max, 18.0);
    assert_eq!(
        details.daily[0].date(details.timezone_offset).unwrap().to_string(),
        "2024-06-10"
    );
}

#[tokio::test]
async fn test_unauthorized_maps_to_invalid_api_key() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401, "message": "Invalid API key"
        })))
        .mount(&server)
        .await;

    let err = client(&server).current(1.0, 2.0).await.unwrap_err();
    assert!(matches!(err, WeatherError::InvalidApiKey));
}

#[tokio::test]
async fn test_server_error_maps_to_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client(&server).current(1.0, 2.0).await.unwrap_err();
    match err {
        WeatherError::Api { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "maintenance");
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unexpected_shape_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "lat": 1.0, "lon": 2.0, "timezone": "UTC", "timezone_offset": 0,
            "current": {"temp": "warm"}
        })))
        .mount(&server)
        .await;

    let err = client(&server).current(1.0, 2.0).await.unwrap_err();
    assert!(matches!(err, WeatherError::Parse(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_geocoding_search_dedupes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "London"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"name": "London", "country": "GB", "state": "England", "lat": 51.5073, "lon": -0.1276},
            {"name": "City of London", "country": "GB", "state": "England",
             "lat": 51.5073, "lon": -0.1276},
            {"name": "London", "country": "CA", "state": "Ontario", "lat": 42.9832, "lon": -81.2434}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let results = search_locations(&client(&server), "  London ", 5).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].state.as_deref(), Some("England"));
    assert_eq!(results[1].country, "CA");
}

#[tokio::test]
async fn test_cache_stores_current_and_details_separately() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .and(query_param("exclude", "minutely,hourly,daily,alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(20.0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .and(query_param("exclude", "current,minutely"))
        .respond_with(ResponseTemplate::new(200).set_body_json(details_body()))
        .mount(&server)
        .await;

    let cache = WeatherCache::new(client(&server));
    cache.fetch_current(3, 51.5074, -0.1278).await.unwrap();
    assert!(cache.details(3).is_none());

    cache.fetch_details(3, 51.5074, -0.1278).await.unwrap();
    assert_eq!(cache.current(3).unwrap().current.temp, 20.0);
    assert_eq!(cache.details(3).unwrap().hourly.len(), 2);

    cache.invalidate(3);
    assert!(cache.current(3).is_none());
    assert!(cache.details(3).is_none());
}

#[tokio::test]
async fn test_cache_failed_refresh_preserves_previous_entry() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_body(17.0)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let cache = WeatherCache::new(client(&server));
    cache.fetch_current(1, 51.5074, -0.1278).await.unwrap();
    assert!(cache.fetch_current(1, 51.5074, -0.1278).await.is_err());

    assert_eq!(cache.current(1).unwrap().current.temp, 17.0);
}

#[tokio::test]
async fn test_invalidate_during_fetch_discards_result() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/data/3.0/onecall"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(current_body(12.0))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let cache = WeatherCache::new(client(&server));

    let fetch = cache.fetch_current(5, 51.5074, -0.1278);
    let invalidate = async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cache.invalidate(5);
    };
    let (result, ()) = tokio::join!(fetch, invalidate);

    // The caller still sees the payload, but the removed id is not resurrected
    assert!(result.is_ok());
    assert!(cache.current(5).is_none());
}
