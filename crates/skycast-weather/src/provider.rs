//! OpenWeatherMap-compatible client for current conditions and forecasts.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use skycast_core::security::is_valid_coordinates;
use skycast_core::ApiConfig;
use url::Url;

use crate::types::{
    Coordinates, ForecastEntry, ForecastSnapshot, WeatherError, WeatherSnapshot,
};

#[derive(Debug, Deserialize)]
struct OwmCurrentResponse {
    #[serde(default)]
    name: String,
    coord: Option<OwmCoord>,
    #[serde(default)]
    weather: Vec<OwmWeather>,
    main: OwmMain,
    #[serde(default)]
    wind: OwmWind,
    dt: Option<i64>,
    visibility: Option<u32>,
    #[serde(default)]
    sys: OwmSys,
}

#[derive(Debug, Default, Deserialize)]
struct OwmSys {
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OwmCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwmWeather {
    main: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: Option<f64>,
    temp_min: Option<f64>,
    temp_max: Option<f64>,
    pressure: Option<f64>,
    humidity: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct OwmWind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmRain {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
    #[serde(rename = "3h")]
    three_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwmForecastResponse {
    #[serde(default)]
    list: Vec<OwmForecastItem>,
    city: Option<OwmCity>,
}

#[derive(Debug, Deserialize)]
struct OwmCity {
    /// Seconds east of UTC
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwmForecastItem {
    dt: i64,
    main: Option<OwmMain>,
    #[serde(default)]
    weather: Vec<OwmWeather>,
    rain: Option<OwmRain>,
}

#[derive(Debug, Deserialize)]
struct OwmErrorBody {
    message: Option<String>,
}

/// Where to fetch weather for
#[derive(Debug, Clone, PartialEq)]
pub enum Place {
    City(String),
    Coordinates(Coordinates),
}

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl WeatherProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, WeatherError> {
        Self::new(
            &config.base_url,
            config.api_key.as_deref().unwrap_or_default(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    /// Current conditions and forecast for one place.
    pub async fn fetch(
        &self,
        place: &Place,
    ) -> Result<(WeatherSnapshot, ForecastSnapshot), WeatherError> {
        let weather = self.current(place).await?;
        let forecast = self.forecast(place).await?;
        Ok((weather, forecast))
    }

    pub async fn current(&self, place: &Place) -> Result<WeatherSnapshot, WeatherError> {
        let body: OwmCurrentResponse = self.get("weather", place).await?;
        let snapshot = convert_current(body);
        tracing::info!(
            city = %snapshot.city_name,
            temperature = snapshot.temperature,
            condition = %snapshot.condition_main,
            "Fetched current weather"
        );
        Ok(snapshot)
    }

    pub async fn forecast(&self, place: &Place) -> Result<ForecastSnapshot, WeatherError> {
        let body: OwmForecastResponse = self.get("forecast", place).await?;
        let forecast = convert_forecast(body);
        tracing::info!(entries = forecast.entries.len(), "Fetched forecast");
        Ok(forecast)
    }

    fn endpoint(&self, path: &str, place: &Place) -> Result<Url, WeatherError> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path))
            .map_err(|e| WeatherError::Parse(format!("Invalid base URL: {}", e)))?;

        {
            let mut query = url.query_pairs_mut();
            match place {
                Place::City(city) => {
                    query.append_pair("q", city.trim());
                }
                Place::Coordinates(c) => {
                    query.append_pair("lat", &c.lat.to_string());
                    query.append_pair("lon", &c.lon.to_string());
                }
            }
            query.append_pair("units", "metric");
            query.append_pair("appid", &self.api_key);
        }

        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, place: &Place) -> Result<T, WeatherError> {
        match place {
            Place::City(city) if city.trim().is_empty() => {
                return Err(WeatherError::NotFound(String::new()));
            }
            Place::Coordinates(c) if !is_valid_coordinates(c.lat, c.lon) => {
                return Err(WeatherError::InvalidCoordinates { lat: c.lat, lon: c.lon });
            }
            _ => {}
        }

        let url = self.endpoint(path, place)?;
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .json::<OwmErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_default();
            tracing::warn!(%status, path, "Weather API request failed");
            return Err(match status {
                StatusCode::NOT_FOUND => WeatherError::NotFound(match place {
                    Place::City(city) => city.clone(),
                    Place::Coordinates(c) => format!("{}, {}", c.lat, c.lon),
                }),
                StatusCode::UNAUTHORIZED => WeatherError::InvalidApiKey,
                _ => WeatherError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| WeatherError::Parse(e.to_string()))
    }
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

fn convert_current(data: OwmCurrentResponse) -> WeatherSnapshot {
    let weather = data.weather.into_iter().next();
    let (condition_main, description) = weather
        .map(|w| (w.main, w.description))
        .unwrap_or_default();

    WeatherSnapshot {
        temperature: data.main.temp,
        wind_speed: data.wind.speed,
        condition_main,
        description,
        city_name: data.name,
        feels_like: data.main.feels_like,
        humidity: data.main.humidity,
        coordinates: data.coord.map(|c| Coordinates {
            lat: c.lat,
            lon: c.lon,
        }),
        observed_at: data.dt.and_then(timestamp),
        pressure: data.main.pressure,
        visibility: data.visibility,
        sunrise: data.sys.sunrise.and_then(timestamp),
        sunset: data.sys.sunset.and_then(timestamp),
    }
}

fn convert_forecast(data: OwmForecastResponse) -> ForecastSnapshot {
    let entries = data
        .list
        .into_iter()
        .filter_map(|item| {
            let Some(ts) = timestamp(item.dt) else {
                tracing::debug!(dt = item.dt, "Skipping forecast entry with bad timestamp");
                return None;
            };
            let description = item
                .weather
                .first()
                .map(|w| w.description.clone())
                .unwrap_or_default();
            let conditions: Vec<String> = item.weather.into_iter().map(|w| w.main).collect();
            Some(ForecastEntry {
                timestamp: ts,
                condition_main: conditions.first().cloned().unwrap_or_default(),
                conditions,
                description,
                temperature: item.main.as_ref().map(|m| m.temp),
                temp_min: item.main.as_ref().and_then(|m| m.temp_min),
                temp_max: item.main.as_ref().and_then(|m| m.temp_max),
                humidity: item.main.as_ref().and_then(|m| m.humidity),
                rain_3h: item.rain.as_ref().and_then(|r| r.three_hour),
                rain_1h: item.rain.as_ref().and_then(|r| r.one_hour),
            })
        })
        .collect();

    ForecastSnapshot::new(entries)
        .with_utc_offset(data.city.map(|c| c.timezone).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> WeatherProvider {
        WeatherProvider::new("https://api.example.com/data/2.5/", "key", Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn test_city_query_is_encoded() {
        let url = provider()
            .endpoint("weather", &Place::City(" São Paulo & co ".into()))
            .unwrap();
        assert_eq!(url.path(), "/data/2.5/weather");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("q".into(), "São Paulo & co".into())));
        assert!(pairs.contains(&("units".into(), "metric".into())));
        assert!(pairs.contains(&("appid".into(), "key".into())));
    }

    #[test]
    fn test_coordinate_query() {
        let url = provider()
            .endpoint(
                "forecast",
                &Place::Coordinates(Coordinates { lat: 41.01, lon: 28.97 }),
            )
            .unwrap();
        let query = url.query().unwrap_or_default();
        assert!(query.contains("lat=41.01"));
        assert!(query.contains("lon=28.97"));
    }

    #[test]
    fn test_convert_current_takes_first_condition() {
        let body: OwmCurrentResponse = serde_json::from_value(serde_json::json!({
            "name": "Istanbul",
            "coord": {"lat": 41.0, "lon": 29.0},
            "weather": [{"main": "Rain", "description": "light rain"}, {"main": "Mist"}],
            "main": {"temp": 14.2, "feels_like": 13.0, "humidity": 88, "pressure": 1009},
            "wind": {"speed": 4.1},
            "dt": 1_750_000_000,
            "visibility": 8000,
            "sys": {"sunrise": 1_749_960_000, "sunset": 1_750_013_000}
        }))
        .unwrap();

        let snapshot = convert_current(body);
        assert_eq!(snapshot.city_name, "Istanbul");
        assert_eq!(snapshot.condition_main, "Rain");
        assert_eq!(snapshot.description, "light rain");
        assert_eq!(snapshot.humidity, Some(88));
        assert_eq!(snapshot.coordinates, Some(Coordinates { lat: 41.0, lon: 29.0 }));
        assert!(snapshot.observed_at.is_some());
        assert_eq!(snapshot.pressure, Some(1009.0));
        assert_eq!(snapshot.visibility, Some(8000));
        assert_eq!(snapshot.sunrise, timestamp(1_749_960_000));
        assert_eq!(snapshot.sunset, timestamp(1_750_013_000));
    }

    #[test]
    fn test_convert_current_without_sys() {
        let body: OwmCurrentResponse = serde_json::from_value(serde_json::json!({
            "main": {"temp": 3.0}
        }))
        .unwrap();

        let snapshot = convert_current(body);
        assert_eq!(snapshot.pressure, None);
        assert_eq!(snapshot.visibility, None);
        assert_eq!(snapshot.sunrise, None);
    }

    #[test]
    fn test_convert_forecast_optional_rain() {
        let body: OwmForecastResponse = serde_json::from_value(serde_json::json!({
            "list": [
                {"dt": 1_750_000_000, "weather": [{"main": "Rain"}], "rain": {"3h": 12.5}},
                {"dt": 1_750_010_800, "weather": [{"main": "Clear"}]},
                {"dt": 1_750_021_600, "weather": [], "rain": {"1h": 6.0}}
            ]
        }))
        .unwrap();

        let forecast = convert_forecast(body);
        assert_eq!(forecast.entries.len(), 3);
        assert_eq!(forecast.entries[0].rain_3h, Some(12.5));
        assert_eq!(forecast.entries[1].rain_3h, None);
        assert_eq!(forecast.entries[2].condition_main, "");
        assert_eq!(forecast.entries[2].rain_1h, Some(6.0));
    }

    #[test]
    fn test_convert_forecast_keeps_secondary_conditions() {
        let body: OwmForecastResponse = serde_json::from_value(serde_json::json!({
            "city": {"timezone": 10_800},
            "list": [{
                "dt": 1_750_000_000,
                "main": {"temp": 19.0, "temp_min": 17.5, "temp_max": 20.1},
                "weather": [
                    {"main": "Rain", "description": "moderate rain"},
                    {"main": "Thunderstorm", "description": "thunderstorm"}
                ]
            }]
        }))
        .unwrap();

        let forecast = convert_forecast(body);
        let entry = &forecast.entries[0];
        assert_eq!(entry.condition_main, "Rain");
        assert_eq!(entry.conditions, vec!["Rain", "Thunderstorm"]);
        assert_eq!(entry.description, "moderate rain");
        assert_eq!(entry.temp_min, Some(17.5));
        assert_eq!(entry.temp_max, Some(20.1));
        assert_eq!(forecast.utc_offset_secs, 10_800);

        let alerts = crate::alerts::derive(&WeatherSnapshot::new(19.0, 2.0, "Rain"), &forecast);
        assert!(alerts.iter().any(|a| a.kind == crate::alerts::AlertKind::Thunderstorm));
    }

    #[test]
    fn test_forecast_without_list() {
        let body: OwmForecastResponse = serde_json::from_str("{}").unwrap();
        assert!(convert_forecast(body).entries.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_coordinates_rejected_before_request() {
        let err = provider()
            .current(&Place::Coordinates(Coordinates { lat: 120.0, lon: 0.0 }))
            .await
            .unwrap_err();
        assert!(matches!(err, WeatherError::InvalidCoordinates { .. }));
    }

    #[tokio::test]
    async fn test_blank_city_rejected_before_request() {
        let err = provider().current(&Place::City("  ".into())).await.unwrap_err();
        assert!(matches!(err, WeatherError::NotFound(_)));
    }
}
