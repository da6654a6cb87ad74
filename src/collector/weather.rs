//! Current-weather collector.
//!
//! Polls the OpenWeatherMap current-weather endpoint and reports a set of
//! gauges labeled by city. All metrics derive from one JSON response, so
//! the fetch is all-or-nothing: any failure of the single call fails the
//! whole cycle for this collector. Fields absent from an otherwise valid
//! payload are reported as 0 rather than omitted, since the payload shape
//! is otherwise guaranteed.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::collector::{Collector, CollectorError};
use crate::config::WeatherConfig;
use crate::metrics::{MetricDefinition, Sample};

/// Metric names, one per reported field.
const TEMPERATURE: &str = "weather_temperature_celsius";
const FEELS_LIKE: &str = "weather_feels_like_celsius";
const HUMIDITY: &str = "weather_humidity_percent";
const PRESSURE: &str = "weather_pressure_hpa";
const WIND_SPEED: &str = "weather_wind_speed_mps";
const WIND_DIRECTION: &str = "weather_wind_direction_deg";
const CLOUDINESS: &str = "weather_cloudiness_percent";
const VISIBILITY: &str = "weather_visibility_km";
const RAIN_VOLUME: &str = "weather_rain_volume_mm";
const SNOW_VOLUME: &str = "weather_snow_volume_mm";
const UV_INDEX: &str = "weather_uv_index";
const SUNRISE: &str = "weather_sunrise_timestamp";
const SUNSET: &str = "weather_sunset_timestamp";

/// Current-weather payload. Every section is optional and defaults to
/// zeroed values; precipitation sections are simply absent in dry weather.
#[derive(Debug, Default, Deserialize)]
struct WeatherPayload {
    #[serde(default)]
    main: MainConditions,
    #[serde(default)]
    wind: Wind,
    #[serde(default)]
    clouds: Clouds,
    #[serde(default)]
    sys: DayCycle,
    #[serde(default)]
    rain: Precipitation,
    #[serde(default)]
    snow: Precipitation,
    /// Visibility in meters.
    #[serde(default)]
    visibility: f64,
}

#[derive(Debug, Default, Deserialize)]
struct MainConditions {
    #[serde(default)]
    temp: f64,
    #[serde(default)]
    feels_like: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    pressure: f64,
}

#[derive(Debug, Default, Deserialize)]
struct Wind {
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    deg: f64,
}

#[derive(Debug, Default, Deserialize)]
struct Clouds {
    #[serde(default)]
    all: f64,
}

#[derive(Debug, Default, Deserialize)]
struct DayCycle {
    #[serde(default)]
    sunrise: f64,
    #[serde(default)]
    sunset: f64,
}

#[derive(Debug, Default, Deserialize)]
struct Precipitation {
    #[serde(default, rename = "1h")]
    one_hour: f64,
}

/// Remote-API adapter for current weather.
pub struct WeatherCollector {
    config: WeatherConfig,
    client: Client,
}

impl std::fmt::Debug for WeatherCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherCollector")
            .field("city", &self.config.city)
            .field("url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl WeatherCollector {
    /// Create a collector with its own HTTP client.
    ///
    /// # Errors
    /// Returns [`CollectorError::Other`] if the HTTP client cannot be built.
    pub fn new(config: WeatherConfig) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CollectorError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Convert a parsed payload into samples, one per declared metric.
    fn samples_from(&self, payload: &WeatherPayload) -> Vec<Sample> {
        let city = self.config.city.as_str();
        let labeled = |metric: &str, value: f64| Sample::with_labels(metric, &[city], value);

        // Visibility arrives in meters; expose kilometers.
        let visibility_km = if payload.visibility > 0.0 {
            payload.visibility / 1000.0
        } else {
            0.0
        };

        vec![
            labeled(TEMPERATURE, payload.main.temp),
            labeled(FEELS_LIKE, payload.main.feels_like),
            labeled(HUMIDITY, payload.main.humidity),
            labeled(PRESSURE, payload.main.pressure),
            labeled(WIND_SPEED, payload.wind.speed),
            labeled(WIND_DIRECTION, payload.wind.deg),
            labeled(CLOUDINESS, payload.clouds.all),
            labeled(VISIBILITY, visibility_km),
            labeled(RAIN_VOLUME, payload.rain.one_hour),
            labeled(SNOW_VOLUME, payload.snow.one_hour),
            // The current-weather endpoint never carries a UV index; a
            // separate one-call subscription would. Reported as 0.
            labeled(UV_INDEX, 0.0),
            labeled(SUNRISE, payload.sys.sunrise),
            labeled(SUNSET, payload.sys.sunset),
        ]
    }
}

#[async_trait::async_trait]
impl Collector for WeatherCollector {
    fn name(&self) -> &str {
        "weather"
    }

    fn definitions(&self) -> Vec<MetricDefinition> {
        let city = &["city"];
        vec![
            MetricDefinition::gauge_with_labels(
                TEMPERATURE,
                "Current temperature in Celsius",
                city,
            ),
            MetricDefinition::gauge_with_labels(
                FEELS_LIKE,
                "Feels-like temperature in Celsius",
                city,
            ),
            MetricDefinition::gauge_with_labels(HUMIDITY, "Current humidity percentage", city),
            MetricDefinition::gauge_with_labels(PRESSURE, "Atmospheric pressure in hPa", city),
            MetricDefinition::gauge_with_labels(WIND_SPEED, "Wind speed in m/s", city),
            MetricDefinition::gauge_with_labels(WIND_DIRECTION, "Wind direction in degrees", city),
            MetricDefinition::gauge_with_labels(CLOUDINESS, "Cloud coverage percentage", city),
            MetricDefinition::gauge_with_labels(VISIBILITY, "Visibility in kilometers", city),
            MetricDefinition::gauge_with_labels(
                RAIN_VOLUME,
                "Rain volume in last hour in mm",
                city,
            ),
            MetricDefinition::gauge_with_labels(
                SNOW_VOLUME,
                "Snow volume in last hour in mm",
                city,
            ),
            MetricDefinition::gauge_with_labels(UV_INDEX, "UV index", city),
            MetricDefinition::gauge_with_labels(SUNRISE, "Sunrise timestamp (Unix)", city),
            MetricDefinition::gauge_with_labels(SUNSET, "Sunset timestamp (Unix)", city),
        ]
    }

    async fn fetch(&self) -> Result<Vec<Sample>, CollectorError> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("q", self.config.city.as_str()),
                ("appid", self.config.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(CollectorError::Authorization(format!(
                    "weather API rejected the key (HTTP {})",
                    response.status().as_u16()
                )));
            }
            StatusCode::NOT_FOUND => {
                return Err(CollectorError::NotFound(format!(
                    "city '{}' not found",
                    self.config.city
                )));
            }
            status => {
                return Err(CollectorError::Other(format!(
                    "weather API returned HTTP {}",
                    status.as_u16()
                )));
            }
        }

        let payload: WeatherPayload = response.json().await?;

        tracing::debug!(
            city = %self.config.city,
            temp = payload.main.temp,
            humidity = payload.main.humidity,
            "Weather data fetched"
        );

        Ok(self.samples_from(&payload))
    }
}

/// Default per-request timeout (30 seconds).
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> WeatherConfig {
        WeatherConfig {
            api_key: "0123456789abcdef".into(),
            city: "London".into(),
            base_url: "http://127.0.0.1:1/weather".into(),
            timeout: Duration::from_secs(1),
        }
    }

    fn collector() -> WeatherCollector {
        WeatherCollector::new(test_config()).unwrap()
    }

    #[test]
    fn test_definitions_cover_all_metrics() {
        let defs = collector().definitions();
        assert_eq!(defs.len(), 13);
        assert!(defs.iter().all(|d| d.labels == vec!["city".to_string()]));
    }

    #[test]
    fn test_full_payload_parses() {
        let payload: WeatherPayload = serde_json::from_str(
            r#"{
                "main": {"temp": 18.5, "feels_like": 17.9, "humidity": 72, "pressure": 1012},
                "wind": {"speed": 4.6, "deg": 250},
                "clouds": {"all": 75},
                "sys": {"sunrise": 1700000000, "sunset": 1700030000},
                "rain": {"1h": 0.3},
                "visibility": 10000
            }"#,
        )
        .unwrap();

        let samples = collector().samples_from(&payload);
        assert_eq!(samples.len(), 13);

        let value_of = |metric: &str| {
            samples
                .iter()
                .find(|s| s.metric == metric)
                .map(|s| s.value)
                .unwrap()
        };
        assert_eq!(value_of(TEMPERATURE), 18.5);
        assert_eq!(value_of(VISIBILITY), 10.0);
        assert_eq!(value_of(RAIN_VOLUME), 0.3);
        assert_eq!(value_of(SNOW_VOLUME), 0.0);
        assert_eq!(value_of(UV_INDEX), 0.0);
    }

    #[test]
    fn test_absent_fields_default_to_zero() {
        let payload: WeatherPayload =
            serde_json::from_str(r#"{"main": {"temp": 3.2}}"#).unwrap();

        let samples = collector().samples_from(&payload);
        let value_of = |metric: &str| {
            samples
                .iter()
                .find(|s| s.metric == metric)
                .map(|s| s.value)
                .unwrap()
        };
        assert_eq!(value_of(TEMPERATURE), 3.2);
        assert_eq!(value_of(HUMIDITY), 0.0);
        assert_eq!(value_of(WIND_SPEED), 0.0);
        assert_eq!(value_of(VISIBILITY), 0.0);
        assert_eq!(value_of(SUNRISE), 0.0);
    }

    #[test]
    fn test_samples_carry_city_label() {
        let samples = collector().samples_from(&WeatherPayload::default());
        assert!(samples.iter().all(|s| s.labels == vec!["London".to_string()]));
    }
}
