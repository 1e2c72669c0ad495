//! OpenWeatherMap integration
//!
//! Current conditions, air pollution and the 5-day / 3-hour forecast from the
//! OpenWeatherMap 2.5 API, in metric units.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::WeatherError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Validated current-conditions payload
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentConditions {
    pub coord: Coordinates,
    pub temp: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub wind_speed: f64,
    pub feels_like: f64,
    pub clouds: f64,
    pub visibility: f64,
    pub description: String,
    pub icon: String,
}

/// One 3-hourly forecast slot
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastEntry {
    pub timestamp: NaiveDateTime,
    pub temp: f64,
    pub description: String,
    pub icon: String,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, city: &str) -> Result<CurrentConditions, WeatherError>;

    /// PM2.5 concentration (µg/m³) at a location
    async fn pm25(&self, coord: Coordinates) -> Result<f64, WeatherError>;

    async fn forecast(&self, city: &str) -> Result<Vec<ForecastEntry>, WeatherError>;
}

const CURRENT: &str = "current conditions";
const POLLUTION: &str = "air pollution";
const FORECAST: &str = "forecast";

/// OpenWeatherMap API client
#[derive(Clone)]
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenWeatherClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, WeatherError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("weather-predictor/", env!("CARGO_PKG_VERSION"))),
        );
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(WeatherError::Client)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, endpoint, "requesting OpenWeatherMap");

        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|source| WeatherError::Transport { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WeatherError::Status { endpoint, status });
        }

        response
            .json()
            .await
            .map_err(|source| WeatherError::Decode { endpoint, source })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, city: &str) -> Result<CurrentConditions, WeatherError> {
        let raw: RawCurrent = self
            .get_json(
                CURRENT,
                "weather",
                &[("q", city.to_string()), ("units", "metric".to_string())],
            )
            .await?;
        raw.try_into()
    }

    async fn pm25(&self, coord: Coordinates) -> Result<f64, WeatherError> {
        let raw: RawPollution = self
            .get_json(
                POLLUTION,
                "air_pollution",
                &[("lat", coord.lat.to_string()), ("lon", coord.lon.to_string())],
            )
            .await?;

        raw.list
            .first()
            .map(|sample| sample.components.pm2_5)
            .ok_or(WeatherError::MissingField {
                endpoint: POLLUTION,
                field: "list",
            })
    }

    async fn forecast(&self, city: &str) -> Result<Vec<ForecastEntry>, WeatherError> {
        let raw: RawForecast = self
            .get_json(
                FORECAST,
                "forecast",
                &[("q", city.to_string()), ("units", "metric".to_string())],
            )
            .await?;

        raw.list.into_iter().map(ForecastEntry::try_from).collect()
    }
}

fn required<T>(value: Option<T>, endpoint: &'static str, field: &'static str) -> Result<T, WeatherError> {
    value.ok_or(WeatherError::MissingField { endpoint, field })
}

fn first_condition(
    conditions: Vec<RawCondition>,
    endpoint: &'static str,
) -> Result<(String, String), WeatherError> {
    let condition = required(conditions.into_iter().next(), endpoint, "weather")?;
    Ok((
        required(condition.description, endpoint, "weather[0].description")?,
        required(condition.icon, endpoint, "weather[0].icon")?,
    ))
}

impl TryFrom<RawCurrent> for CurrentConditions {
    type Error = WeatherError;

    fn try_from(raw: RawCurrent) -> Result<Self, Self::Error> {
        let coord = required(raw.coord, CURRENT, "coord")?;
        let main = required(raw.main, CURRENT, "main")?;
        let wind = required(raw.wind, CURRENT, "wind")?;
        let clouds = required(raw.clouds, CURRENT, "clouds")?;
        let (description, icon) = first_condition(raw.weather, CURRENT)?;

        Ok(Self {
            coord: Coordinates {
                lat: required(coord.lat, CURRENT, "coord.lat")?,
                lon: required(coord.lon, CURRENT, "coord.lon")?,
            },
            temp: required(main.temp, CURRENT, "main.temp")?,
            humidity: required(main.humidity, CURRENT, "main.humidity")?,
            pressure: required(main.pressure, CURRENT, "main.pressure")?,
            wind_speed: required(wind.speed, CURRENT, "wind.speed")?,
            feels_like: required(main.feels_like, CURRENT, "main.feels_like")?,
            clouds: required(clouds.all, CURRENT, "clouds.all")?,
            visibility: required(raw.visibility, CURRENT, "visibility")?,
            description,
            icon,
        })
    }
}

impl TryFrom<RawForecastItem> for ForecastEntry {
    type Error = WeatherError;

    fn try_from(raw: RawForecastItem) -> Result<Self, Self::Error> {
        let dt_txt = required(raw.dt_txt, FORECAST, "list[].dt_txt")?;
        let timestamp = NaiveDateTime::parse_from_str(&dt_txt, "%Y-%m-%d %H:%M:%S").map_err(|_| {
            WeatherError::InvalidField {
                endpoint: FORECAST,
                field: "list[].dt_txt",
                value: dt_txt.clone(),
            }
        })?;
        let main = required(raw.main, FORECAST, "list[].main")?;
        let (description, icon) = first_condition(raw.weather, FORECAST)?;

        Ok(Self {
            timestamp,
            temp: required(main.temp, FORECAST, "list[].main.temp")?,
            description,
            icon,
        })
    }
}

// OpenWeatherMap response structures. Fields are optional so that a missing
// field surfaces as `MissingField` rather than a generic decode error.
#[derive(Debug, Deserialize)]
struct RawCurrent {
    coord: Option<RawCoord>,
    main: Option<RawMain>,
    wind: Option<RawWind>,
    clouds: Option<RawClouds>,
    visibility: Option<f64>,
    #[serde(default)]
    weather: Vec<RawCondition>,
}

#[derive(Debug, Deserialize)]
struct RawCoord {
    lat: Option<f64>,
    lon: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawWind {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawClouds {
    all: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawCondition {
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPollution {
    #[serde(default)]
    list: Vec<RawPollutionSample>,
}

#[derive(Debug, Deserialize)]
struct RawPollutionSample {
    components: RawComponents,
}

#[derive(Debug, Deserialize)]
struct RawComponents {
    #[serde(default)]
    pm2_5: f64,
}

#[derive(Debug, Deserialize)]
struct RawForecast {
    #[serde(default)]
    list: Vec<RawForecastItem>,
}

#[derive(Debug, Deserialize)]
struct RawForecastItem {
    dt_txt: Option<String>,
    main: Option<RawForecastMain>,
    #[serde(default)]
    weather: Vec<RawCondition>,
}

#[derive(Debug, Deserialize)]
struct RawForecastMain {
    temp: Option<f64>,
}
