//! Weather data for prediction: OpenWeatherMap access, AQI derivation,
//! daily forecast selection and per-city TTL caching.

pub mod aqi;
pub mod cache;
pub mod daily;
pub mod provider;
pub mod source;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{ForecastDay, WeatherObservation};

pub use aqi::aqi_from_pm25;
pub use cache::{FetchAborted, TtlCache};
pub use daily::select_daily;
pub use provider::{Coordinates, CurrentConditions, ForecastEntry, OpenWeatherClient, WeatherProvider};
pub use source::CachingWeatherSource;

/// Provider failures. The weather source turns these into absent results.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{endpoint} request failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },

    #[error("{endpoint} payload could not be decoded: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} payload is missing `{field}`")]
    MissingField {
        endpoint: &'static str,
        field: &'static str,
    },

    #[error("{endpoint} field `{field}` has unexpected value {value:?}")]
    InvalidField {
        endpoint: &'static str,
        field: &'static str,
        value: String,
    },

    #[error(transparent)]
    Aborted(#[from] FetchAborted),
}

/// Cached access to current conditions and the daily outlook.
///
/// Neither call fails: an unavailable city is `None` or an empty outlook.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_current(&self, city: &str) -> Option<WeatherObservation>;

    async fn fetch_forecast(&self, city: &str) -> Vec<ForecastDay>;
}
