//! Weather observation types shared by the weather source and the engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ml::{FeatureVector, FEATURE_NAMES};

/// Current conditions for one city, as returned by the weather source.
///
/// Every feature field is required; the provider layer rejects payloads
/// that are missing any of them before an observation is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    pub city: String,
    /// Air temperature (°C)
    pub temp: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    /// Sea-level pressure (hPa)
    pub pressure: f64,
    /// Wind speed (m/s)
    pub wind_speed: f64,
    /// Apparent temperature (°C)
    pub feels_like: f64,
    /// Cloud cover (%)
    pub clouds: f64,
    /// Visibility (m)
    pub visibility: f64,
    pub description: String,
    pub icon: String,
    /// PM2.5-derived air quality index, 0-500
    pub aqi: u16,
}

impl WeatherObservation {
    /// Model inputs in the fixed training order.
    pub fn features(&self) -> FeatureVector {
        FeatureVector::from_array(
            [
                self.humidity,
                self.pressure,
                self.wind_speed,
                self.feels_like,
                self.clouds,
                self.visibility,
            ],
            &FEATURE_NAMES,
        )
    }
}

/// One day of the 5-day outlook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    /// Short weekday label, e.g. "Mon"
    pub day_name: String,
    pub temp: f64,
    pub description: String,
    pub icon: String,
}
