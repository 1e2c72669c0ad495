use serde::{Deserialize, Serialize};

use super::{ForecastDay, WeatherObservation};
use crate::ml::{ModelKind, ModelPredictions, TrainingMetrics};

/// Outcome of a single-city prediction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Headline prediction, taken from `best_model`
    pub predicted_temp: f64,
    pub predictions: ModelPredictions,
    pub actual_temp: f64,
    pub city_data: WeatherObservation,
    pub forecast: Vec<ForecastDay>,
    pub metrics: TrainingMetrics,
    pub best_model: ModelKind,
}

/// One row of the reference-panel comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub city: String,
    pub actual_temp: f64,
    pub predicted_temp: f64,
    pub predictions: ModelPredictions,
    /// Absolute error of the headline prediction
    pub error: f64,
}
