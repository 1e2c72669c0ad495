use axum::{
    extract::{rejection::FormRejection, State},
    Form, Json,
};
use serde::Deserialize;
use tracing::warn;

use super::error::ApiError;
use crate::{
    controller::AppState,
    domain::{ComparisonRecord, PredictionResult},
    repo::NewPrediction,
};

#[derive(Debug, Deserialize)]
pub struct PredictForm {
    #[serde(default)]
    pub city: Option<String>,
}

/// POST /predict - predict the current temperature of one city
pub async fn predict(
    State(state): State<AppState>,
    form: Result<Form<PredictForm>, FormRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let city = form
        .ok()
        .and_then(|Form(f)| f.city)
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::BadRequest("City is required".to_string()))?;

    let result = state.engine.predict(&city).await?.ok_or_else(|| {
        ApiError::WeatherUnavailable(format!("could not fetch weather data for {city}"))
    })?;

    let record = NewPrediction {
        city: city.clone(),
        actual_temp: result.actual_temp,
        predicted_temp: result.predicted_temp,
        model_used: result.best_model,
        humidity: Some(result.city_data.humidity),
        pressure: Some(result.city_data.pressure),
        wind_speed: Some(result.city_data.wind_speed),
    };
    if let Err(e) = state.repos.history.save_prediction(&record).await {
        warn!(city = %city, error = %e, "failed to record prediction history");
    }

    Ok(Json(result))
}

/// GET /compare - best-model error across the reference panel
pub async fn compare(
    State(state): State<AppState>,
) -> Result<Json<Vec<ComparisonRecord>>, ApiError> {
    Ok(Json(state.engine.comparison().await?))
}
