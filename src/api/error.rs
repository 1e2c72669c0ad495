use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ml::TrainingError;
use crate::repo::HistoryError;

/// Errors returned from request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Weather data unavailable: {0}")]
    WeatherUnavailable(String),

    #[error("Model not trained: {0}")]
    TrainingUnavailable(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::WeatherUnavailable(_) => StatusCode::BAD_GATEWAY,
            ApiError::TrainingUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::WeatherUnavailable(_) => "WeatherUnavailable",
            ApiError::TrainingUnavailable(_) => "TrainingUnavailable",
            ApiError::DatabaseError(_) => "DatabaseError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = match &self {
            ApiError::DatabaseError(_) => {
                tracing::error!(error = %self, "request failed");
                "An internal error occurred".to_string()
            }
            ApiError::WeatherUnavailable(_) | ApiError::TrainingUnavailable(_) => {
                tracing::warn!(error = %self, "upstream unavailable");
                self.to_string()
            }
            ApiError::BadRequest(_) => {
                tracing::debug!(error = %self, "client error");
                self.to_string()
            }
        };

        let body = ErrorResponse {
            error: self.error_type().to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<TrainingError> for ApiError {
    fn from(error: TrainingError) -> Self {
        ApiError::TrainingUnavailable(error.to_string())
    }
}

impl From<HistoryError> for ApiError {
    fn from(error: HistoryError) -> Self {
        ApiError::DatabaseError(error.to_string())
    }
}
