use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::ml::ModelKind;

/// Upper bound on rows returned by a single history read
pub const MAX_HISTORY_LIMIT: u32 = 500;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Prediction outcome to append
#[derive(Debug, Clone)]
pub struct NewPrediction {
    pub city: String,
    pub actual_temp: f64,
    pub predicted_temp: f64,
    pub model_used: ModelKind,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PredictionRecord {
    pub id: i64,
    pub city: String,
    pub actual_temp: f64,
    pub predicted_temp: f64,
    pub error: f64,
    #[sqlx(try_from = "String")]
    pub model_used: ModelKind,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub wind_speed: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate error statistics over every stored prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryStats {
    pub total_predictions: i64,
    pub avg_error: f64,
    pub min_error: f64,
    pub max_error: f64,
    pub cities_predicted: i64,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Append-only store of prediction outcomes
#[derive(Clone)]
pub struct PredictionHistoryRepository {
    pool: SqlitePool,
}

impl PredictionHistoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append a prediction. The absolute error and timestamp are assigned here.
    pub async fn save_prediction(&self, prediction: &NewPrediction) -> Result<i64, HistoryError> {
        let error = (prediction.actual_temp - prediction.predicted_temp).abs();

        let result = sqlx::query(
            r#"
            INSERT INTO predictions
                (city, actual_temp, predicted_temp, error, model_used, humidity, pressure, wind_speed, timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&prediction.city)
        .bind(prediction.actual_temp)
        .bind(prediction.predicted_temp)
        .bind(error)
        .bind(prediction.model_used.to_string())
        .bind(prediction.humidity)
        .bind(prediction.pressure)
        .bind(prediction.wind_speed)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Most recent records first, optionally restricted to one city.
    pub async fn get_history(
        &self,
        limit: u32,
        city: Option<&str>,
    ) -> Result<Vec<PredictionRecord>, HistoryError> {
        let limit = i64::from(limit.min(MAX_HISTORY_LIMIT));

        let records = match city {
            Some(city) => {
                sqlx::query_as::<_, PredictionRecord>(
                    r#"
                    SELECT id, city, actual_temp, predicted_temp, error, model_used,
                           humidity, pressure, wind_speed, timestamp
                    FROM predictions
                    WHERE city = ?
                    ORDER BY timestamp DESC, id DESC
                    LIMIT ?
                    "#,
                )
                .bind(city)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, PredictionRecord>(
                    r#"
                    SELECT id, city, actual_temp, predicted_temp, error, model_used,
                           humidity, pressure, wind_speed, timestamp
                    FROM predictions
                    ORDER BY timestamp DESC, id DESC
                    LIMIT ?
                    "#,
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(records)
    }

    pub async fn health_check(&self) -> Result<(), HistoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn get_stats(&self) -> Result<HistoryStats, HistoryError> {
        let (total, avg, min, max, cities): (i64, Option<f64>, Option<f64>, Option<f64>, i64) =
            sqlx::query_as(
                r#"
                SELECT COUNT(*), AVG(error), MIN(error), MAX(error), COUNT(DISTINCT city)
                FROM predictions
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        if total == 0 {
            return Ok(HistoryStats::default());
        }

        Ok(HistoryStats {
            total_predictions: total,
            avg_error: round2(avg.unwrap_or_default()),
            min_error: round2(min.unwrap_or_default()),
            max_error: round2(max.unwrap_or_default()),
            cities_predicted: cities,
        })
    }
}
