//! Prediction engine
//!
//! Trains the regression ensemble from a reference panel of cities and serves
//! single-city predictions and panel-wide comparisons.
//!
//! The engine moves from untrained to trained once. Training runs behind a
//! single-flight gate on a spawned task, so a request that is dropped while
//! waiting leaves the run going. A fitted ensemble is published as one `Arc`
//! so readers never observe a half-trained state.

use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use serde::Serialize;
use std::{future::Future, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::{ComparisonRecord, PredictionResult, WeatherObservation};
use crate::ml::{ModelKind, ModelPredictions, TrainedEnsemble, TrainingDataset, TrainingError, TrainingMetrics};
use crate::weather::WeatherSource;

/// Panel cities fetched at once during training and comparison.
const PANEL_FETCH_CONCURRENCY: usize = 4;

/// Report of a successful training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub run_id: Uuid,
    pub samples: usize,
    pub skipped_cities: Vec<String>,
    pub metrics: TrainingMetrics,
    pub best_model: ModelKind,
    pub trained_at: DateTime<Utc>,
}

pub struct PredictionEngine {
    shared: Arc<Shared>,
}

/// State reachable from detached training runs
struct Shared {
    weather: Arc<dyn WeatherSource>,
    reference_cities: Vec<String>,
    ensemble: RwLock<Option<Arc<TrainedEnsemble>>>,
    training_gate: Mutex<()>,
}

impl PredictionEngine {
    pub fn new(weather: Arc<dyn WeatherSource>, reference_cities: Vec<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                weather,
                reference_cities,
                ensemble: RwLock::new(None),
                training_gate: Mutex::new(()),
            }),
        }
    }

    pub async fn is_trained(&self) -> bool {
        self.shared.published().await.is_some()
    }

    pub async fn metrics(&self) -> Option<TrainingMetrics> {
        self.shared.published().await.map(|e| e.metrics())
    }

    pub async fn best_model(&self) -> Option<ModelKind> {
        self.shared.published().await.map(|e| e.best_model())
    }

    /// Fetch the reference panel and fit a fresh ensemble.
    ///
    /// On failure the previously published state, if any, is left untouched.
    pub async fn train(&self) -> Result<TrainingSummary, TrainingError> {
        let shared = self.shared.clone();
        run_detached(async move {
            let _gate = shared.training_gate.lock().await;
            shared.train_locked().await.map(|(summary, _)| summary)
        })
        .await
    }

    /// Current ensemble, training first if none has been published yet.
    async fn ensure_trained(&self) -> Result<Arc<TrainedEnsemble>, TrainingError> {
        if let Some(e) = self.shared.published().await {
            return Ok(e);
        }

        let shared = self.shared.clone();
        run_detached(async move {
            let _gate = shared.training_gate.lock().await;
            // Another caller may have finished training while we waited
            if let Some(e) = shared.published().await {
                return Ok(e);
            }
            shared.train_locked().await.map(|(_, e)| e)
        })
        .await
    }

    fn run_models(
        ensemble: &TrainedEnsemble,
        obs: &WeatherObservation,
    ) -> Option<ModelPredictions> {
        match ensemble.predict(&obs.features()) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!(city = %obs.city, error = %e, "model evaluation failed");
                None
            }
        }
    }

    /// Predict the current temperature of `city`.
    ///
    /// `Ok(None)` means the city's conditions could not be fetched.
    #[instrument(skip(self))]
    pub async fn predict(&self, city: &str) -> Result<Option<PredictionResult>, TrainingError> {
        let ensemble = self.ensure_trained().await?;

        let Some(obs) = self.shared.weather.fetch_current(city).await else {
            return Ok(None);
        };
        let Some(predictions) = Self::run_models(&ensemble, &obs) else {
            return Ok(None);
        };
        let forecast = self.shared.weather.fetch_forecast(city).await;

        let best_model = ensemble.best_model();
        Ok(Some(PredictionResult {
            predicted_temp: predictions.get(best_model),
            predictions,
            actual_temp: obs.temp,
            city_data: obs,
            forecast,
            metrics: ensemble.metrics(),
            best_model,
        }))
    }

    /// Best-model error for every reference city that can be fetched now.
    pub async fn comparison(&self) -> Result<Vec<ComparisonRecord>, TrainingError> {
        let ensemble = self.ensure_trained().await?;
        let best_model = ensemble.best_model();

        let records = self
            .shared
            .fetch_panel()
            .await
            .into_iter()
            .filter_map(|(city, obs)| {
                let obs = obs?;
                let predictions = Self::run_models(&ensemble, &obs)?;
                let predicted_temp = predictions.get(best_model);
                Some(ComparisonRecord {
                    city,
                    actual_temp: obs.temp,
                    predicted_temp,
                    predictions,
                    error: (obs.temp - predicted_temp).abs(),
                })
            })
            .collect();

        Ok(records)
    }
}

/// Run a training step on its own task so a caller that stops waiting
/// cannot cancel it halfway.
async fn run_detached<T, F>(run: F) -> Result<T, TrainingError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, TrainingError>> + Send + 'static,
{
    match tokio::spawn(run).await {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(_) => Err(TrainingError::Interrupted),
    }
}

impl Shared {
    async fn published(&self) -> Option<Arc<TrainedEnsemble>> {
        self.ensemble.read().await.clone()
    }

    /// Caller holds `training_gate`.
    #[instrument(skip(self), fields(run_id))]
    async fn train_locked(&self) -> Result<(TrainingSummary, Arc<TrainedEnsemble>), TrainingError> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));

        let fetched = self.fetch_panel().await;
        let mut observations = Vec::with_capacity(fetched.len());
        let mut skipped_cities = Vec::new();
        for (city, obs) in fetched {
            match obs {
                Some(obs) => observations.push(obs),
                None => skipped_cities.push(city),
            }
        }

        let dataset = TrainingDataset::from_observations(&observations);
        let ensemble = match TrainedEnsemble::fit(&dataset) {
            Ok(e) => Arc::new(e),
            Err(e) => {
                warn!(error = %e, skipped = skipped_cities.len(), "training failed");
                return Err(e);
            }
        };

        let summary = TrainingSummary {
            run_id,
            samples: ensemble.training_samples(),
            skipped_cities,
            metrics: ensemble.metrics(),
            best_model: ensemble.best_model(),
            trained_at: ensemble.trained_at(),
        };
        info!(
            samples = summary.samples,
            skipped = summary.skipped_cities.len(),
            best_model = %summary.best_model,
            lr_r2 = summary.metrics.lr.r2,
            rf_r2 = summary.metrics.rf.r2,
            gb_r2 = summary.metrics.gb.r2,
            "ensemble trained"
        );

        *self.ensemble.write().await = Some(ensemble.clone());
        Ok((summary, ensemble))
    }

    /// Panel observations in panel order; `None` where the fetch failed.
    async fn fetch_panel(&self) -> Vec<(String, Option<WeatherObservation>)> {
        stream::iter(self.reference_cities.iter().cloned())
            .map(|city| async move {
                let obs = self.weather.fetch_current(&city).await;
                (city, obs)
            })
            .buffered(PANEL_FETCH_CONCURRENCY)
            .collect()
            .await
    }
}
