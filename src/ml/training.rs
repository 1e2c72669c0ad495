//! ML Model Training Pipeline
//!
//! Turns a panel of observations into a `TrainedEnsemble`: scaler, three
//! fitted regressors, in-sample scores and the selected best model.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use super::models::{LinearRegressionModel, Regressor};
use super::smartcore::{
    GradientBoostingParameters, SmartcoreGradientBoosting, SmartcoreRandomForest,
};
use super::{
    FeatureVector, ModelError, ModelKind, ModelPredictions, ModelScore, StandardScaler,
    TrainingMetrics,
};
use crate::domain::WeatherObservation;

/// Fewest reference observations a training run accepts.
pub const MIN_TRAINING_SAMPLES: usize = 5;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("insufficient training data: {got} observations, need at least {required}")]
    InsufficientData { got: usize, required: usize },

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("training run was cancelled before it finished")]
    Interrupted,
}

/// Training Dataset
#[derive(Debug, Clone)]
pub struct TrainingDataset {
    pub features: Vec<FeatureVector>,
    pub targets: Vec<f64>,
}

impl TrainingDataset {
    /// Feature rows and temperature targets from current observations.
    pub fn from_observations(observations: &[WeatherObservation]) -> Self {
        Self {
            features: observations.iter().map(WeatherObservation::features).collect(),
            targets: observations.iter().map(|o| o.temp).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Everything produced by one successful training run.
///
/// Built whole and never mutated, so readers see either the previous run or
/// this one, never a mix.
#[derive(Debug)]
pub struct TrainedEnsemble {
    scaler: StandardScaler,
    linear: LinearRegressionModel,
    forest: SmartcoreRandomForest,
    boosting: SmartcoreGradientBoosting,
    metrics: TrainingMetrics,
    best: ModelKind,
    training_samples: usize,
    trained_at: DateTime<Utc>,
}

impl TrainedEnsemble {
    pub fn fit(dataset: &TrainingDataset) -> Result<Self, TrainingError> {
        if dataset.len() < MIN_TRAINING_SAMPLES {
            return Err(TrainingError::InsufficientData {
                got: dataset.len(),
                required: MIN_TRAINING_SAMPLES,
            });
        }

        let scaler = StandardScaler::fit(&dataset.features)?;
        let x = scaler.transform_all(&dataset.features)?;
        let y = &dataset.targets;

        let linear = LinearRegressionModel::fit(&x, y)?;
        let lr = ModelScore::calculate(&linear.predict_batch(&x)?, y)?;

        let forest = SmartcoreRandomForest::fit(&x, y, SmartcoreRandomForest::default_parameters())?;
        let rf = ModelScore::calculate(&forest.predict_batch(&x)?, y)?;

        let boosting = SmartcoreGradientBoosting::fit(&x, y, &GradientBoostingParameters::default())?;
        let gb = ModelScore::calculate(&boosting.predict_batch(&x)?, y)?;

        let metrics = TrainingMetrics { lr, rf, gb };
        let best = metrics.best_model();
        debug!(?metrics, %best, samples = dataset.len(), "ensemble fitted");

        Ok(Self {
            scaler,
            linear,
            forest,
            boosting,
            metrics,
            best,
            training_samples: dataset.len(),
            trained_at: Utc::now(),
        })
    }

    /// Scale one raw row with the frozen scaler and run every model on it.
    pub fn predict(&self, raw: &FeatureVector) -> Result<ModelPredictions, ModelError> {
        let scaled = self.scaler.transform(raw)?;
        Ok(ModelPredictions {
            lr: self.linear.predict(&scaled)?,
            rf: self.forest.predict(&scaled)?,
            gb: self.boosting.predict(&scaled)?,
        })
    }

    #[cfg(test)]
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn metrics(&self) -> TrainingMetrics {
        self.metrics
    }

    pub fn best_model(&self) -> ModelKind {
        self.best
    }

    pub fn training_samples(&self) -> usize {
        self.training_samples
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }
}
