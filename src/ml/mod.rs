//! Machine Learning Module
//!
//! Temperature regression over current-conditions features:
//! - Feature vectors in a fixed order and a z-score scaler
//! - Linear, random-forest and gradient-boosting regressors
//! - In-sample scoring and best-model selection
//!
//! # Architecture
//! - `scaler`: zero-mean / unit-variance scaling fit once per training run
//! - `models`: the `Regressor` trait and least-squares linear regression
//! - `smartcore`: tree ensembles built on SmartCore
//! - `training`: dataset assembly and the `TrainedEnsemble`

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

pub mod models;
pub mod scaler;
pub mod smartcore;
pub mod training;

pub use models::{LinearRegressionModel, Regressor};
pub use scaler::StandardScaler;
pub use training::{TrainedEnsemble, TrainingDataset, TrainingError};

/// Model inputs, in the order every feature vector uses.
pub const FEATURE_NAMES: [&str; 6] = [
    "humidity",
    "pressure",
    "wind_speed",
    "feels_like",
    "clouds",
    "visibility",
];

/// Errors raised while fitting or evaluating a model
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot fit on an empty dataset")]
    EmptyDataset,

    #[error("feature/target count mismatch: {features} rows, {targets} targets")]
    LengthMismatch { features: usize, targets: usize },

    #[error("feature count mismatch: expected {expected}, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    #[error("{model} fit failed: {reason}")]
    Fit { model: ModelKind, reason: String },

    #[error("{model} prediction failed: {reason}")]
    Predict { model: ModelKind, reason: String },
}

/// The three regression variants of the ensemble.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum ModelKind {
    #[serde(rename = "lr")]
    #[strum(serialize = "lr")]
    LinearRegression,
    #[serde(rename = "rf")]
    #[strum(serialize = "rf")]
    RandomForest,
    #[serde(rename = "gb")]
    #[strum(serialize = "gb")]
    GradientBoosting,
}

impl ModelKind {
    /// Tie-break order for best-model selection, most preferred first.
    pub const PREFERENCE: [ModelKind; 3] = [
        ModelKind::GradientBoosting,
        ModelKind::RandomForest,
        ModelKind::LinearRegression,
    ];
}

impl TryFrom<String> for ModelKind {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// In-sample fit quality of one model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub r2: f64,
    pub mse: f64,
}

impl ModelScore {
    /// Score predictions against the targets they were trained on.
    pub fn calculate(predictions: &[f64], targets: &[f64]) -> Result<Self, ModelError> {
        if predictions.len() != targets.len() {
            return Err(ModelError::LengthMismatch {
                features: predictions.len(),
                targets: targets.len(),
            });
        }
        if predictions.is_empty() {
            return Err(ModelError::EmptyDataset);
        }

        let n = predictions.len() as f64;

        let ss_res: f64 = predictions
            .iter()
            .zip(targets.iter())
            .map(|(p, t)| (t - p).powi(2))
            .sum();
        let mse = ss_res / n;

        let mean_target: f64 = targets.iter().sum::<f64>() / n;
        let ss_tot: f64 = targets.iter().map(|t| (t - mean_target).powi(2)).sum();

        // Constant targets: a perfect fit scores 1, anything else 0
        let r2 = if ss_tot.abs() < 1e-10 {
            if ss_res.abs() < 1e-10 {
                1.0
            } else {
                0.0
            }
        } else {
            1.0 - (ss_res / ss_tot)
        };

        Ok(Self { r2, mse })
    }
}

/// Per-model scores from the last successful training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub lr: ModelScore,
    pub rf: ModelScore,
    pub gb: ModelScore,
}

impl TrainingMetrics {
    pub fn get(&self, kind: ModelKind) -> ModelScore {
        match kind {
            ModelKind::LinearRegression => self.lr,
            ModelKind::RandomForest => self.rf,
            ModelKind::GradientBoosting => self.gb,
        }
    }

    /// Highest R² wins; ties go to the earlier entry in `ModelKind::PREFERENCE`.
    pub fn best_model(&self) -> ModelKind {
        let best_r2 = ModelKind::PREFERENCE
            .iter()
            .map(|k| self.get(*k).r2)
            .filter(|r2| !r2.is_nan())
            .fold(f64::NEG_INFINITY, f64::max);

        ModelKind::PREFERENCE
            .into_iter()
            .find(|k| self.get(*k).r2 == best_r2)
            .unwrap_or(ModelKind::GradientBoosting)
    }
}

/// Output of every model for one input row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPredictions {
    pub lr: f64,
    pub rf: f64,
    pub gb: f64,
}

impl ModelPredictions {
    pub fn get(&self, kind: ModelKind) -> f64 {
        match kind {
            ModelKind::LinearRegression => self.lr,
            ModelKind::RandomForest => self.rf,
            ModelKind::GradientBoosting => self.gb,
        }
    }
}

/// Feature Vector for ML models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub features: Vec<f64>,
    pub feature_names: Vec<String>,
}

impl FeatureVector {
    pub fn from_array<const N: usize>(features: [f64; N], names: &[&str; N]) -> Self {
        Self {
            features: features.to_vec(),
            feature_names: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Standardize features using z-score normalization
    pub fn standardize(&self, means: &[f64], stds: &[f64]) -> Result<Self, ModelError> {
        if means.len() != self.features.len() || stds.len() != self.features.len() {
            return Err(ModelError::FeatureMismatch {
                expected: means.len(),
                got: self.features.len(),
            });
        }

        let standardized = self
            .features
            .iter()
            .zip(means.iter().zip(stds.iter()))
            .map(|(f, (mean, std))| {
                if std.abs() < 1e-10 {
                    0.0
                } else {
                    (f - mean) / std
                }
            })
            .collect();

        Ok(Self {
            features: standardized,
            feature_names: self.feature_names.clone(),
        })
    }
}
