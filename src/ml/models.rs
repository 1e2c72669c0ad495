//! ML Model Definitions
//!
//! The `Regressor` trait shared by every variant, plus ordinary least-squares
//! linear regression.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::{FeatureVector, ModelError, ModelKind};

/// Trait for fitted regression models
pub trait Regressor: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Predict one value per row
    fn predict_batch(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ModelError>;

    /// Predict a single row
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        self.predict_batch(std::slice::from_ref(features))?
            .first()
            .copied()
            .ok_or_else(|| ModelError::Predict {
                model: self.kind(),
                reason: "model returned no predictions".to_string(),
            })
    }
}

/// Validate a training set and return its feature count.
pub(crate) fn check_dataset(rows: &[FeatureVector], targets: &[f64]) -> Result<usize, ModelError> {
    if rows.is_empty() || targets.is_empty() {
        return Err(ModelError::EmptyDataset);
    }
    if rows.len() != targets.len() {
        return Err(ModelError::LengthMismatch {
            features: rows.len(),
            targets: targets.len(),
        });
    }
    let n_features = rows[0].len();
    if let Some(bad) = rows.iter().find(|r| r.len() != n_features) {
        return Err(ModelError::FeatureMismatch {
            expected: n_features,
            got: bad.len(),
        });
    }
    Ok(n_features)
}

/// Least-squares linear regression with intercept.
///
/// Solved through the SVD of the centred design matrix, so rank-deficient
/// inputs (fewer samples than features) get the minimum-norm solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressionModel {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegressionModel {
    const SINGULAR_EPS: f64 = 1e-10;

    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    pub fn fit(rows: &[FeatureVector], targets: &[f64]) -> Result<Self, ModelError> {
        let p = check_dataset(rows, targets)?;
        let n = rows.len();

        let x_means: Vec<f64> = (0..p)
            .map(|j| rows.iter().map(|r| r.features[j]).sum::<f64>() / n as f64)
            .collect();
        let y_mean = targets.iter().sum::<f64>() / n as f64;

        let x = DMatrix::from_fn(n, p, |i, j| rows[i].features[j] - x_means[j]);
        let y = DVector::from_iterator(n, targets.iter().map(|t| t - y_mean));

        let beta = x
            .svd(true, true)
            .solve(&y, Self::SINGULAR_EPS)
            .map_err(|reason| ModelError::Fit {
                model: ModelKind::LinearRegression,
                reason: reason.to_string(),
            })?;

        let coefficients: Vec<f64> = beta.iter().copied().collect();
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&x_means)
                .map(|(c, m)| c * m)
                .sum::<f64>();

        Ok(Self::new(coefficients, intercept))
    }
}

impl Regressor for LinearRegressionModel {
    fn kind(&self) -> ModelKind {
        ModelKind::LinearRegression
    }

    fn predict_batch(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        rows.iter()
            .map(|row| {
                if row.len() != self.coefficients.len() {
                    return Err(ModelError::FeatureMismatch {
                        expected: self.coefficients.len(),
                        got: row.len(),
                    });
                }
                Ok(row
                    .features
                    .iter()
                    .zip(&self.coefficients)
                    .map(|(f, c)| f * c)
                    .sum::<f64>()
                    + self.intercept)
            })
            .collect()
    }
}
