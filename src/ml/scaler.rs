//! Z-score feature scaling.
//!
//! The scaler is fit once per training run and then frozen; inference reuses
//! the same means and deviations so that training and prediction share one
//! feature space.

use serde::{Deserialize, Serialize};

use super::{FeatureVector, ModelError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    /// Population standard deviations (ddof = 0)
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit per-feature mean and standard deviation over `rows`.
    pub fn fit(rows: &[FeatureVector]) -> Result<Self, ModelError> {
        let first = rows.first().ok_or(ModelError::EmptyDataset)?;
        let n_features = first.len();
        let n = rows.len() as f64;

        let mut means = vec![0.0; n_features];
        for row in rows {
            if row.len() != n_features {
                return Err(ModelError::FeatureMismatch {
                    expected: n_features,
                    got: row.len(),
                });
            }
            for (m, f) in means.iter_mut().zip(&row.features) {
                *m += f / n;
            }
        }

        let mut stds = vec![0.0; n_features];
        for row in rows {
            for ((s, f), m) in stds.iter_mut().zip(&row.features).zip(&means) {
                *s += (f - m).powi(2) / n;
            }
        }
        stds.iter_mut().for_each(|s| *s = s.sqrt());

        Ok(Self { means, stds })
    }

    pub fn transform(&self, row: &FeatureVector) -> Result<FeatureVector, ModelError> {
        row.standardize(&self.means, &self.stds)
    }

    pub fn transform_all(&self, rows: &[FeatureVector]) -> Result<Vec<FeatureVector>, ModelError> {
        rows.iter().map(|r| self.transform(r)).collect()
    }

    #[cfg(test)]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    #[cfg(test)]
    pub fn stds(&self) -> &[f64] {
        &self.stds
    }
}
