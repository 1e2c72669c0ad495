//! SmartCore tree ensembles
//!
//! Random forest comes straight from SmartCore. Gradient boosting is built
//! on SmartCore regression trees: squared-error loss, mean initialisation,
//! one tree per stage fit to the current residuals.

use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};

use super::models::{check_dataset, Regressor};
use super::{FeatureVector, ModelError, ModelKind};

type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;
type Forest = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Fixed seed shared by both ensembles for reproducible training.
pub const SEED: u64 = 42;

fn to_matrix(rows: &[FeatureVector]) -> DenseMatrix<f64> {
    let n_samples = rows.len();
    let n_features = rows.first().map_or(0, FeatureVector::len);
    let flat: Vec<f64> = rows
        .iter()
        .flat_map(|r| r.features.iter().copied())
        .collect();
    DenseMatrix::new(n_samples, n_features, flat, false)
}

fn check_width(rows: &[FeatureVector], n_features: usize) -> Result<(), ModelError> {
    match rows.iter().find(|r| r.len() != n_features) {
        Some(bad) => Err(ModelError::FeatureMismatch {
            expected: n_features,
            got: bad.len(),
        }),
        None => Ok(()),
    }
}

/// SmartCore RandomForest Model Wrapper
#[derive(Debug)]
pub struct SmartcoreRandomForest {
    model: Forest,
    n_features: usize,
    pub n_trees: usize,
}

impl SmartcoreRandomForest {
    /// 200 trees, max depth 10, min split 3, min leaf 2.
    ///
    /// `m` is left unset so every split considers all features.
    pub fn default_parameters() -> RandomForestRegressorParameters {
        RandomForestRegressorParameters {
            max_depth: Some(10),
            min_samples_leaf: 2,
            min_samples_split: 3,
            n_trees: 200,
            m: None,
            keep_samples: false,
            seed: SEED,
        }
    }

    pub fn fit(
        rows: &[FeatureVector],
        targets: &[f64],
        params: RandomForestRegressorParameters,
    ) -> Result<Self, ModelError> {
        let n_features = check_dataset(rows, targets)?;

        let mut params = params;
        if params.m.is_none() {
            params.m = Some(n_features);
        }
        let n_trees = params.n_trees;

        let x = to_matrix(rows);
        let model = Forest::fit(&x, &targets.to_vec(), params).map_err(|e| ModelError::Fit {
            model: ModelKind::RandomForest,
            reason: format!("{e:?}"),
        })?;

        Ok(Self {
            model,
            n_features,
            n_trees,
        })
    }
}

impl Regressor for SmartcoreRandomForest {
    fn kind(&self) -> ModelKind {
        ModelKind::RandomForest
    }

    fn predict_batch(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        check_width(rows, self.n_features)?;
        self.model
            .predict(&to_matrix(rows))
            .map_err(|e| ModelError::Predict {
                model: ModelKind::RandomForest,
                reason: format!("{e:?}"),
            })
    }
}

/// Gradient boosting hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoostingParameters {
    pub n_estimators: usize,
    pub max_depth: u16,
    pub learning_rate: f64,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for GradientBoostingParameters {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 5,
            learning_rate: 0.1,
            min_samples_split: 3,
            min_samples_leaf: 1,
            seed: SEED,
        }
    }
}

/// Squared-error gradient boosting over SmartCore regression trees
#[derive(Debug)]
pub struct SmartcoreGradientBoosting {
    init: f64,
    learning_rate: f64,
    stages: Vec<Tree>,
    n_features: usize,
}

impl SmartcoreGradientBoosting {
    pub fn fit(
        rows: &[FeatureVector],
        targets: &[f64],
        params: &GradientBoostingParameters,
    ) -> Result<Self, ModelError> {
        let n_features = check_dataset(rows, targets)?;
        let x = to_matrix(rows);

        let init = targets.iter().sum::<f64>() / targets.len() as f64;
        let mut current = vec![init; targets.len()];
        let mut stages = Vec::with_capacity(params.n_estimators);

        for stage in 0..params.n_estimators {
            let residuals: Vec<f64> = targets
                .iter()
                .zip(&current)
                .map(|(t, c)| t - c)
                .collect();

            let tree_params = DecisionTreeRegressorParameters {
                max_depth: Some(params.max_depth),
                min_samples_leaf: params.min_samples_leaf,
                min_samples_split: params.min_samples_split,
                seed: Some(params.seed.wrapping_add(stage as u64)),
            };
            let tree = Tree::fit(&x, &residuals, tree_params).map_err(|e| ModelError::Fit {
                model: ModelKind::GradientBoosting,
                reason: format!("stage {stage}: {e:?}"),
            })?;

            let update = tree.predict(&x).map_err(|e| ModelError::Fit {
                model: ModelKind::GradientBoosting,
                reason: format!("stage {stage}: {e:?}"),
            })?;
            for (c, u) in current.iter_mut().zip(update) {
                *c += params.learning_rate * u;
            }

            stages.push(tree);
        }

        Ok(Self {
            init,
            learning_rate: params.learning_rate,
            stages,
            n_features,
        })
    }

    #[cfg(test)]
    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }
}

impl Regressor for SmartcoreGradientBoosting {
    fn kind(&self) -> ModelKind {
        ModelKind::GradientBoosting
    }

    fn predict_batch(&self, rows: &[FeatureVector]) -> Result<Vec<f64>, ModelError> {
        check_width(rows, self.n_features)?;
        let x = to_matrix(rows);

        let mut out = vec![self.init; rows.len()];
        for tree in &self.stages {
            let update = tree.predict(&x).map_err(|e| ModelError::Predict {
                model: ModelKind::GradientBoosting,
                reason: format!("{e:?}"),
            })?;
            for (o, u) in out.iter_mut().zip(update) {
                *o += self.learning_rate * u;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // y = 2x1 + 3x2
    fn plane() -> (Vec<FeatureVector>, Vec<f64>) {
        let raw = [
            [1.0, 1.0],
            [2.0, 1.0],
            [1.0, 2.0],
            [2.0, 2.0],
            [3.0, 3.0],
            [4.0, 2.0],
            [2.0, 4.0],
            [3.0, 1.0],
            [1.0, 3.0],
            [4.0, 4.0],
        ];
        let rows = raw
            .iter()
            .map(|r| FeatureVector::from_array(*r, &["x1", "x2"]))
            .collect::<Vec<_>>();
        let y = raw.iter().map(|r| 2.0 * r[0] + 3.0 * r[1]).collect();
        (rows, y)
    }

    #[test]
    fn test_random_forest_parameters() {
        let params = SmartcoreRandomForest::default_parameters();
        assert_eq!(params.n_trees, 200);
        assert_eq!(params.max_depth, Some(10));
        assert_eq!(params.min_samples_split, 3);
        assert_eq!(params.min_samples_leaf, 2);
        assert_eq!(params.seed, SEED);
    }

    #[test]
    fn test_random_forest_fit_predict() {
        let (x, y) = plane();
        let mut params = SmartcoreRandomForest::default_parameters();
        params.n_trees = 20;

        let model = SmartcoreRandomForest::fit(&x, &y, params).unwrap();
        assert_eq!(model.n_trees, 20);

        let sample = FeatureVector::from_array([3.0, 3.0], &["x1", "x2"]);
        let pred = model.predict(&sample).unwrap();
        assert!(pred > 5.0 && pred < 20.0, "prediction {pred} out of range");
        assert_eq!(pred, model.predict(&sample).unwrap());
    }

    #[test]
    fn test_gradient_boosting_fits_training_data() {
        let (x, y) = plane();
        let model =
            SmartcoreGradientBoosting::fit(&x, &y, &GradientBoostingParameters::default()).unwrap();
        assert_eq!(model.n_stages(), 200);

        let preds = model.predict_batch(&x).unwrap();
        let mse: f64 = preds
            .iter()
            .zip(&y)
            .map(|(p, t)| (p - t).powi(2))
            .sum::<f64>()
            / y.len() as f64;
        assert!(mse < 1.0, "in-sample mse {mse} too high");
    }

    #[test]
    fn test_gradient_boosting_zero_stages_predicts_mean() {
        let (x, y) = plane();
        let params = GradientBoostingParameters {
            n_estimators: 0,
            ..Default::default()
        };
        let model = SmartcoreGradientBoosting::fit(&x, &y, &params).unwrap();
        let mean = y.iter().sum::<f64>() / y.len() as f64;
        assert_eq!(model.predict(&x[0]).unwrap(), mean);
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let (x, y) = plane();
        let params = GradientBoostingParameters {
            n_estimators: 3,
            ..Default::default()
        };
        let model = SmartcoreGradientBoosting::fit(&x, &y, &params).unwrap();
        let short = FeatureVector::from_array([1.0], &["x1"]);
        assert!(model.predict(&short).is_err());
    }
}
