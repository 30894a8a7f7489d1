use crate::functions;
use crate::preprocess::Split;
use log::debug;
use nalgebra::{DMatrix, DVector};
use rayon::iter::{IntoParallelRefIterator as _, ParallelIterator as _};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct RegressionOptions {
    fit_intercept: bool,
    parallel: bool,
}

impl RegressionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit_intercept(mut self, enabled: bool) -> Self {
        self.fit_intercept = enabled;
        self
    }

    /// Evaluates test predictions on the rayon thread pool.
    pub fn parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Fits on the training partition of `split` and scores on its test partition.
    pub fn fit(&self, split: &Split) -> Result<RegressionResult, FitError> {
        if split.test_target.is_empty() {
            return Err(FitError::EmptyTestPartition);
        }
        if split.test_features.len() != split.test_target.len() {
            return Err(FitError::RowSizeMismatch);
        }

        let model = self.fit_model(
            &split.train_features,
            &split.train_target,
            split.feature_names.clone(),
        )?;

        let predictions = if self.parallel {
            model.predict_parallel(&split.test_features)
        } else {
            model.predict(&split.test_features)
        };
        let actual = split.test_target.clone();

        let mse = functions::mse(&actual, &predictions);
        let rmse = mse.sqrt();
        let r2 = functions::r_squared(&actual, &predictions);
        let sample_prediction = predictions[0];
        debug!(
            "scored {} test rows: mse={}, rmse={}, r2={}",
            actual.len(),
            mse,
            rmse,
            r2
        );

        Ok(RegressionResult {
            model,
            actual,
            predictions,
            mse,
            rmse,
            r2,
            sample_prediction,
        })
    }

    /// Solves the least squares problem for row-major `features` against `target`.
    pub fn fit_model(
        &self,
        features: &[Vec<f64>],
        target: &[f64],
        feature_names: Vec<String>,
    ) -> Result<LinearModel, FitError> {
        let n_features = feature_names.len();
        if n_features == 0 {
            return Err(FitError::NoFeatures);
        }
        if target.is_empty() {
            return Err(FitError::EmptyRows);
        }
        if features.len() != target.len() || features.iter().any(|xs| xs.len() != n_features) {
            return Err(FitError::RowSizeMismatch);
        }
        if target
            .iter()
            .chain(features.iter().flatten())
            .any(|v| !v.is_finite())
        {
            return Err(FitError::NonFiniteInput);
        }

        let offset = usize::from(self.fit_intercept);
        let params = n_features + offset;
        let rows = target.len();
        if rows < params {
            return Err(FitError::Underdetermined { rows, params });
        }

        let design = DMatrix::from_fn(rows, params, |i, j| {
            if j < offset {
                1.0
            } else {
                features[i][j - offset]
            }
        });
        let y = DVector::from_column_slice(target);

        let svd = design.svd(true, true);
        let max_singular_value = svd.singular_values.max();
        let eps = max_singular_value * rows.max(params) as f64 * f64::EPSILON;
        if svd.rank(eps) < params {
            debug!("design matrix is rank deficient; using the minimum norm solution");
        }

        // Singular values at or below `eps` count as zero.
        let solution = svd
            .solve(&y, eps)
            .map_err(|e| FitError::Solver(e.to_owned()))?;
        if solution.iter().any(|v| !v.is_finite()) {
            return Err(FitError::NonFiniteSolution);
        }
        debug!("fitted {} parameters on {} rows", params, rows);

        let intercept = if self.fit_intercept { solution[0] } else { 0.0 };
        Ok(LinearModel {
            intercept,
            coefficients: solution.iter().skip(offset).copied().collect(),
            feature_names,
        })
    }
}

impl Default for RegressionOptions {
    fn default() -> Self {
        Self {
            fit_intercept: true,
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearModel {
    intercept: f64,
    coefficients: Vec<f64>,
    feature_names: Vec<String>,
}

impl LinearModel {
    pub fn fit(
        features: &[Vec<f64>],
        target: &[f64],
        feature_names: Vec<String>,
    ) -> Result<Self, FitError> {
        RegressionOptions::default().fit_model(features, target, feature_names)
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn coefficient(&self, feature: &str) -> Option<f64> {
        self.feature_names
            .iter()
            .position(|name| name == feature)
            .map(|i| self.coefficients[i])
    }

    pub fn predict_row(&self, xs: &[f64]) -> f64 {
        debug_assert_eq!(xs.len(), self.coefficients.len());
        self.intercept
            + xs.iter()
                .zip(self.coefficients.iter())
                .map(|(x, c)| x * c)
                .sum::<f64>()
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|xs| self.predict_row(xs)).collect()
    }

    pub fn predict_parallel(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.par_iter().map(|xs| self.predict_row(xs)).collect()
    }
}

/// A fitted model scored against a test partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionResult {
    model: LinearModel,
    actual: Vec<f64>,
    predictions: Vec<f64>,
    mse: f64,
    rmse: f64,
    r2: f64,
    sample_prediction: f64,
}

impl RegressionResult {
    pub fn model(&self) -> &LinearModel {
        &self.model
    }

    /// Test labels, aligned with [`RegressionResult::predictions`].
    pub fn actual(&self) -> &[f64] {
        &self.actual
    }

    pub fn predictions(&self) -> &[f64] {
        &self.predictions
    }

    pub fn mse(&self) -> f64 {
        self.mse
    }

    pub fn rmse(&self) -> f64 {
        self.rmse
    }

    pub fn r2(&self) -> f64 {
        self.r2
    }

    /// The prediction for the first row of the test partition.
    pub fn sample_prediction(&self) -> f64 {
        self.sample_prediction
    }
}

#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("there are no feature columns besides the target")]
    NoFeatures,

    #[error("training partition must have one or more rows")]
    EmptyRows,

    #[error("test partition must have one or more rows")]
    EmptyTestPartition,

    #[error("some of feature rows or targets have a different length from others")]
    RowSizeMismatch,

    #[error("features or target contain non finite numbers")]
    NonFiniteInput,

    #[error("{rows} training rows cannot determine {params} parameters")]
    Underdetermined { rows: usize, params: usize },

    #[error("least squares solver failed: {0}")]
    Solver(String),

    #[error("least squares solution contains non finite numbers")]
    NonFiniteSolution,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng as _, SeedableRng as _};

    fn names(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|x| x.to_string()).collect()
    }

    #[test]
    fn exact_fit_works() -> Result<(), anyhow::Error> {
        let features = (0..10)
            .map(|i| vec![i as f64, ((i * 7) % 5) as f64])
            .collect::<Vec<_>>();
        let target = features
            .iter()
            .map(|xs| 1.5 + 2.0 * xs[0] - 3.0 * xs[1])
            .collect::<Vec<_>>();

        let model = LinearModel::fit(&features, &target, names(&["a", "b"]))?;
        assert!((model.intercept() - 1.5).abs() < 1e-9);
        assert!((model.coefficient("a").unwrap_or(f64::NAN) - 2.0).abs() < 1e-9);
        assert!((model.coefficient("b").unwrap_or(f64::NAN) + 3.0).abs() < 1e-9);
        assert!((model.predict_row(&[4.0, 1.0]) - 6.5).abs() < 1e-9);
        assert_eq!(model.coefficient("c"), None);
        Ok(())
    }

    #[test]
    fn without_intercept_works() -> Result<(), anyhow::Error> {
        let features = vec![vec![1.0], vec![2.0], vec![3.0]];
        let target = vec![2.0, 4.0, 6.0];
        let model = RegressionOptions::new().fit_intercept(false).fit_model(
            &features,
            &target,
            names(&["x"]),
        )?;
        assert_eq!(model.intercept(), 0.0);
        assert!((model.coefficients()[0] - 2.0).abs() < 1e-9);
        Ok(())
    }

    fn noisy_split() -> Split {
        let mut rng = StdRng::seed_from_u64(0);
        let rows = (0..40)
            .map(|i| {
                let x = i as f64;
                (vec![x], 3.0 * x - 4.0 + rng.gen_range(-0.5..0.5))
            })
            .collect::<Vec<_>>();
        split_at(rows, 30, names(&["x"]))
    }

    fn split_at(
        mut rows: Vec<(Vec<f64>, f64)>,
        train_len: usize,
        feature_names: Vec<String>,
    ) -> Split {
        let test = rows.split_off(train_len);
        Split {
            target_name: "y".to_owned(),
            feature_names,
            train_rows: (0..train_len).collect(),
            train_features: rows.iter().map(|(xs, _)| xs.clone()).collect(),
            train_target: rows.iter().map(|(_, y)| *y).collect(),
            test_rows: (train_len..train_len + test.len()).collect(),
            test_features: test.iter().map(|(xs, _)| xs.clone()).collect(),
            test_target: test.iter().map(|(_, y)| *y).collect(),
        }
    }

    #[test]
    fn metrics_are_consistent() -> Result<(), anyhow::Error> {
        let split = noisy_split();
        let result = RegressionOptions::default().fit(&split)?;

        assert_eq!(result.predictions().len(), split.test_len());
        assert_eq!(result.actual(), &split.test_target[..]);
        assert_eq!(result.rmse(), result.mse().sqrt());
        assert!(result.r2() <= 1.0);
        assert!(result.r2() > 0.9);
        assert_eq!(result.sample_prediction(), result.predictions()[0]);
        assert!((result.model().coefficients()[0] - 3.0).abs() < 0.1);
        Ok(())
    }

    #[test]
    fn parallel_prediction_matches_sequential() -> Result<(), anyhow::Error> {
        let split = noisy_split();
        let sequential = RegressionOptions::new().fit(&split)?;
        let parallel = RegressionOptions::new().parallel(true).fit(&split)?;
        assert_eq!(sequential, parallel);
        Ok(())
    }

    #[test]
    fn degenerate_inputs_fail() {
        let features = vec![vec![]; 5];
        let target = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(
            LinearModel::fit(&features, &target, Vec::new()),
            Err(FitError::NoFeatures)
        );

        let features = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        assert_eq!(
            LinearModel::fit(&features, &target[..2], names(&["a", "b"])),
            Err(FitError::Underdetermined { rows: 2, params: 3 })
        );

        let features = vec![vec![1.0], vec![f64::NAN]];
        assert_eq!(
            LinearModel::fit(&features, &target[..2], names(&["a"])),
            Err(FitError::NonFiniteInput)
        );
    }

    #[test]
    fn constant_and_duplicated_features_fit() -> Result<(), anyhow::Error> {
        let rows = (0..40)
            .map(|i| {
                let x = i as f64;
                let noise = f64::from(i % 3) - 1.0;
                (vec![2023.0, x, 100.0 * x], 2.0 * x + noise)
            })
            .collect::<Vec<_>>();
        let split = split_at(rows, 32, names(&["year", "x", "x_cents"]));

        let result = RegressionOptions::default().fit(&split)?;
        assert_eq!(result.predictions().len(), split.test_len());
        assert!(result.model().coefficients().iter().all(|c| c.is_finite()));
        assert!(result.r2() > 0.9);
        assert!(result.r2() <= 1.0);
        Ok(())
    }
}
