use crate::loader::LoadError;
use crate::preprocess::{MissingValues, Split, SplitOptions};
use crate::regression::{FitError, RegressionOptions, RegressionResult};
use crate::summary::Dashboard;
use crate::table::{SchemaError, Table};
use thiserror::Error;

/// Options for one load-independent run: split, fit, then summarize.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    split: SplitOptions,
    regression: RegressionOptions,
}

impl AnalysisOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn split(mut self, options: SplitOptions) -> Self {
        self.split = options;
        self
    }

    pub fn regression(mut self, options: RegressionOptions) -> Self {
        self.regression = options;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.split = self.split.seed(seed);
        self
    }

    pub fn test_fraction(mut self, fraction: f64) -> Self {
        self.split = self.split.test_fraction(fraction);
        self
    }

    pub fn missing_values(mut self, policy: MissingValues) -> Self {
        self.split = self.split.missing_values(policy);
        self
    }

    pub fn parallel(mut self, enabled: bool) -> Self {
        self.regression = self.regression.parallel(enabled);
        self
    }

    /// Runs the whole pipeline against `target`.
    ///
    /// Schema problems are reported before any fitting is attempted.
    pub fn run(&self, table: &Table, target: &str) -> Result<Analysis, Error> {
        let split = self.split.split(table, target)?;
        let result = self.regression.fit(&split)?;
        let dashboard = Dashboard::new(table, target, &result)?;
        Ok(Analysis {
            split,
            result,
            dashboard,
        })
    }

    /// Loads `bytes` as CSV and runs the pipeline, defaulting to the first numeric column.
    pub fn run_csv(&self, bytes: &[u8], target: Option<&str>) -> Result<Analysis, Error> {
        let table = crate::loader::load_csv(bytes)?;
        let target = match target {
            Some(target) => target,
            None => table.default_target()?,
        };
        self.run(&table, target)
    }
}

#[derive(Debug, Clone)]
pub struct Analysis {
    split: Split,
    result: RegressionResult,
    dashboard: Dashboard,
}

impl Analysis {
    pub fn split(&self) -> &Split {
        &self.split
    }

    pub fn result(&self) -> &RegressionResult {
        &self.result
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn into_dashboard(self) -> Dashboard {
        self.dashboard
    }
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to load table")]
    Load(#[from] LoadError),

    #[error("invalid target or table schema")]
    Schema(#[from] SchemaError),

    #[error("failed to fit a linear model")]
    Fit(#[from] FitError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;
    use rand::rngs::StdRng;
    use rand::{Rng as _, SeedableRng as _};

    fn linear_csv() -> String {
        let mut rng = StdRng::seed_from_u64(1);
        let mut csv = String::from("x,y\n");
        for x in 1..=100 {
            let y = 2.0 * x as f64 + rng.gen_range(-1.0..1.0);
            csv.push_str(&format!("{},{}\n", x, y));
        }
        csv
    }

    #[test]
    fn linear_data_fits_well() -> Result<(), anyhow::Error> {
        let analysis = AnalysisOptions::new().run_csv(linear_csv().as_bytes(), Some("y"))?;
        let result = analysis.result();
        assert_eq!(analysis.split().test_len(), 20);
        assert_eq!(result.predictions().len(), analysis.split().test_len());
        assert!((result.rmse() - result.mse().sqrt()).abs() < 1e-12);
        assert!(result.r2() > 0.9);
        assert!(result.r2() <= 1.0);
        Ok(())
    }

    #[test]
    fn default_target_is_first_numeric_column() -> Result<(), anyhow::Error> {
        let analysis = AnalysisOptions::new().run_csv(linear_csv().as_bytes(), None)?;
        assert_eq!(analysis.dashboard().target, "x");
        Ok(())
    }

    #[test]
    fn same_seed_same_result() -> Result<(), anyhow::Error> {
        let csv = linear_csv();
        let a = AnalysisOptions::new().seed(3).run_csv(csv.as_bytes(), Some("y"))?;
        let b = AnalysisOptions::new()
            .seed(3)
            .parallel(true)
            .run_csv(csv.as_bytes(), Some("y"))?;
        assert_eq!(a.result(), b.result());
        assert_eq!(a.into_dashboard(), b.into_dashboard());
        Ok(())
    }

    #[test]
    fn target_only_table_fails_to_fit() -> Result<(), anyhow::Error> {
        let table = Table::new(vec![
            Column::text("id", (0..10).map(|i| i.to_string() + "a").collect()),
            Column::numeric("y", (0..10).map(|i| Some(i as f64)).collect()),
        ])?;
        assert!(matches!(
            AnalysisOptions::new().run(&table, "y"),
            Err(Error::Fit(FitError::NoFeatures))
        ));
        Ok(())
    }

    #[test]
    fn constant_and_collinear_features_still_fit() -> Result<(), anyhow::Error> {
        let mut constant = String::from("year,x,y\n");
        let mut collinear = String::from("x,x_cents,y\n");
        for i in 0..60 {
            let y = 2 * i + i % 3;
            constant.push_str(&format!("2023,{},{}\n", i, y));
            collinear.push_str(&format!("{},{},{}\n", i, 100 * i, y));
        }

        for csv in [constant, collinear] {
            let analysis = AnalysisOptions::new().run_csv(csv.as_bytes(), Some("y"))?;
            assert!(analysis.result().r2() > 0.9);
            assert!(analysis.result().r2() <= 1.0);
        }
        Ok(())
    }

    #[test]
    fn text_target_fails_before_fitting() {
        let csv = "name,v\na,1\nb,2\nc,3\n";
        assert!(matches!(
            AnalysisOptions::new().run_csv(csv.as_bytes(), Some("name")),
            Err(Error::Schema(SchemaError::NotNumeric { .. }))
        ));
        assert!(matches!(
            AnalysisOptions::new().run_csv(b"name\na\nb\n", None),
            Err(Error::Schema(SchemaError::NoNumericColumns))
        ));
    }

    #[test]
    fn malformed_csv_is_a_load_error() {
        assert!(matches!(
            AnalysisOptions::new().run_csv(b"a,b\n1\n", Some("a")),
            Err(Error::Load(_))
        ));
    }
}
