use crate::table::{SchemaError, Table};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom as _;
use rand::SeedableRng as _;

pub const DEFAULT_TEST_FRACTION: f64 = 0.2;
pub const DEFAULT_SEED: u64 = 42;

/// What to do with rows whose target or feature cells are missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MissingValues {
    /// Leave such rows out of both partitions.
    #[default]
    DropRows,

    /// Fail with [`SchemaError::MissingValues`].
    Reject,
}

#[derive(Debug, Clone)]
pub struct SplitOptions {
    test_fraction: f64,
    seed: u64,
    missing: MissingValues,
}

impl SplitOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn test_fraction(mut self, fraction: f64) -> Self {
        self.test_fraction = fraction;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn missing_values(mut self, policy: MissingValues) -> Self {
        self.missing = policy;
        self
    }

    /// Splits `table` into shuffled train/test partitions predicting `target`.
    ///
    /// Every numeric column except `target` becomes a feature, in table order. Text
    /// columns are ignored. The test partition holds `ceil(rows * test_fraction)` rows
    /// and both partitions are always non-empty.
    pub fn split(&self, table: &Table, target: &str) -> Result<Split, SchemaError> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(SchemaError::InvalidTestFraction(self.test_fraction));
        }

        let labels = table.numeric(target)?;
        let features = table
            .columns()
            .filter(|c| c.name() != target)
            .filter_map(|c| c.as_numeric().map(|values| (c.name(), values)))
            .collect::<Vec<_>>();

        let mut rows = Vec::with_capacity(labels.len());
        for (i, &label) in labels.iter().enumerate() {
            let xs = features
                .iter()
                .map(|(_, values)| values[i])
                .collect::<Option<Vec<_>>>();
            match (label, xs) {
                (Some(y), Some(xs)) => rows.push(Row { index: i, xs, y }),
                _ if self.missing == MissingValues::DropRows => {}
                (label, _) => {
                    let column = if label.is_none() {
                        target
                    } else {
                        features
                            .iter()
                            .find(|(_, values)| values[i].is_none())
                            .map_or(target, |(name, _)| *name)
                    };
                    return Err(SchemaError::MissingValues {
                        column: column.to_owned(),
                        row: i,
                    });
                }
            }
        }
        if rows.len() < labels.len() {
            debug!(
                "dropped {} rows with missing values",
                labels.len() - rows.len()
            );
        }
        if rows.len() < 2 {
            return Err(SchemaError::TooFewRows { rows: rows.len() });
        }

        rows.shuffle(&mut StdRng::seed_from_u64(self.seed));
        let test_len = ((rows.len() as f64 * self.test_fraction).ceil() as usize)
            .clamp(1, rows.len() - 1);
        let test = rows.split_off(rows.len() - test_len);
        let train = rows;
        debug!(
            "split {} rows into {} train / {} test (seed={})",
            train.len() + test.len(),
            train.len(),
            test.len(),
            self.seed
        );

        let (train_rows, train_features, train_target) = unzip_rows(train);
        let (test_rows, test_features, test_target) = unzip_rows(test);
        Ok(Split {
            target_name: target.to_owned(),
            feature_names: features.iter().map(|(name, _)| name.to_string()).collect(),
            train_rows,
            train_features,
            train_target,
            test_rows,
            test_features,
            test_target,
        })
    }
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
            missing: MissingValues::default(),
        }
    }
}

#[derive(Debug)]
struct Row {
    index: usize,
    xs: Vec<f64>,
    y: f64,
}

fn unzip_rows(rows: Vec<Row>) -> (Vec<usize>, Vec<Vec<f64>>, Vec<f64>) {
    let mut indices = Vec::with_capacity(rows.len());
    let mut features = Vec::with_capacity(rows.len());
    let mut target = Vec::with_capacity(rows.len());
    for row in rows {
        indices.push(row.index);
        features.push(row.xs);
        target.push(row.y);
    }
    (indices, features, target)
}

/// Train/test partitions of a table.
///
/// Feature rows are row-major and follow `feature_names`; `*_rows` hold the originating
/// table row of each partition entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    pub target_name: String,
    pub feature_names: Vec<String>,
    pub train_rows: Vec<usize>,
    pub train_features: Vec<Vec<f64>>,
    pub train_target: Vec<f64>,
    pub test_rows: Vec<usize>,
    pub test_features: Vec<Vec<f64>>,
    pub test_target: Vec<f64>,
}

impl Split {
    pub fn train_len(&self) -> usize {
        self.train_target.len()
    }

    pub fn test_len(&self) -> usize {
        self.test_target.len()
    }
}
