//! Load a CSV table, fit an ordinary least squares model against one of its numeric
//! columns, and derive the figures a dashboard shows for it.
//!
//! ```no_run
//! use tabstat::AnalysisOptions;
//!
//! let bytes = std::fs::read("sales.csv")?;
//! let analysis = AnalysisOptions::new().seed(42).run_csv(&bytes, Some("revenue"))?;
//! println!("R² = {}", analysis.result().r2());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub use analysis::{Analysis, AnalysisOptions, Error};
pub use loader::{
    load_csv, load_csv_path, load_csv_reader, load_csv_with_encoding, Encoding, LoadError,
};
pub use preprocess::{MissingValues, Split, SplitOptions, DEFAULT_SEED, DEFAULT_TEST_FRACTION};
pub use regression::{FitError, LinearModel, RegressionOptions, RegressionResult};
pub use summary::Dashboard;
pub use table::{Column, ColumnValues, SchemaError, Table, TableError};

pub mod summary;

mod analysis;
mod functions;
mod loader;
mod preprocess;
mod regression;
mod table;
