//! Read-only projections of a table and a regression result for display.
//!
//! Nothing here mutates its inputs; every function derives a fresh value that a rendering
//! front end can consume as is.
use crate::functions;
use crate::regression::RegressionResult;
use crate::table::{SchemaError, Table};
use itertools::{Itertools as _, MinMaxResult};
use ordered_float::OrderedFloat;
use serde::Serialize;
use std::num::NonZeroUsize;

pub const TREND_WINDOW: usize = 20;
pub const HISTOGRAM_BINS: usize = 20;

/// Headline figures of the target column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Kpis {
    pub total: f64,
    pub mean: f64,
    pub max: f64,
    pub rows: usize,
}

impl Kpis {
    /// Missing cells are skipped by `total`, `mean` and `max`; `rows` counts every row.
    pub fn compute(table: &Table, target: &str) -> Result<Self, SchemaError> {
        let values = table.numeric(target)?.iter().flatten().copied();
        Ok(Self {
            total: values.clone().sum(),
            mean: functions::mean(values.clone()).unwrap_or(f64::NAN),
            max: values
                .map(OrderedFloat)
                .max()
                .map_or(f64::NAN, |v| v.into_inner()),
            rows: table.rows_len(),
        })
    }

    pub fn display(&self) -> KpiDisplay {
        KpiDisplay {
            total: self.total.trunc() as i64,
            mean: functions::round2(self.mean),
            max: self.max.trunc() as i64,
            rows: self.rows,
        }
    }
}

/// [`Kpis`] as shown on the dashboard: integers for total and max, two decimals for mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KpiDisplay {
    pub total: i64,
    pub mean: f64,
    pub max: i64,
    pub rows: usize,
}

/// Trailing rolling mean indexed by row position.
///
/// Positions before the first full window, and windows that include a missing cell, are
/// `None`.
pub fn rolling_mean(values: &[Option<f64>], window: NonZeroUsize) -> Vec<Option<f64>> {
    let window = window.get();
    let head = std::iter::repeat(None).take((window - 1).min(values.len()));
    let full = values.windows(window).map(|w| {
        w.iter()
            .copied()
            .collect::<Option<Vec<_>>>()
            .map(|w| w.iter().sum::<f64>() / window as f64)
    });
    head.chain(full).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// `(actual, predicted)` for every test row.
pub fn actual_vs_predicted(result: &RegressionResult) -> Vec<Point> {
    result
        .actual()
        .iter()
        .zip(result.predictions().iter())
        .map(|(&x, &y)| Point { x, y })
        .collect()
}

/// `(predicted, actual - predicted)` for every test row.
pub fn residuals(result: &RegressionResult) -> Vec<Point> {
    result
        .actual()
        .iter()
        .zip(result.predictions().iter())
        .map(|(&actual, &predicted)| Point {
            x: predicted,
            y: actual - predicted,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width histogram spanning the observed range; the last bin is closed on the right.
///
/// A constant input is centered in a range of width one.
pub fn histogram(values: &[f64], bins: NonZeroUsize) -> Vec<Bin> {
    let (low, high) = match values.iter().copied().map(OrderedFloat).minmax() {
        MinMaxResult::NoElements => return Vec::new(),
        MinMaxResult::OneElement(v) => (v.0, v.0),
        MinMaxResult::MinMax(low, high) => (low.0, high.0),
    };
    let (low, high) = if low == high {
        (low - 0.5, high + 0.5)
    } else {
        (low, high)
    };

    let n = bins.get();
    let width = (high - low) / n as f64;
    let mut counts = vec![0; n];
    for &v in values {
        let i = ((v - low) / width).floor() as usize;
        counts[i.min(n - 1)] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            start: low + i as f64 * width,
            end: if i + 1 == n {
                high
            } else {
                low + (i + 1) as f64 * width
            },
            count,
        })
        .collect()
}

/// Metrics rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub r2: f64,
    pub sample_prediction: f64,
}

impl DisplayMetrics {
    pub fn new(result: &RegressionResult) -> Self {
        Self {
            mse: functions::round2(result.mse()),
            rmse: functions::round2(result.rmse()),
            r2: functions::round2(result.r2()),
            sample_prediction: functions::round2(result.sample_prediction()),
        }
    }
}

pub fn summary_text(table: &Table, target: &str, result: &RegressionResult) -> String {
    format!(
        "\
Dataset Overview
• Rows analysed: {rows}
• Target variable: {target}

Model Performance
• RMSE: {rmse}
• R² Score: {r2} (Excellent fit)

Business Insight
• Model captures underlying patterns well
• Suitable for forecasting & planning

Recommendation
• Safe for business usage
• Accuracy can improve with more features
",
        rows = table.rows_len(),
        target = target,
        rmse = functions::round2(result.rmse()),
        r2 = functions::round2(result.r2()),
    )
}

/// Everything a dashboard renders for one table and target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub target: String,
    pub numeric_columns: Vec<String>,
    pub kpis: KpiDisplay,
    pub trend: Vec<Option<f64>>,
    pub actual_vs_predicted: Vec<Point>,
    pub histogram: Vec<Bin>,
    pub residuals: Vec<Point>,
    pub metrics: DisplayMetrics,
    pub summary: String,
}

impl Dashboard {
    pub fn new(
        table: &Table,
        target: &str,
        result: &RegressionResult,
    ) -> Result<Self, SchemaError> {
        let values = table.numeric(target)?;
        let present = values.iter().flatten().copied().collect::<Vec<_>>();
        Ok(Self {
            target: target.to_owned(),
            numeric_columns: table.numeric_column_names().map(str::to_owned).collect(),
            kpis: Kpis::compute(table, target)?.display(),
            trend: rolling_mean(values, nonzero(TREND_WINDOW)),
            actual_vs_predicted: actual_vs_predicted(result),
            histogram: histogram(&present, nonzero(HISTOGRAM_BINS)),
            residuals: residuals(result),
            metrics: DisplayMetrics::new(result),
            summary: summary_text(table, target, result),
        })
    }
}

fn nonzero(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN)
}
