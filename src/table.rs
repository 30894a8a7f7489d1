use itertools::Itertools as _;
use std::collections::HashSet;
use std::io::Write;
use thiserror::Error;

/// Cell spellings treated as missing when inferring a column type.
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValues {
    /// `None` marks a missing cell.
    Numeric(Vec<Option<f64>>),
    Text(Vec<String>),
}

impl ColumnValues {
    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Text(v) => v.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: ColumnValues,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values: ColumnValues::Text(values),
        }
    }

    /// Builds a column from raw cells.
    ///
    /// The column is numeric when every non-missing cell parses as a finite number and at
    /// least one such cell exists. Otherwise the cells are kept verbatim as text.
    pub fn infer(name: impl Into<String>, cells: Vec<String>) -> Self {
        let mut values = Vec::with_capacity(cells.len());
        for cell in &cells {
            match parse_numeric_cell(cell) {
                Some(v) => values.push(v),
                None => return Self::text(name, cells),
            }
        }

        if values.iter().all(Option::is_none) {
            Self::text(name, cells)
        } else {
            Self::numeric(name, values)
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &ColumnValues {
        &self.values
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.values, ColumnValues::Numeric(_))
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.values {
            ColumnValues::Numeric(v) => Some(v),
            ColumnValues::Text(_) => None,
        }
    }
}

fn parse_numeric_cell(cell: &str) -> Option<Option<f64>> {
    let cell = cell.trim();
    if MISSING_MARKERS.contains(&cell) {
        return Some(None);
    }
    let v = cell.parse::<f64>().ok()?;
    Some(Some(v).filter(|v| v.is_finite()))
}

/// An immutable set of named, equally long columns.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows_len: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        if columns.is_empty() {
            return Err(TableError::EmptyTable);
        }

        let rows_len = columns[0].values.len();
        if columns.iter().skip(1).any(|c| c.values.len() != rows_len) {
            return Err(TableError::RowSizeMismatch);
        }

        {
            let mut names = HashSet::new();
            if let Some(c) = columns.iter().find(|c| !names.insert(c.name.as_str())) {
                return Err(TableError::DuplicateColumn {
                    name: c.name.clone(),
                });
            }
        }

        Ok(Self { columns, rows_len })
    }

    pub fn rows_len(&self) -> usize {
        self.rows_len
    }

    pub fn columns_len(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> impl '_ + Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl '_ + Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name())
    }

    /// Names of the columns eligible as a regression target, in table order.
    pub fn numeric_column_names(&self) -> impl '_ + Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.is_numeric())
            .map(|c| c.name())
    }

    /// The first numeric column, which front ends preselect as the target.
    pub fn default_target(&self) -> Result<&str, SchemaError> {
        self.numeric_column_names()
            .next()
            .ok_or(SchemaError::NoNumericColumns)
    }

    pub fn numeric(&self, name: &str) -> Result<&[Option<f64>], SchemaError> {
        let column = self
            .column(name)
            .ok_or_else(|| SchemaError::ColumnNotFound {
                name: name.to_owned(),
                available: self.column_names().join(", "),
            })?;
        column.as_numeric().ok_or_else(|| SchemaError::NotNumeric {
            name: name.to_owned(),
        })
    }

    /// Writes the numeric columns as CSV, leaving missing cells empty.
    ///
    /// Values use the shortest representation that parses back to the same `f64`.
    pub fn write_numeric_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let columns = self
            .columns
            .iter()
            .filter_map(|c| c.as_numeric())
            .collect::<Vec<_>>();

        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(self.numeric_column_names())?;
        for row in 0..self.rows_len {
            writer.write_record(
                columns
                    .iter()
                    .map(|c| c[row].map(|v| v.to_string()).unwrap_or_default()),
            )?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TableError {
    #[error("table must have at least one column")]
    EmptyTable,

    #[error("some of columns have a different row count from others")]
    RowSizeMismatch,

    #[error("column {name:?} appears more than once")]
    DuplicateColumn { name: String },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("column {name:?} does not exist (available: {available})")]
    ColumnNotFound { name: String, available: String },

    #[error("column {name:?} is not numeric")]
    NotNumeric { name: String },

    #[error("table has no numeric columns")]
    NoNumericColumns,

    #[error("column {column:?} has a missing value at row {row}")]
    MissingValues { column: String, row: usize },

    #[error("at least two usable rows are required to split a table, got {rows}")]
    TooFewRows { rows: usize },

    #[error("test fraction must lie strictly between 0 and 1, got {0}")]
    InvalidTestFraction(f64),
}
