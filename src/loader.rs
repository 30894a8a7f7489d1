use crate::table::{Column, Table, TableError};
use log::debug;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text encoding a CSV input was decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    Utf8,
    /// ISO-8859-1; used only when the input is not valid UTF-8.
    Latin1,
}

/// Parses CSV bytes with a header row into a [`Table`].
///
/// The bytes are decoded as UTF-8 first, and as Latin-1 if that fails. Since Latin-1 maps
/// every byte to a character, only malformed CSV structure can make this function fail.
pub fn load_csv(bytes: &[u8]) -> Result<Table, LoadError> {
    load_csv_with_encoding(bytes).map(|(table, _)| table)
}

/// Like [`load_csv`], but also reports which encoding was used.
pub fn load_csv_with_encoding(bytes: &[u8]) -> Result<(Table, Encoding), LoadError> {
    let (text, encoding) = decode(bytes);
    let table = parse(&text)?;
    debug!(
        "loaded {} rows x {} columns ({:?})",
        table.rows_len(),
        table.columns_len(),
        encoding
    );
    Ok((table, encoding))
}

pub fn load_csv_reader<R: Read>(mut reader: R) -> Result<Table, LoadError> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    load_csv(&bytes)
}

pub fn load_csv_path<P: AsRef<Path>>(path: P) -> Result<Table, LoadError> {
    let bytes = std::fs::read(path)?;
    load_csv(&bytes)
}

fn decode(bytes: &[u8]) -> (Cow<'_, str>, Encoding) {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => (Cow::Borrowed(text), Encoding::Utf8),
        Err(e) => {
            debug!("input is not valid UTF-8 ({}); retrying as Latin-1", e);
            let text = bytes.iter().copied().map(char::from).collect::<String>();
            (Cow::Owned(text), Encoding::Latin1)
        }
    }
}

fn parse(text: &str) -> Result<Table, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(LoadError::MissingHeader);
    }

    let mut cells = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record?;
        for (column, field) in cells.iter_mut().zip(record.iter()) {
            column.push(field.to_owned());
        }
    }

    let columns = dedup_names(headers.iter())
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| Column::infer(name, cells))
        .collect();
    Ok(Table::new(columns)?)
}

/// Renames repeated header names to `name.1`, `name.2`, ... skipping names already taken.
fn dedup_names<'a>(names: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut taken = HashSet::new();
    let mut counts = HashMap::<&str, usize>::new();
    let mut deduped = Vec::new();
    for name in names.map(str::trim) {
        let count = counts.entry(name).or_default();
        let mut candidate = name.to_owned();
        while taken.contains(&candidate) {
            *count += 1;
            candidate = format!("{}.{}", name, count);
        }
        if candidate != name {
            debug!("renamed duplicate column {:?} to {:?}", name, candidate);
        }
        taken.insert(candidate.clone());
        deduped.push(candidate);
    }
    deduped
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read CSV input")]
    Io(#[from] std::io::Error),

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV input has no header row")]
    MissingHeader,

    #[error("invalid table: {0}")]
    Table(#[from] TableError),
}
