use std::{fs::File, io::Read, path::Path};

use csv::{ReaderBuilder, Trim};
use hashbrown::HashMap;
use tracing::debug;

use crate::error::{GanError, Result};

/// Raw delimited table, header plus string cells
#[derive(Debug, Clone)]
pub struct Table {
    columns: Vec<String>,
    index: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            if index.insert(column.clone(), i).is_some() {
                return Err(GanError::DataFormat(format!("duplicate column {column}")));
            }
        }

        if let Some(row) = rows.iter().find(|row| row.len() != columns.len()) {
            return Err(GanError::DataFormat(format!(
                "row has {} cells but the header has {} columns",
                row.len(),
                columns.len()
            )));
        }

        Ok(Self { columns, index, rows })
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("reading table {}", path.display());
        let table = Self::from_reader(File::open(path)?)
            .map_err(|e| match e {
                GanError::DataFormat(msg) => GanError::DataFormat(format!("{}: {msg}", path.display())),
                other => other,
            })?;
        debug!("read {} rows x {} columns", table.len(), table.columns.len());
        Ok(table)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

        let columns: Vec<String> = reader
            .headers()
            .map_err(parse_error)?
            .iter()
            .map(str::to_string)
            .collect();
        if columns.iter().all(|c| c.is_empty()) {
            return Err(GanError::DataFormat("file is empty".into()));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(parse_error)?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        if rows.is_empty() {
            return Err(GanError::DataFormat("file has no data rows".into()));
        }

        Self::new(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Cells of one column, in row order
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = &str>> {
        let i = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row[i].as_str()))
    }

    /// Index of a column that must exist, as a format error otherwise
    pub fn require_column(&self, name: &str, table: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| GanError::DataFormat(format!("{table} table has no {name} column")))
    }
}

/// Malformed content is a format error, only failed reads stay I/O errors
fn parse_error(e: csv::Error) -> GanError {
    if e.is_io_error() {
        return GanError::Csv(e);
    }
    match e.position() {
        Some(position) => GanError::DataFormat(format!("line {}: {e}", position.line())),
        None => GanError::DataFormat(e.to_string()),
    }
}

/// Integral numbers compare equal regardless of formatting, so "7" and "7.0"
/// name the same record or category.
pub fn canonical_value(raw: &str) -> String {
    let raw = raw.trim();
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0. && v.abs() < 1e15 => format!("{}", v as i64),
        _ => raw.to_string(),
    }
}

/// Parse a numeric cell, empty or non-numeric text counts as missing
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
