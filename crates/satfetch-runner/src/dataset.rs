//! Tabular coordinate input.
//!
//! The input is a spreadsheet (`.xlsx`, `.xls`, `.ods`, read from its first
//! worksheet) or a CSV file, with a header row and at least a latitude and a
//! longitude column. Each data row becomes a [`CoordinateRow`] whose index is
//! its 0-based position among the data rows; that index names the output file.

use crate::{Result, RunnerError};
use calamine::{Data, Reader};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One coordinate entry from the input table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateRow {
    /// Ordinal position in the input table.
    pub index: usize,
    /// Latitude in degrees. NaN when the cell was empty.
    pub lat: f64,
    /// Longitude in degrees. NaN when the cell was empty.
    pub lon: f64,
}

/// Which rows of the dataset a run processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Only the first `rows` rows.
    Demo { rows: usize },
    /// Every row.
    Full,
}

/// An ordered, immutable set of coordinate rows.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<CoordinateRow>,
}

impl Dataset {
    /// Build a dataset from (lat, lon) pairs, numbering them from 0.
    pub fn from_coordinates<I>(coords: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let rows = coords
            .into_iter()
            .enumerate()
            .map(|(index, (lat, lon))| CoordinateRow { index, lat, lon })
            .collect();
        Self { rows }
    }

    /// Load a table, picking the reader from the file extension.
    ///
    /// Spreadsheet extensions go through [`Dataset::from_workbook_path`];
    /// anything else is read as CSV.
    pub fn from_path<P: AsRef<Path>>(path: P, lat_column: &str, lon_column: &str) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some(ext) if WORKBOOK_EXTENSIONS.contains(&ext) => {
                Self::from_workbook_path(path, lat_column, lon_column)
            }
            _ => Self::from_csv_path(path, lat_column, lon_column),
        }
    }

    /// Load the first worksheet of a spreadsheet file.
    ///
    /// Empty cells load as NaN. Numeric cells are taken as-is, text cells are
    /// parsed as numbers, and any other cell type fails the load.
    pub fn from_workbook_path<P: AsRef<Path>>(
        path: P,
        lat_column: &str,
        lon_column: &str,
    ) -> Result<Self> {
        let mut workbook = calamine::open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(calamine::Error::Msg("Workbook has no worksheets"))??;

        let mut records = range.rows();
        let headers = records
            .next()
            .ok_or_else(|| RunnerError::MissingColumn(lat_column.to_string()))?;
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.to_string().trim() == name)
                .ok_or_else(|| RunnerError::MissingColumn(name.to_string()))
        };
        let lat_idx = column(lat_column)?;
        let lon_idx = column(lon_column)?;

        let mut rows = Vec::new();
        for (index, record) in records.enumerate() {
            let lat = cell_value(index, lat_column, record.get(lat_idx))?;
            let lon = cell_value(index, lon_column, record.get(lon_idx))?;
            rows.push(CoordinateRow { index, lat, lon });
        }

        Ok(Self { rows })
    }

    /// Load a CSV file.
    pub fn from_csv_path<P: AsRef<Path>>(path: P, lat_column: &str, lon_column: &str) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file, lat_column, lon_column)
    }

    /// Load CSV data from any reader.
    ///
    /// Empty cells load as NaN so that row indices stay aligned with the table.
    /// A cell holding text that is not a number fails the whole load.
    pub fn from_reader<R: Read>(reader: R, lat_column: &str, lon_column: &str) -> Result<Self> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| RunnerError::MissingColumn(name.to_string()))
        };
        let lat_idx = column(lat_column)?;
        let lon_idx = column(lon_column)?;

        let mut rows = Vec::new();
        for (index, record) in csv.records().enumerate() {
            let record = record?;
            let lat = parse_cell(index, lat_column, record.get(lat_idx))?;
            let lon = parse_cell(index, lon_column, record.get(lon_idx))?;
            rows.push(CoordinateRow { index, lat, lon });
        }

        Ok(Self { rows })
    }

    /// All rows in table order.
    pub fn rows(&self) -> &[CoordinateRow] {
        &self.rows
    }

    /// Number of rows in the table.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The rows a run in `mode` should process.
    pub fn select(&self, mode: RunMode) -> &[CoordinateRow] {
        match mode {
            RunMode::Demo { rows } => &self.rows[..rows.min(self.rows.len())],
            RunMode::Full => &self.rows,
        }
    }
}

/// Extensions read through calamine rather than the CSV reader.
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

fn cell_value(row: usize, column: &str, cell: Option<&Data>) -> Result<f64> {
    match cell {
        None | Some(Data::Empty) => Ok(f64::NAN),
        Some(Data::Float(value)) => Ok(*value),
        Some(Data::Int(value)) => Ok(*value as f64),
        Some(Data::String(text)) => parse_cell(row, column, Some(text.trim())),
        Some(other) => Err(RunnerError::InvalidValue {
            row,
            column: column.to_string(),
            value: other.to_string(),
        }),
    }
}

fn parse_cell(row: usize, column: &str, value: Option<&str>) -> Result<f64> {
    match value {
        None | Some("") => Ok(f64::NAN),
        Some(text) => text.parse().map_err(|_| RunnerError::InvalidValue {
            row,
            column: column.to_string(),
            value: text.to_string(),
        }),
    }
}
