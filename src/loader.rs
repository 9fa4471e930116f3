//! Loading records from JSON and CSV inputs

use crate::error::{Result, SheetdiffError};
use crate::record::{Record, Value};
use serde_json::Value as JsonValue;
use std::fs;
use std::path::Path;

/// Supported input formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Json,
    Csv,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        match extension.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            Some(other) => Err(SheetdiffError::invalid_input(format!(
                "Unsupported file type '.{}' for {}. Use .json or .csv",
                other,
                path.display()
            ))),
            None => Err(SheetdiffError::invalid_input(format!(
                "Cannot determine file type of {}",
                path.display()
            ))),
        }
    }
}

/// Reads one sheet of records from a file
#[derive(Debug, Clone, Default)]
pub struct RecordLoader {
    /// Lines to skip before the CSV header
    header_row: usize,
}

impl RecordLoader {
    pub fn new(header_row: usize) -> Self {
        Self { header_row }
    }

    /// Load the named sheet from `path`.
    ///
    /// JSON files hold either an array of row objects or an object mapping
    /// sheet names to such arrays. CSV files are a single sheet, so the
    /// sheet name is ignored for them.
    pub fn load(&self, path: &Path, sheet: &str) -> Result<Vec<Record>> {
        if !path.is_file() {
            return Err(SheetdiffError::invalid_input(format!(
                "File not found: {}",
                path.display()
            )));
        }

        let records = match InputFormat::from_path(path)? {
            InputFormat::Json => self.load_json(path, sheet)?,
            InputFormat::Csv => self.load_csv(path)?,
        };

        log::debug!("Loaded {} records from {}", records.len(), path.display());
        Ok(records)
    }

    fn load_json(&self, path: &Path, sheet: &str) -> Result<Vec<Record>> {
        let content = fs::read_to_string(path)?;
        let document: JsonValue = serde_json::from_str(&content)?;
        records_from_json(document, sheet).map_err(|e| match e {
            SheetdiffError::InvalidInput { message } => SheetdiffError::invalid_input(format!(
                "{}: {}",
                path.display(),
                message
            )),
            other => other,
        })
    }

    fn load_csv(&self, path: &Path) -> Result<Vec<Record>> {
        let content = fs::read_to_string(path)?;
        records_from_csv(&content, self.header_row)
    }
}

/// Extract a sheet of records from a parsed JSON document
pub fn records_from_json(document: JsonValue, sheet: &str) -> Result<Vec<Record>> {
    match document {
        JsonValue::Array(_) => Ok(serde_json::from_value(document)?),
        JsonValue::Object(mut sheets) => match sheets.remove(sheet) {
            Some(rows @ JsonValue::Array(_)) => Ok(serde_json::from_value(rows)?),
            Some(_) => Err(SheetdiffError::invalid_input(format!(
                "Sheet '{}' is not a list of rows",
                sheet
            ))),
            None => {
                let available: Vec<&str> = sheets.keys().map(String::as_str).collect();
                Err(SheetdiffError::invalid_input(format!(
                    "Sheet '{}' not found. Available: {}",
                    sheet,
                    available.join(", ")
                )))
            }
        },
        _ => Err(SheetdiffError::invalid_input(
            "Expected a list of rows or an object of sheets",
        )),
    }
}

/// Parse CSV text after skipping `header_row` leading lines.
///
/// Empty cells become null; everything else is kept as text.
pub fn records_from_csv(content: &str, header_row: usize) -> Result<Vec<Record>> {
    let body = content
        .split_inclusive('\n')
        .skip(header_row)
        .collect::<String>();

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: Record = headers
            .iter()
            .enumerate()
            .map(|(i, header)| {
                let value = match row.get(i) {
                    Some(cell) if !cell.is_empty() => Value::Text(cell.to_string()),
                    _ => Value::Null,
                };
                (header.clone(), value)
            })
            .collect();
        records.push(record);
    }
    Ok(records)
}
