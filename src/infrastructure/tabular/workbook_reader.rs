// ============================================================
// WORKBOOK READER
// ============================================================
// xls / xlsx / xlsb / ods through calamine

use std::path::Path;

use calamine::{open_workbook_auto, Data, DataType, Range, Reader};
use tracing::debug;

use super::RawTable;
use crate::domain::cell::CellValue;
use crate::domain::error::{AppError, Result};

#[derive(Debug, Clone, Default)]
pub struct WorkbookReader {
    /// Worksheet name; the first sheet when unset
    sheet: Option<String>,
}

impl WorkbookReader {
    pub fn new(sheet: Option<String>) -> Self {
        Self { sheet }
    }

    pub fn read(&self, path: &Path) -> Result<RawTable> {
        let mut workbook = open_workbook_auto(path).map_err(|e| {
            AppError::LoadError(format!("Failed to open workbook {}: {}", path.display(), e))
        })?;

        let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
        let index = match &self.sheet {
            Some(name) => sheet_names.iter().position(|n| n == name).ok_or_else(|| {
                AppError::LoadError(format!(
                    "Worksheet '{}' not found in {} (available: {})",
                    name,
                    path.display(),
                    sheet_names.join(", ")
                ))
            })?,
            None => 0,
        };

        let range = workbook
            .worksheet_range_at(index)
            .ok_or_else(|| {
                AppError::LoadError(format!("No worksheet found in {}", path.display()))
            })?
            .map_err(|e| {
                AppError::LoadError(format!(
                    "Failed to read worksheet range in {}: {}",
                    path.display(),
                    e
                ))
            })?;

        debug!(
            sheet = sheet_names.get(index).map(String::as_str).unwrap_or(""),
            height = range.height(),
            width = range.width(),
            "Read worksheet range"
        );

        Ok(range_to_table(&range))
    }
}

/// First row is the header row; everything below is data.
fn range_to_table(range: &Range<Data>) -> RawTable {
    let mut rows = range.rows();

    let headers = match rows.next() {
        Some(header_row) => header_row.iter().map(|cell| cell.to_string()).collect(),
        None => return RawTable::default(),
    };

    let rows = rows
        .map(|row| row.iter().map(cell_value).collect())
        .collect();

    RawTable { headers, rows }
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Int(value) => CellValue::Integer(*value),
        Data::Float(value) => CellValue::Float(*value),
        Data::Bool(value) => CellValue::Boolean(*value),
        Data::String(value) if value.trim().is_empty() => CellValue::Empty,
        Data::String(value) => CellValue::String(value.clone()),
        Data::DateTimeIso(value) | Data::DurationIso(value) => CellValue::String(value.clone()),
        Data::DateTime(_) => match cell.as_datetime() {
            Some(datetime) => CellValue::String(datetime.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => CellValue::String(cell.to_string()),
        },
        // Error cells (#N/A, #REF!, ...) carry no value
        _ => CellValue::Empty,
    }
}
