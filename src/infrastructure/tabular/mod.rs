// ============================================================
// TABULAR INFRASTRUCTURE LAYER
// ============================================================
// Reads spreadsheet and delimited files into a raw header row plus
// typed cells. Schema normalization happens in the domain layer.

mod csv_reader;
mod workbook_reader;

#[cfg(test)]
pub(crate) mod fixtures;

pub use csv_reader::CsvReader;
pub use workbook_reader::WorkbookReader;

use std::path::Path;

use crate::domain::cell::CellValue;
use crate::domain::error::{AppError, Result};

/// Header labels as found in the file, followed by data rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// Rows holding non-empty cells past the last header column.
    pub fn overflowing_rows(&self) -> usize {
        let width = self.headers.len();
        self.rows
            .iter()
            .filter(|row| row.iter().skip(width).any(|cell| !cell.is_empty()))
            .count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabularFormat {
    Workbook,
    Delimited,
}

impl TabularFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "xla" | "ods" => Ok(TabularFormat::Workbook),
            "csv" | "tsv" | "txt" => Ok(TabularFormat::Delimited),
            other => Err(AppError::LoadError(format!(
                "Unsupported file format '{}' for {}",
                other,
                path.display()
            ))),
        }
    }
}

/// Read any supported tabular file.
///
/// `sheet` selects a worksheet by name and is ignored for delimited files.
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<RawTable> {
    if !path.is_file() {
        return Err(AppError::LoadError(format!(
            "File not found: {}",
            path.display()
        )));
    }

    match TabularFormat::from_path(path)? {
        TabularFormat::Workbook => WorkbookReader::new(sheet.map(str::to_string)).read(path),
        TabularFormat::Delimited => CsvReader::new().read(path),
    }
}
