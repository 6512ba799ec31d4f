// ============================================================
// CELL VALUES
// ============================================================
// Dynamically typed spreadsheet cells. A column may mix kinds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single cell as inferred from the source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Empty,
}

impl CellValue {
    /// Infer a cell from raw text: integer, then float, then string.
    /// Blank text is `Empty`.
    pub fn infer(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        if let Ok(value) = trimmed.parse::<i64>() {
            return CellValue::Integer(value);
        }
        if let Ok(value) = trimmed.parse::<f64>() {
            if value.is_finite() {
                return CellValue::Float(value);
            }
        }
        CellValue::String(raw.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Numeric equality against an integer key.
    ///
    /// Strings never match, even when they look numeric.
    pub fn matches_integer(&self, key: i64) -> bool {
        match self {
            CellValue::Integer(value) => *value == key,
            CellValue::Float(value) => *value == key as f64,
            CellValue::Boolean(value) => i64::from(*value) == key,
            CellValue::String(_) | CellValue::Empty => false,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::String(value) => write!(f, "{}", value),
            CellValue::Integer(value) => write!(f, "{}", value),
            CellValue::Float(value) => write!(f, "{}", value),
            CellValue::Boolean(value) => write!(f, "{}", value),
            CellValue::Empty => Ok(()),
        }
    }
}
