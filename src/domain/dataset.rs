use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::cell::CellValue;
use super::column_map::{label_headers, ColumnNameMap};
use super::error::{AppError, Result};

// `\d` is Unicode-aware: any decimal digit (Nd), not only ASCII.
static INTEGER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+(?:_\d+)*$").unwrap());
static DECIMAL_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d$").unwrap());

/// One row, keyed by normalized column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    values: HashMap<String, CellValue>,
}

impl Record {
    pub fn new(values: HashMap<String, CellValue>) -> Self {
        Self { values }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.values.get(column)
    }

    /// Value for `column`, treating a missing key as empty.
    pub fn value_or_empty(&self, column: &str) -> CellValue {
        self.values.get(column).cloned().unwrap_or(CellValue::Empty)
    }
}

impl<K: Into<String>, const N: usize> From<[(K, CellValue); N]> for Record {
    fn from(pairs: [(K, CellValue); N]) -> Self {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Ordered, immutable set of records with a normalized schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Self { columns, records }
    }

    /// Build a dataset from a raw header row and typed data rows.
    ///
    /// Rows with only empty cells are skipped and short rows are padded.
    /// When two labels normalize to the same key the last column wins.
    pub fn from_rows(raw_headers: &[String], rows: Vec<Vec<CellValue>>) -> (Self, ColumnNameMap) {
        let labels = label_headers(raw_headers);
        let column_map = ColumnNameMap::from_labels(&labels);
        let columns = column_map.normalized_columns();

        let records = rows
            .into_iter()
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .map(|row| {
                let mut values = HashMap::with_capacity(columns.len());
                for (index, mapping) in column_map.iter().enumerate() {
                    let cell = row.get(index).cloned().unwrap_or(CellValue::Empty);
                    values.insert(mapping.normalized.clone(), cell);
                }
                Record::new(values)
            })
            .collect();

        (Self { columns, records }, column_map)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Query value coerced to the key comparison type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupKey {
    Int(i64),
    /// A well-formed integer outside the `i64` range, kept as canonical
    /// ASCII digits. No cell can hold it, so it matches nothing.
    OutOfRange(String),
}

impl LookupKey {
    /// Parse free text as an integer.
    ///
    /// Accepts surrounding whitespace, a sign, `_` between digit groups and
    /// decimal digits from any script.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if !INTEGER_PATTERN.is_match(trimmed) {
            return Err(AppError::ValidationError(format!(
                "'{}' is not a valid integer",
                input
            )));
        }

        let negative = trimmed.starts_with('-');
        let digits: String = trimmed
            .chars()
            .filter(|c| !matches!(*c, '+' | '-' | '_'))
            .filter_map(|c| char::from_digit(decimal_digit_value(c), 10))
            .collect();
        let digits = match digits.trim_start_matches('0') {
            "" => "0",
            significant => significant,
        };
        let canonical = if negative && digits != "0" {
            format!("-{}", digits)
        } else {
            digits.to_string()
        };

        Ok(match canonical.parse::<i64>() {
            Ok(value) => LookupKey::Int(value),
            Err(_) => LookupKey::OutOfRange(canonical),
        })
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            LookupKey::Int(value) => Some(*value),
            LookupKey::OutOfRange(_) => None,
        }
    }

    pub fn matches(&self, cell: &CellValue) -> bool {
        self.as_i64().is_some_and(|value| cell.matches_integer(value))
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupKey::Int(value) => write!(f, "{}", value),
            LookupKey::OutOfRange(digits) => write!(f, "{}", digits),
        }
    }
}

fn is_decimal_digit(c: char) -> bool {
    let mut buf = [0u8; 4];
    DECIMAL_DIGIT.is_match(c.encode_utf8(&mut buf))
}

/// Numeric value of a decimal digit in any script.
///
/// Unicode encodes decimal digits in contiguous runs of ten, zero first,
/// so the offset from the start of the run gives the value.
fn decimal_digit_value(c: char) -> u32 {
    if let Some(value) = c.to_digit(10) {
        return value;
    }

    let mut start = c as u32;
    while let Some(prev) = start.checked_sub(1).and_then(char::from_u32) {
        if !is_decimal_digit(prev) {
            break;
        }
        start -= 1;
    }
    (c as u32 - start) % 10
}

/// Matching records in original row order. Empty is a valid outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult<'a> {
    pub key_column: String,
    pub key: LookupKey,
    pub records: Vec<&'a Record>,
}

impl<'a> QueryResult<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        self.records.iter().copied()
    }
}

/// Original label paired with a cell value, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayField {
    pub label: String,
    pub value: CellValue,
}
