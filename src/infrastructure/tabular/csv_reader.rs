// ============================================================
// CSV READER
// ============================================================
// Delimited text with delimiter and encoding detection

use std::path::Path;

use csv::{ReaderBuilder, Trim};
use encoding_rs::{UTF_8, WINDOWS_1252};
use tracing::debug;

use super::RawTable;
use crate::domain::cell::CellValue;
use crate::domain::error::{AppError, Result};

#[derive(Debug, Clone, Default)]
pub struct CsvReader {
    /// Fixed delimiter; detected from content when unset
    delimiter: Option<u8>,
}

impl CsvReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = Some(delimiter);
        self
    }

    pub fn read(&self, path: &Path) -> Result<RawTable> {
        let bytes = std::fs::read(path).map_err(|e| {
            AppError::LoadError(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let content = decode(&bytes);
        self.parse_content(&content)
    }

    /// Parse delimited content; the first record is the header row.
    pub fn parse_content(&self, content: &str) -> Result<RawTable> {
        let delimiter = self
            .delimiter
            .unwrap_or_else(|| Self::detect_delimiter(content));

        debug!(delimiter = ?(delimiter as char), "Parsing delimited content");

        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(Trim::None)
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| AppError::LoadError(format!("Failed to read CSV headers: {}", e)))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::LoadError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;
            rows.push(record.iter().map(CellValue::infer).collect());
        }

        Ok(RawTable { headers, rows })
    }

    /// Pick the delimiter (comma, semicolon, tab, pipe) that occurs most
    /// consistently across the first lines.
    pub fn detect_delimiter(content: &str) -> u8 {
        let candidates = [b',', b';', b'\t', b'|'];
        let sample_lines: Vec<&str> = content.lines().take(10).collect();

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        if sample_lines.is_empty() {
            return best_delimiter;
        }

        for &delimiter in &candidates {
            let field_counts: Vec<usize> = sample_lines
                .iter()
                .map(|line| line.bytes().filter(|&b| b == delimiter).count())
                .collect();

            let avg = field_counts.iter().sum::<usize>() as f32 / field_counts.len() as f32;
            let variance = field_counts
                .iter()
                .map(|&x| (x as f32 - avg).powi(2))
                .sum::<f32>()
                / field_counts.len() as f32;

            let score = avg / (1.0 + variance.sqrt());
            if score > best_score {
                best_score = score;
                best_delimiter = delimiter;
            }
        }

        best_delimiter
    }
}

/// UTF-8 (BOM stripped) when valid, Windows-1252 otherwise.
fn decode(bytes: &[u8]) -> String {
    let (text, _, had_errors) = UTF_8.decode(bytes);
    if !had_errors {
        return text.into_owned();
    }

    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}
