// ============================================================
// COLUMN NAME MAP
// ============================================================
// Original header labels and their normalized lookup keys

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Trim, lower-case, then replace spaces with underscores.
pub fn normalize_column_name(label: &str) -> String {
    label.trim().to_lowercase().replace(' ', "_")
}

/// Turn a raw header row into unique original labels.
///
/// Blank headers become `Unnamed: <index>`; repeated labels get a
/// `.1`, `.2`, ... suffix.
pub fn label_headers(raw: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut labels = Vec::with_capacity(raw.len());

    for (index, header) in raw.iter().enumerate() {
        let base = if header.trim().is_empty() {
            format!("Unnamed: {}", index)
        } else {
            header.clone()
        };

        let mut label = base.clone();
        let mut suffix = 1;
        while seen.contains(&label) {
            label = format!("{}.{}", base, suffix);
            suffix += 1;
        }

        seen.insert(label.clone());
        labels.push(label);
    }

    labels
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub original: String,
    pub normalized: String,
}

/// Original label -> normalized key, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNameMap {
    entries: Vec<ColumnMapping>,
}

impl ColumnNameMap {
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let entries = labels
            .iter()
            .map(|label| ColumnMapping {
                original: label.as_ref().to_string(),
                normalized: normalize_column_name(label.as_ref()),
            })
            .collect();

        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnMapping> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn normalized(&self, original: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.original == original)
            .map(|entry| entry.normalized.as_str())
    }

    /// First original label that normalizes to `normalized`.
    pub fn original(&self, normalized: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.normalized == normalized)
            .map(|entry| entry.original.as_str())
    }

    /// Distinct normalized keys in first-appearance order.
    pub fn normalized_columns(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|entry| seen.insert(entry.normalized.as_str()))
            .map(|entry| entry.normalized.clone())
            .collect()
    }

    /// Normalized keys shared by more than one original label.
    pub fn collisions(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut collisions = Vec::new();

        for entry in &self.entries {
            if !seen.insert(entry.normalized.as_str())
                && reported.insert(entry.normalized.as_str())
            {
                collisions.push(entry.normalized.clone());
            }
        }

        collisions
    }
}
