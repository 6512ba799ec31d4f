use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::dataset_cache::DatasetCacheStats;
use super::lookup_store::{LoadedTable, TabularLookupStore};
use crate::domain::cell::CellValue;
use crate::domain::column_map::ColumnMapping;
use crate::domain::dataset::{DisplayField, LookupKey};
use crate::domain::error::Result;
use crate::infrastructure::config::KeyColumn;

/// The key column as resolved against a loaded table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedKey {
    /// Normalized name used for matching
    pub column: String,
    /// Original label shown to the user
    pub label: String,
}

/// What the presentation layer should show for one query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupOutcome {
    /// Blank input; nothing to look up yet.
    Idle,
    Invalid {
        message: String,
    },
    NotFound {
        message: String,
    },
    Single {
        title: String,
        fields: Vec<DisplayField>,
    },
    Multiple {
        title: String,
        columns: Vec<String>,
        rows: Vec<Vec<CellValue>>,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnsView {
    pub path: PathBuf,
    pub rows: usize,
    pub loaded_at: DateTime<Local>,
    pub key: ResolvedKey,
    pub columns: Vec<ColumnMapping>,
}

pub struct LookupUseCase {
    store: Arc<TabularLookupStore>,
    data_path: PathBuf,
    key_column: KeyColumn,
}

impl LookupUseCase {
    pub fn new(store: Arc<TabularLookupStore>, data_path: PathBuf, key_column: KeyColumn) -> Self {
        Self {
            store,
            data_path,
            key_column,
        }
    }

    /// Load the dataset and resolve the key column.
    ///
    /// Called once at startup; any error here should stop the session.
    pub fn prepare(&self) -> Result<ResolvedKey> {
        let table = self.store.load(&self.data_path)?;
        let key = self.resolve(&table)?;
        info!(
            path = %self.data_path.display(),
            key_column = %key.column,
            rows = table.dataset.len(),
            "Lookup ready"
        );
        Ok(key)
    }

    pub fn execute(&self, input: &str) -> Result<LookupOutcome> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(LookupOutcome::Idle);
        }

        let table = self.store.load(&self.data_path)?;
        let resolved = self.resolve(&table);
        let label = match &resolved {
            Ok(key) => key.label.clone(),
            Err(_) => self.key_column.to_string(),
        };

        let key = match LookupKey::parse(input) {
            Ok(key) => key,
            Err(err) => {
                debug!(input, error = %err, "Rejected lookup input");
                return Ok(LookupOutcome::Invalid {
                    message: format!("Please enter a valid integer for {}.", label),
                });
            }
        };

        let resolved = resolved?;
        let result = TabularLookupStore::lookup_key(&table.dataset, &resolved.column, key)?;

        let outcome = match result.records.as_slice() {
            [] => LookupOutcome::NotFound {
                message: format!("No records found where {} = {}.", label, result.key),
            },
            [record] => LookupOutcome::Single {
                title: format!("Details for {} {}", label, result.key),
                fields: TabularLookupStore::to_display_row(record, &table.column_map),
            },
            records => LookupOutcome::Multiple {
                title: format!("{} records for {} {}", records.len(), label, result.key),
                columns: table
                    .column_map
                    .iter()
                    .map(|mapping| mapping.original.clone())
                    .collect(),
                rows: records
                    .iter()
                    .map(|record| {
                        TabularLookupStore::to_display_row(record, &table.column_map)
                            .into_iter()
                            .map(|field| field.value)
                            .collect()
                    })
                    .collect(),
            },
        };

        Ok(outcome)
    }

    pub fn columns(&self) -> Result<ColumnsView> {
        let table = self.store.load(&self.data_path)?;
        let key = self.resolve(&table)?;
        Ok(ColumnsView {
            path: self.data_path.clone(),
            rows: table.dataset.len(),
            loaded_at: table.loaded_at,
            key,
            columns: table.column_map.iter().cloned().collect(),
        })
    }

    /// Re-read the data file; returns the new row count.
    ///
    /// A file without the key column is rejected and the current table stays.
    pub fn reload(&self) -> Result<usize> {
        let (table, _) = self
            .store
            .reload_with(&self.data_path, |table| self.resolve(table))?;
        Ok(table.dataset.len())
    }

    pub fn cache_stats(&self) -> DatasetCacheStats {
        self.store.cache_stats()
    }

    fn resolve(&self, table: &LoadedTable) -> Result<ResolvedKey> {
        let column = TabularLookupStore::resolve_key_column(table, &self.key_column)?;
        let label = table
            .column_map
            .original(&column)
            .unwrap_or(column.as_str())
            .to_string();
        Ok(ResolvedKey { column, label })
    }
}
