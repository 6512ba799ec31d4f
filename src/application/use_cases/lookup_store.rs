//! Tabular lookup store
//!
//! Loads a spreadsheet into a [`Dataset`] with normalized column names,
//! keeps it in a [`DatasetCache`] and answers equality lookups on a single
//! key column.

use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::dataset_cache::{DatasetCache, DatasetCacheStats};
use crate::domain::column_map::{normalize_column_name, ColumnNameMap};
use crate::domain::dataset::{Dataset, DisplayField, LookupKey, QueryResult, Record};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::KeyColumn;
use crate::infrastructure::tabular::read_table;

/// A dataset together with the header mapping it was built from.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    pub path: PathBuf,
    pub dataset: Dataset,
    pub column_map: ColumnNameMap,
    pub loaded_at: DateTime<Local>,
}

impl LoadedTable {
    pub fn new(path: PathBuf, dataset: Dataset, column_map: ColumnNameMap) -> Self {
        Self {
            path,
            dataset,
            column_map,
            loaded_at: Local::now(),
        }
    }
}

pub struct TabularLookupStore {
    cache: Arc<DatasetCache>,
    sheet: Option<String>,
}

impl Default for TabularLookupStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TabularLookupStore {
    /// Store with its own empty cache.
    pub fn new() -> Self {
        Self::with_cache(Arc::new(DatasetCache::new()))
    }

    pub fn with_cache(cache: Arc<DatasetCache>) -> Self {
        Self { cache, sheet: None }
    }

    pub fn with_sheet(mut self, sheet: Option<String>) -> Self {
        self.sheet = sheet;
        self
    }

    /// Load `path`, reusing the cached table when there is one.
    pub fn load(&self, path: &Path) -> Result<Arc<LoadedTable>> {
        self.cache
            .get_or_try_insert_with(path, || self.read(path))
    }

    /// Re-read `path` and replace the cached table.
    ///
    /// On failure the previous table stays cached.
    pub fn reload(&self, path: &Path) -> Result<Arc<LoadedTable>> {
        self.reload_with(path, |_| Ok(())).map(|(table, ())| table)
    }

    /// Like [`reload`](Self::reload), but the new table only replaces the
    /// cached one once `validate` accepts it.
    pub fn reload_with<T, F>(&self, path: &Path, validate: F) -> Result<(Arc<LoadedTable>, T)>
    where
        F: FnOnce(&LoadedTable) -> Result<T>,
    {
        let table = self.read(path)?;
        let checked = validate(&table)?;
        info!(path = %path.display(), rows = table.dataset.len(), "Reloaded tabular dataset");
        Ok((self.cache.replace(path, table), checked))
    }

    pub fn cache_stats(&self) -> DatasetCacheStats {
        self.cache.stats()
    }

    fn read(&self, path: &Path) -> Result<LoadedTable> {
        let raw = read_table(path, self.sheet.as_deref())?;

        let overflowing = raw.overflowing_rows();
        if overflowing > 0 {
            warn!(
                path = %path.display(),
                rows = overflowing,
                columns = raw.headers.len(),
                "Rows have values beyond the header row; those cells are ignored"
            );
        }

        let (dataset, column_map) = Dataset::from_rows(&raw.headers, raw.rows);

        for collision in column_map.collisions() {
            let labels: Vec<&str> = column_map
                .iter()
                .filter(|entry| entry.normalized == collision)
                .map(|entry| entry.original.as_str())
                .collect();
            warn!(
                column = %collision,
                labels = ?labels,
                "Column labels normalize to the same name; the last column wins"
            );
        }

        info!(
            path = %path.display(),
            rows = dataset.len(),
            columns = dataset.columns().len(),
            "Loaded tabular dataset"
        );

        Ok(LoadedTable::new(path.to_path_buf(), dataset, column_map))
    }

    /// Records whose `key_column` equals `key_value` parsed as an integer.
    ///
    /// The value is validated before the schema is checked.
    pub fn lookup<'a>(
        dataset: &'a Dataset,
        key_column: &str,
        key_value: &str,
    ) -> Result<QueryResult<'a>> {
        let key = LookupKey::parse(key_value)?;
        Self::lookup_key(dataset, key_column, key)
    }

    pub fn lookup_key<'a>(
        dataset: &'a Dataset,
        key_column: &str,
        key: LookupKey,
    ) -> Result<QueryResult<'a>> {
        let key_column = normalize_column_name(key_column);
        if !dataset.has_column(&key_column) {
            return Err(AppError::SchemaError(format!(
                "Key column '{}' not found (available: {})",
                key_column,
                dataset.columns().join(", ")
            )));
        }

        let records: Vec<&Record> = dataset
            .records()
            .iter()
            .filter(|record| {
                record
                    .get(&key_column)
                    .is_some_and(|cell| key.matches(cell))
            })
            .collect();

        debug!(column = %key_column, key = %key, matches = records.len(), "Lookup");

        Ok(QueryResult {
            key_column,
            key,
            records,
        })
    }

    /// Pair each original label with the record's value, in header order.
    pub fn to_display_row(record: &Record, column_map: &ColumnNameMap) -> Vec<DisplayField> {
        column_map
            .iter()
            .map(|mapping| DisplayField {
                label: mapping.original.clone(),
                value: record.value_or_empty(&mapping.normalized),
            })
            .collect()
    }

    /// Normalized name of the configured key column.
    pub fn resolve_key_column(table: &LoadedTable, key_column: &KeyColumn) -> Result<String> {
        match key_column {
            KeyColumn::Named(name) => {
                let normalized = normalize_column_name(name);
                if table.dataset.has_column(&normalized) {
                    Ok(normalized)
                } else {
                    Err(AppError::SchemaError(format!(
                        "Key column '{}' not found in {} (available: {})",
                        normalized,
                        table.path.display(),
                        table.dataset.columns().join(", ")
                    )))
                }
            }
            KeyColumn::Position { position } => table
                .column_map
                .iter()
                .nth(*position)
                .map(|mapping| mapping.normalized.clone())
                .ok_or_else(|| {
                    AppError::SchemaError(format!(
                        "Key column position {} is out of range ({} has {} columns)",
                        position,
                        table.path.display(),
                        table.column_map.len()
                    ))
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cell::CellValue;
    use crate::infrastructure::tabular::fixtures::write_xlsx;

    fn dataset(columns: &[&str], records: Vec<Record>) -> Dataset {
        Dataset::new(columns.iter().map(|c| c.to_string()).collect(), records)
    }

    fn acme() -> Dataset {
        dataset(
            &["filiaalnummer", "naam"],
            vec![Record::from([
                ("filiaalnummer", CellValue::Integer(175)),
                ("naam", CellValue::String("Acme".into())),
            ])],
        )
    }

    #[test]
    fn test_single_match() {
        let data = acme();
        let result = TabularLookupStore::lookup(&data, "filiaalnummer", "175").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(
            result.records[0].get("naam"),
            Some(&CellValue::String("Acme".into()))
        );
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let data = acme();
        let result = TabularLookupStore::lookup(&data, "filiaalnummer", "999").unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_invalid_value_is_validation_error() {
        let data = acme();
        let err = TabularLookupStore::lookup(&data, "filiaalnummer", "abc").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_validation_precedes_schema_check() {
        let data = dataset(&["naam"], vec![]);
        let err = TabularLookupStore::lookup(&data, "filiaalnummer", "abc").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_missing_key_column_is_schema_error() {
        let data = dataset(
            &["naam"],
            vec![Record::from([("naam", CellValue::String("Acme".into()))])],
        );
        let err = TabularLookupStore::lookup(&data, "filiaalnummer", "1").unwrap_err();
        assert!(err.is_schema());
    }

    #[test]
    fn test_duplicates_keep_row_order() {
        let data = dataset(
            &["a", "row"],
            vec![
                Record::from([("a", CellValue::Integer(1)), ("row", CellValue::Integer(0))]),
                Record::from([("a", CellValue::Integer(1)), ("row", CellValue::Integer(1))]),
                Record::from([("a", CellValue::Integer(2)), ("row", CellValue::Integer(2))]),
            ],
        );
        let result = TabularLookupStore::lookup(&data, "a", "1").unwrap();
        let rows: Vec<&CellValue> = result.iter().map(|r| r.get("row").unwrap()).collect();
        assert_eq!(rows, vec![&CellValue::Integer(0), &CellValue::Integer(1)]);
    }

    #[test]
    fn test_every_record_is_retrievable_by_its_key() {
        let keys = [3, 1, 4, 1, 5, 9, 2, 6];
        let records: Vec<Record> = keys
            .iter()
            .enumerate()
            .map(|(i, k)| {
                Record::from([
                    ("id", CellValue::Integer(*k)),
                    ("pos", CellValue::Integer(i as i64)),
                ])
            })
            .collect();
        let data = dataset(&["id", "pos"], records);

        for record in data.records() {
            let key = match record.get("id") {
                Some(CellValue::Integer(k)) => *k,
                other => panic!("unexpected key {:?}", other),
            };
            let result = TabularLookupStore::lookup(&data, "id", &key.to_string()).unwrap();
            assert!(result.iter().any(|r| r == record));

            let positions: Vec<i64> = result
                .iter()
                .map(|r| match r.get("pos") {
                    Some(CellValue::Integer(p)) => *p,
                    _ => -1,
                })
                .collect();
            let mut sorted = positions.clone();
            sorted.sort();
            assert_eq!(positions, sorted);
        }
    }

    #[test]
    fn test_float_cells_match_integer_key_and_strings_do_not() {
        let data = dataset(
            &["nr"],
            vec![
                Record::from([("nr", CellValue::Float(175.0))]),
                Record::from([("nr", CellValue::String("175".into()))]),
            ],
        );
        let result = TabularLookupStore::lookup(&data, "nr", "175").unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.records[0].get("nr"), Some(&CellValue::Float(175.0)));
    }

    #[test]
    fn test_key_column_argument_is_normalized() {
        let data = acme();
        let result = TabularLookupStore::lookup(&data, " Filiaalnummer", "175").unwrap();
        assert_eq!(result.key_column, "filiaalnummer");
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_to_display_row_uses_original_labels_in_order() {
        let (data, map) = Dataset::from_rows(
            &["Filiaalnummer".to_string(), "Klant Naam".to_string()],
            vec![vec![CellValue::Integer(175), CellValue::String("Acme".into())]],
        );
        let fields = TabularLookupStore::to_display_row(&data.records()[0], &map);
        assert_eq!(
            fields,
            vec![
                DisplayField {
                    label: "Filiaalnummer".into(),
                    value: CellValue::Integer(175)
                },
                DisplayField {
                    label: "Klant Naam".into(),
                    value: CellValue::String("Acme".into())
                },
            ]
        );
    }

    #[test]
    fn test_load_is_cached_per_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("klanten.csv");
        std::fs::write(&path, "Filiaalnummer,Naam\n175,Acme\n").unwrap();

        let store = TabularLookupStore::new();
        let first = store.load(&path).unwrap();
        std::fs::write(&path, "Filiaalnummer,Naam\n175,Changed\n176,New\n").unwrap();
        let second = store.load(&path).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.dataset.len(), 1);
        assert_eq!(store.cache_stats().hits, 1);

        // A fresh store does not share the cache.
        let fresh = TabularLookupStore::new().load(&path).unwrap();
        assert_eq!(fresh.dataset.len(), 2);
    }

    #[test]
    fn test_reload_replaces_and_keeps_old_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("klanten.csv");
        std::fs::write(&path, "Filiaalnummer\n1\n").unwrap();

        let store = TabularLookupStore::new();
        store.load(&path).unwrap();

        std::fs::write(&path, "Filiaalnummer\n1\n2\n").unwrap();
        assert_eq!(store.reload(&path).unwrap().dataset.len(), 2);

        std::fs::remove_file(&path).unwrap();
        assert!(store.reload(&path).unwrap_err().is_load());
        assert_eq!(store.load(&path).unwrap().dataset.len(), 2);
    }

    #[test]
    fn test_reload_with_rejected_table_keeps_previous() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("klanten.csv");
        std::fs::write(&path, "Filiaalnummer\n1\n").unwrap();

        let store = TabularLookupStore::new();
        let before = store.load(&path).unwrap();

        std::fs::write(&path, "Naam\nAcme\n").unwrap();
        let err = store
            .reload_with(&path, |table| {
                TabularLookupStore::resolve_key_column(table, &KeyColumn::default())
            })
            .unwrap_err();
        assert!(err.is_schema());
        assert!(Arc::ptr_eq(&before, &store.load(&path).unwrap()));
    }

    #[test]
    fn test_out_of_range_key_is_empty_result() {
        let data = acme();
        let result =
            TabularLookupStore::lookup(&data, "filiaalnummer", "99999999999999999999").unwrap();
        assert!(result.is_empty());
        assert_eq!(result.key.to_string(), "99999999999999999999");
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = TabularLookupStore::new()
            .load(&dir.path().join("klantenlijst.xlsx"))
            .unwrap_err();
        assert!(err.is_load());
    }

    #[test]
    fn test_load_xlsx_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("klantenlijst.xlsx");
        write_xlsx(
            &path,
            "Blad1",
            &[
                &["Filiaalnummer", "Klant Naam"],
                &["175", "Acme"],
                &["176", "Globex"],
            ],
        );

        let table = TabularLookupStore::new().load(&path).unwrap();
        assert_eq!(table.dataset.columns(), &["filiaalnummer", "klant_naam"]);

        let result = TabularLookupStore::lookup(&table.dataset, "filiaalnummer", "176").unwrap();
        assert_eq!(result.len(), 1);
        let fields = TabularLookupStore::to_display_row(result.records[0], &table.column_map);
        assert_eq!(fields[1].label, "Klant Naam");
        assert_eq!(fields[1].value, CellValue::String("Globex".into()));
    }

    #[test]
    fn test_resolve_key_column() {
        let (dataset, column_map) = Dataset::from_rows(
            &["Nr".to_string(), "Filiaal Nummer".to_string()],
            vec![],
        );
        let table = LoadedTable::new(PathBuf::from("t.csv"), dataset, column_map);

        assert_eq!(
            TabularLookupStore::resolve_key_column(&table, &KeyColumn::Named("Filiaal Nummer".into()))
                .unwrap(),
            "filiaal_nummer"
        );
        assert_eq!(
            TabularLookupStore::resolve_key_column(&table, &KeyColumn::Position { position: 0 })
                .unwrap(),
            "nr"
        );
        assert!(
            TabularLookupStore::resolve_key_column(&table, &KeyColumn::Position { position: 5 })
                .unwrap_err()
                .is_schema()
        );
        assert!(
            TabularLookupStore::resolve_key_column(&table, &KeyColumn::Named("plaats".into()))
                .unwrap_err()
                .is_schema()
        );
    }
}
