use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::lookup_store::LoadedTable;
use crate::domain::error::Result;

#[derive(Default)]
struct CacheState {
    entries: HashMap<PathBuf, Arc<LoadedTable>>,
    hits: usize,
    misses: usize,
}

/// Loaded tables keyed by source path.
///
/// Entries live as long as the cache; there is no TTL and no eviction.
/// Only [`DatasetCache::replace`] swaps an entry.
#[derive(Default)]
pub struct DatasetCache {
    state: Mutex<CacheState>,
}

impl DatasetCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cached table for `path`, or the result of `load` stored under it.
    ///
    /// The lock is held while loading so each path is read at most once.
    /// A failed load caches nothing.
    pub fn get_or_try_insert_with<F>(&self, path: &Path, load: F) -> Result<Arc<LoadedTable>>
    where
        F: FnOnce() -> Result<LoadedTable>,
    {
        let mut state = self.state();

        if let Some(table) = state.entries.get(path).cloned() {
            state.hits += 1;
            return Ok(table);
        }

        state.misses += 1;
        let table = Arc::new(load()?);
        state.entries.insert(path.to_path_buf(), table.clone());
        Ok(table)
    }

    pub fn get(&self, path: &Path) -> Option<Arc<LoadedTable>> {
        self.state().entries.get(path).cloned()
    }

    /// Store `table` under `path`, dropping any previous entry.
    pub fn replace(&self, path: &Path, table: LoadedTable) -> Arc<LoadedTable> {
        let table = Arc::new(table);
        self.state()
            .entries
            .insert(path.to_path_buf(), table.clone());
        table
    }

    pub fn stats(&self) -> DatasetCacheStats {
        let state = self.state();
        let total_requests = state.hits + state.misses;
        let hit_rate = if total_requests > 0 {
            state.hits as f32 / total_requests as f32
        } else {
            0.0
        };

        DatasetCacheStats {
            entries: state.entries.len(),
            hits: state.hits,
            misses: state.misses,
            hit_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetCacheStats {
    pub entries: usize,
    pub hits: usize,
    pub misses: usize,
    pub hit_rate: f32,
}
