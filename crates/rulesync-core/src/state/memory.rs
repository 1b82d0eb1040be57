// # Memory Row Id Store
//
// In-memory implementation of RowIdStore.
//
// ## Purpose
//
// Keeps tracked ids for the lifetime of the process only. Useful for tests
// and for embedding the engine where the caller persists ids itself.
//
// ## Untracked Mode
//
// `MemoryRowIdStore::untracked()` mirrors a config file without a
// `domain_row_ids` key: loads return nothing and stores are refused.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::rule::RowId;
use crate::traits::RowIdStore;

/// In-memory row id store implementation
///
/// Clones share the same underlying list.
#[derive(Debug, Clone)]
pub struct MemoryRowIdStore {
    inner: Arc<RwLock<Vec<RowId>>>,
    tracked: bool,
    writes: Arc<RwLock<usize>>,
}

impl MemoryRowIdStore {
    /// Create an empty, tracking store
    pub fn new() -> Self {
        Self::with_row_ids(Vec::new())
    }

    /// Create a tracking store seeded with ids
    pub fn with_row_ids(ids: Vec<RowId>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ids)),
            tracked: true,
            writes: Arc::new(RwLock::new(0)),
        }
    }

    /// Create a store that does not track ids
    pub fn untracked() -> Self {
        Self {
            tracked: false,
            ..Self::new()
        }
    }

    /// Current ids
    pub async fn snapshot(&self) -> Vec<RowId> {
        self.inner.read().await.clone()
    }

    /// Number of accepted `store_row_ids` calls
    pub async fn write_count(&self) -> usize {
        *self.writes.read().await
    }
}

impl Default for MemoryRowIdStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RowIdStore for MemoryRowIdStore {
    async fn load_row_ids(&self) -> Result<Vec<RowId>, Error> {
        if !self.tracked {
            return Ok(Vec::new());
        }
        Ok(self.inner.read().await.clone())
    }

    async fn store_row_ids(&self, ids: &[RowId]) -> Result<bool, Error> {
        if !self.tracked {
            return Ok(false);
        }

        *self.inner.write().await = ids.to_vec();
        *self.writes.write().await += 1;
        Ok(true)
    }
}
