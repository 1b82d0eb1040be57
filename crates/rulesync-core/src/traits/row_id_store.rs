// # Row Id Store Trait
//
// Defines the interface for persisting the ids of rules created by the
// previous run, so that the next run can delete exactly those rules.
//
// ## Implementations
//
// - `FileRowIdStore`: the `domain_row_ids` key of the config file
// - `MemoryRowIdStore`: in-process only (tests, embedding)

use async_trait::async_trait;

use crate::rule::RowId;

/// Trait for row id store implementations
#[async_trait]
pub trait RowIdStore: Send + Sync {
    /// Ids recorded by the previous run
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<RowId>)`: The tracked ids (empty if none or untracked)
    /// - `Err(Error)`: Storage error
    async fn load_row_ids(&self) -> Result<Vec<RowId>, crate::Error>;

    /// Replace the tracked ids
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: Ids persisted
    /// - `Ok(false)`: Store is not tracking ids; nothing written
    /// - `Err(Error)`: Storage error
    async fn store_row_ids(&self, ids: &[RowId]) -> Result<bool, crate::Error>;
}
