// # File Row Id Store
//
// RowIdStore backed by the `domain_row_ids` key of the config file.
//
// ## Behavior
//
// - Every call re-reads the file, so edits made while a run is in progress
//   are picked up by the write
// - The key is only rewritten if it already exists; a file without it opts
//   out of tracking
// - Writes overwrite the file in place (see `ConfigDocument`)
//
// ## File Format
//
// ```yaml
// server_address: "http://192.168.1.1"
// # ...
// domain_row_ids: [12, 13]
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::Error;
use crate::document::ConfigDocument;
use crate::rule::RowId;
use crate::traits::RowIdStore;

/// File-backed row id store
///
/// # Example
///
/// ```rust,no_run
/// use rulesync_core::state::FileRowIdStore;
/// use rulesync_core::rule::RowId;
/// use rulesync_core::traits::RowIdStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileRowIdStore::new("config.yml");
///
///     let previous = store.load_row_ids().await?;
///     println!("tracked: {:?}", previous);
///
///     store.store_row_ids(&[RowId::Number(41), RowId::Number(42)]).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileRowIdStore {
    path: PathBuf,
}

impl FileRowIdStore {
    /// Create a store for the config file at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Config file path
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RowIdStore for FileRowIdStore {
    async fn load_row_ids(&self) -> Result<Vec<RowId>, Error> {
        let doc = ConfigDocument::load(&self.path).await?;
        let ids = doc.row_ids();
        tracing::debug!(
            "Loaded {} tracked row id(s) from {}",
            ids.len(),
            self.path.display()
        );
        Ok(ids)
    }

    async fn store_row_ids(&self, ids: &[RowId]) -> Result<bool, Error> {
        let written = ConfigDocument::set_row_ids(&self.path, ids).await?;
        if written {
            tracing::debug!(
                "Stored {} row id(s) in {}",
                ids.len(),
                self.path.display()
            );
        } else {
            tracing::debug!(
                "{} has no domain_row_ids key; row ids not tracked",
                self.path.display()
            );
        }
        Ok(written)
    }
}
