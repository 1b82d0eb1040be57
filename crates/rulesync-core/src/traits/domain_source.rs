// # Domain Source Trait
//
// Defines the interface for fetching the domain list the router rules are
// built from.
//
// ## Implementations
//
// - HTTP GET of a newline-delimited list: `rulesync-source-http` crate

use async_trait::async_trait;

/// Trait for domain list sources
///
/// A source that reached its origin but got nothing usable (for example a
/// non-200 status) returns an empty list. `Err` means the origin could not
/// be reached at all.
///
/// Entries are returned as-is, in order, without validation or
/// de-duplication.
#[async_trait]
pub trait DomainSource: Send + Sync {
    /// Fetch the current list
    async fn fetch(&self) -> Result<Vec<String>, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
