// # rulesync-core
//
// Core library for keeping a router's domain routing rules in step with a
// remote domain list.
//
// ## Architecture Overview
//
// - **RuleApi**: Trait for the router management API (login, add, delete)
// - **DomainSource**: Trait for fetching the domain list
// - **RowIdStore**: Trait for persisting the ids of rules created by the last run
// - **SyncEngine**: Orchestrates login → fetch → delete → add → persist
// - **ConfigDocument**: The YAML config file, rewritten in place
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from the HTTP clients
// 2. **Library-First**: The binary is a thin layer over this crate
// 3. **Outcomes, not errors**: A refused call is a value; only I/O and
//    transport failures are `Err`

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod rule;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{EngineSettings, SyncConfig};
pub use document::ConfigDocument;
pub use engine::{SyncEngine, SyncEvent, SyncOutcome, SyncReport};
pub use error::{Error, Result};
pub use rule::{DomainRule, RowId};
pub use state::{FileRowIdStore, MemoryRowIdStore};
pub use traits::{DomainSource, RowIdStore, RuleApi};
