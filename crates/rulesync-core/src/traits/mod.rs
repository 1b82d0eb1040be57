//! Core traits for rulesync
//!
//! - [`RuleApi`]: Router management API (login, add, delete)
//! - [`DomainSource`]: Where the domain list comes from
//! - [`RowIdStore`]: Persistence of created rule ids between runs

pub mod domain_source;
pub mod row_id_store;
pub mod rule_api;

pub use domain_source::DomainSource;
pub use row_id_store::RowIdStore;
pub use rule_api::{AddOutcome, DeleteOutcome, LoginOutcome, RuleApi, SessionToken};
