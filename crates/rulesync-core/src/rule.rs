//! Domain rule types and batching
//!
//! A fetched domain list is split into consecutive batches. Each batch becomes
//! exactly one remote rule, and each remote rule is identified by one [`RowId`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of domains submitted in a single rule
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Day mask covering the whole week
pub const WEEK_ALL_DAYS: &str = "1234567";

/// Time window covering the whole day
pub const TIME_ALL_DAY: &str = "00:00-23:59";

/// Identifier the router assigns to a rule
///
/// The router hands these out as JSON numbers, but the value is opaque: a
/// hand-edited config may hold strings. Both shapes round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    /// Numeric identifier
    Number(i64),
    /// Any other identifier
    Text(String),
}

impl RowId {
    /// Placeholder for an accepted rule whose id the router did not report
    pub fn blank() -> Self {
        RowId::Text(String::new())
    }

    /// Whether this is the [`RowId::blank()`] placeholder
    pub fn is_blank(&self) -> bool {
        matches!(self, RowId::Text(s) if s.is_empty())
    }

    /// Parse a row id out of a JSON value
    ///
    /// Returns `None` for null, booleans, floats, arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().map(RowId::Number),
            serde_json::Value::String(s) => Some(RowId::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Number(n) => write!(f, "{}", n),
            RowId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RowId {
    fn from(n: i64) -> Self {
        RowId::Number(n)
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        RowId::Text(s.to_string())
    }
}

/// Join row ids into the comma-separated form the delete call expects
pub fn join_row_ids(ids: &[RowId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// One rule to be added on the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRule {
    /// Outbound interface the matched traffic is routed to
    pub interface: String,
    /// Source address filter (may be empty)
    pub src_addr: String,
    /// Domains carried by this rule
    pub domains: Vec<String>,
    /// Comment, `<prefix>-<1-based batch index>`
    pub comment: String,
    /// Day mask
    pub week: String,
    /// Time window
    pub time: String,
    /// Whether the rule is active
    pub enabled: bool,
}

impl DomainRule {
    /// Domains joined with commas
    pub fn joined_domains(&self) -> String {
        self.domains.join(",")
    }
}

/// Per-batch fields copied into every rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTemplate {
    /// Outbound interface
    pub interface: String,
    /// Source address filter
    pub src_addr: String,
    /// Comment prefix
    pub comment_prefix: String,
}

/// Split `domains` into consecutive rules of at most `batch_size` entries
///
/// Batch `i` (0-based) gets the comment `<prefix>-<i + 1>`, a whole-week
/// schedule and is enabled. `batch_size` must be non-zero.
pub fn plan_batches(
    domains: &[String],
    batch_size: usize,
    template: &RuleTemplate,
) -> Vec<DomainRule> {
    assert!(batch_size > 0, "batch size must be > 0");

    domains
        .chunks(batch_size)
        .enumerate()
        .map(|(i, chunk)| DomainRule {
            interface: template.interface.clone(),
            src_addr: template.src_addr.clone(),
            domains: chunk.to_vec(),
            comment: format!("{}-{}", template.comment_prefix, i + 1),
            week: WEEK_ALL_DAYS.to_string(),
            time: TIME_ALL_DAY.to_string(),
            enabled: true,
        })
        .collect()
}
