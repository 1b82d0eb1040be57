// # Rule API Trait
//
// Defines the interface to the router's management API.
//
// ## Implementations
//
// - iKuai: `rulesync-ikuai` crate
//
// ## Usage
//
// ```rust,ignore
// use rulesync_core::traits::{LoginOutcome, RuleApi};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let api = /* RuleApi implementation */;
//
//     if let LoginOutcome::Authenticated(session) = api.login("admin", "secret").await? {
//         api.delete_rules(&session, &[RowId::Number(7), RowId::Number(8)]).await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

use crate::rule::{DomainRule, RowId};

/// Session credential returned by a successful login
///
/// The Debug implementation does NOT expose the token.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a raw token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token value, for building request headers only
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionToken(<REDACTED>)")
    }
}

/// Result of a login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Credentials accepted and a session cookie was issued
    Authenticated(SessionToken),
    /// Non-200 response
    Rejected {
        /// HTTP status code
        status: u16,
    },
    /// 200 response without the session cookie
    MissingSessionKey,
}

/// Result of a delete call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Router accepted the delete
    Deleted,
    /// Non-200 response
    Rejected {
        /// HTTP status code
        status: u16,
    },
}

/// Result of an add call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// Router accepted the rule
    Added {
        /// Identifier of the new rule
        ///
        /// [`RowId::blank()`] when the response carried none; it is still
        /// tracked so every accepted batch keeps its slot.
        row_id: RowId,
    },
    /// Non-200 response
    Rejected {
        /// HTTP status code
        status: u16,
    },
}

/// Trait for router management API implementations
///
/// Every method issues exactly one request. A response the router answered
/// with a non-200 status is an outcome value, not an error; `Err` is reserved
/// for transport failures and malformed responses.
///
/// Implementations must not retry and must not keep state between calls
/// other than the reused HTTP connection.
#[async_trait]
pub trait RuleApi: Send + Sync {
    /// Log in and obtain a session token
    ///
    /// # Parameters
    ///
    /// - `username`: Management user
    /// - `password`: Plaintext password; hashing is the implementation's job
    async fn login(&self, username: &str, password: &str)
    -> Result<LoginOutcome, crate::Error>;

    /// Delete rules by id, all in one call
    ///
    /// Callers must not pass an empty slice.
    async fn delete_rules(
        &self,
        session: &SessionToken,
        ids: &[RowId],
    ) -> Result<DeleteOutcome, crate::Error>;

    /// Add one rule
    async fn add_rule(
        &self,
        session: &SessionToken,
        rule: &DomainRule,
    ) -> Result<AddOutcome, crate::Error>;

    /// Get the API name (for logging/debugging)
    fn api_name(&self) -> &'static str;
}
