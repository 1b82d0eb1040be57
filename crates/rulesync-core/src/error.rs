//! Error types for rulesync
//!
//! Rejected HTTP calls are not errors: they come back as outcome values
//! (see [`crate::traits`]). Everything here ends the run.

use thiserror::Error;

/// Result type alias for rulesync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for rulesync
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be read, parsed or validated
    #[error("Configuration error: {0}")]
    Config(String),

    /// Tracked row ids could not be loaded or persisted
    #[error("State store error: {0}")]
    StateStore(String),

    /// Domain list could not be fetched
    #[error("Domain source error: {0}")]
    DomainSource(String),

    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Router API returned something we could not interpret
    #[error("API error ({api}): {message}")]
    Api {
        /// API name
        api: String,
        /// Error message
        message: String,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a domain source error
    pub fn domain_source(msg: impl Into<String>) -> Self {
        Self::DomainSource(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an API error
    pub fn api(api: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            api: api.into(),
            message: message.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
