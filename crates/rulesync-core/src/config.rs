//! Configuration types for rulesync
//!
//! [`SyncConfig`] mirrors the keys of the YAML config file. [`EngineSettings`]
//! holds knobs that are not part of the file.

use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use crate::rule::{DEFAULT_BATCH_SIZE, RowId, RuleTemplate};

/// Default config file location, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

/// Key holding the tracked rule identifiers
pub const ROW_IDS_KEY: &str = "domain_row_ids";

/// Contents of the config file
#[derive(Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Router management base URL (e.g., "http://192.168.1.1")
    #[serde(deserialize_with = "scalar_string")]
    pub server_address: String,

    /// Management user
    #[serde(deserialize_with = "scalar_string")]
    pub username: String,

    /// Management password (plaintext, hashed before it leaves the process)
    /// ⚠️ NEVER log this value
    #[serde(deserialize_with = "scalar_string")]
    pub password: String,

    /// URL of the newline-delimited domain list
    #[serde(deserialize_with = "scalar_string")]
    pub domain_list_url: String,

    /// Interface the rules route matched traffic to
    #[serde(deserialize_with = "scalar_string")]
    pub domain_interface: String,

    /// Source address filter for the rules
    #[serde(default, deserialize_with = "scalar_string")]
    pub domain_src_addr: String,

    /// Comment prefix; each rule gets `-<batch index>` appended
    #[serde(deserialize_with = "scalar_string")]
    pub domain_comment: String,

    /// Rule ids created by the previous run
    ///
    /// `None` when the key is absent or null.
    #[serde(default)]
    pub domain_row_ids: Option<Vec<RowId>>,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncConfig")
            .field("server_address", &self.server_address)
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("domain_list_url", &self.domain_list_url)
            .field("domain_interface", &self.domain_interface)
            .field("domain_src_addr", &self.domain_src_addr)
            .field("domain_comment", &self.domain_comment)
            .field("domain_row_ids", &self.domain_row_ids)
            .finish()
    }
}

impl SyncConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_url("server_address", &self.server_address)?;
        validate_url("domain_list_url", &self.domain_list_url)?;

        for (name, value) in [
            ("username", &self.username),
            ("password", &self.password),
            ("domain_interface", &self.domain_interface),
            ("domain_comment", &self.domain_comment),
        ] {
            if value.trim().is_empty() {
                return Err(crate::Error::config(format!("{} cannot be empty", name)));
            }
        }

        Ok(())
    }

    /// Tracked ids, empty when the key is absent or null
    pub fn row_ids(&self) -> Vec<RowId> {
        self.domain_row_ids.clone().unwrap_or_default()
    }

    /// Fields copied into every planned rule
    pub fn rule_template(&self) -> RuleTemplate {
        RuleTemplate {
            interface: self.domain_interface.clone(),
            src_addr: self.domain_src_addr.clone(),
            comment_prefix: self.domain_comment.clone(),
        }
    }
}

fn validate_url(name: &str, url: &str) -> Result<(), crate::Error> {
    if url.trim().is_empty() {
        return Err(crate::Error::config(format!("{} cannot be empty", name)));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(crate::Error::config(format!(
            "{} must use HTTP or HTTPS scheme. Got: {}",
            name, url
        )));
    }
    Ok(())
}

/// Accept any YAML scalar where a string is expected
///
/// An unquoted `password: 123456` parses as an integer; it is still a password.
fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Str(String),
        Int(i64),
        Float(f64),
        Bool(bool),
        Null(()),
    }

    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Str(s) => s,
        Scalar::Int(n) => n.to_string(),
        Scalar::Float(n) => n.to_string(),
        Scalar::Bool(b) => b.to_string(),
        Scalar::Null(()) => String::new(),
    })
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Maximum domains per added rule
    pub batch_size: usize,

    /// Pause after the add phase
    ///
    /// The router throttles management calls; the next invocation should not
    /// start right on the heels of this one.
    pub cooldown: Duration,

    /// Log in and fetch, but only log the delete/add calls and skip persisting
    pub dry_run: bool,

    /// Capacity of the event channel
    ///
    /// When full, the run waits for the receiver to catch up.
    pub event_channel_capacity: usize,
}

impl EngineSettings {
    /// Validate the settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.batch_size == 0 {
            return Err(crate::Error::config("batch_size must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event_channel_capacity must be > 0"));
        }
        Ok(())
    }

    /// Set the dry-run flag
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Set the cooldown
    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            cooldown: Duration::from_secs(5),
            dry_run: false,
            event_channel_capacity: 100,
        }
    }
}
