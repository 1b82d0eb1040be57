// # iKuai Router API
//
// This crate provides the iKuai management API implementation of `RuleApi`.
//
// ## Behavior
//
// - One HTTP request per trait call, no retry
// - Non-200 responses are returned as outcome values; transport failures are errors
// - HTTP timeout configured (30 seconds)
// - One `reqwest::Client` shared by login and rule calls
//
// ## Security Requirements
//
// - Password and session key NEVER appear in logs
// - The password leaves the process only as the MD5 hex digest the login
//   endpoint expects. That digest is the router's wire format, not a
//   protection; it must not be changed.
//
// ## API Reference
//
// - Login: POST `/Action/login` `{"username": ..., "passwd": <md5 hex>}`,
//   answers with a `sess_key` cookie
// - Call: POST `/Action/call` with `Cookie: sess_key=...`,
//   `{"func_name": "stream_domain", "action": "add"|"del", "param": {...}}`

use async_trait::async_trait;
use md5::{Digest, Md5};
use reqwest::header::{CONTENT_TYPE, COOKIE};
use rulesync_core::rule::{DomainRule, RowId, join_row_ids};
use rulesync_core::traits::{
    AddOutcome, DeleteOutcome, LoginOutcome, RuleApi, SessionToken,
};
use rulesync_core::{Error, Result};
use serde_json::{Value, json};
use std::time::Duration;

/// Login endpoint path
pub const LOGIN_PATH: &str = "/Action/login";

/// Generic call endpoint path
pub const CALL_PATH: &str = "/Action/call";

/// Cookie carrying the session key
pub const SESSION_COOKIE: &str = "sess_key";

/// `func_name` of the domain routing rules
pub const STREAM_DOMAIN_FUNC: &str = "stream_domain";

/// Content type the router expects on every JSON request
const JSON_CONTENT_TYPE: &str = "application/json;charset=UTF-8";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// iKuai management API client
#[derive(Debug, Clone)]
pub struct IkuaiClient {
    /// Base URL without trailing slash
    base_url: String,

    /// HTTP client, reused across calls
    client: reqwest::Client,
}

impl IkuaiClient {
    /// Create a client for the router at `server_address`
    ///
    /// # Parameters
    ///
    /// - `server_address`: Base URL of the management UI (e.g., "http://192.168.1.1")
    pub fn new(server_address: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(server_address, client))
    }

    /// Create a client around an existing `reqwest::Client`
    pub fn with_client(server_address: impl Into<String>, client: reqwest::Client) -> Self {
        let base_url = server_address.into().trim_end_matches('/').to_string();
        Self { base_url, client }
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST a call payload with the session cookie
    async fn call(&self, session: &SessionToken, payload: &Value) -> Result<reqwest::Response> {
        self.client
            .post(self.url(CALL_PATH))
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .header(COOKIE, format!("{}={}", SESSION_COOKIE, session.expose()))
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::http(format!("Call request failed: {}", e)))
    }
}

/// Lowercase hex MD5 of the password, as the login endpoint expects
pub fn hash_password(password: &str) -> String {
    hex::encode(Md5::digest(password.as_bytes()))
}

/// Body of the login request
pub fn login_payload(username: &str, password: &str) -> Value {
    json!({
        "username": username,
        "passwd": hash_password(password),
    })
}

/// Body of the call adding one rule
pub fn add_payload(rule: &DomainRule) -> Value {
    json!({
        "func_name": STREAM_DOMAIN_FUNC,
        "action": "add",
        "param": {
            "interface": rule.interface,
            "src_addr": rule.src_addr,
            "domain": rule.joined_domains(),
            "comment": rule.comment,
            "week": rule.week,
            "time": rule.time,
            "enabled": if rule.enabled { "yes" } else { "no" },
        },
    })
}

/// Body of the call deleting rules by id
pub fn delete_payload(ids: &[RowId]) -> Value {
    json!({
        "func_name": STREAM_DOMAIN_FUNC,
        "action": "del",
        "param": {
            "id": join_row_ids(ids),
        },
    })
}

/// Pull the `RowId` out of an add response body
///
/// A JSON body without a usable `RowId` yields [`RowId::blank()`]; a body
/// that is not JSON at all is an error.
fn parse_row_id(body: &str) -> Result<RowId> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| Error::api("ikuai", format!("Add response is not JSON: {}", e)))?;

    Ok(json
        .get("RowId")
        .and_then(RowId::from_json)
        .unwrap_or_else(RowId::blank))
}

#[async_trait]
impl RuleApi for IkuaiClient {
    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome> {
        tracing::debug!("Logging in to {} as {}", self.base_url, username);

        let response = self
            .client
            .post(self.url(LOGIN_PATH))
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .json(&login_payload(username, password))
            .send()
            .await
            .map_err(|e| Error::http(format!("Login request failed: {}", e)))?;

        let status = response.status().as_u16();
        if status != 200 {
            tracing::warn!("Login failed: HTTP {}", status);
            return Ok(LoginOutcome::Rejected { status });
        }

        let session = response
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE && !c.value().is_empty())
            .map(|c| SessionToken::new(c.value()));

        match session {
            Some(session) => Ok(LoginOutcome::Authenticated(session)),
            None => {
                tracing::warn!("{} not found in login response", SESSION_COOKIE);
                Ok(LoginOutcome::MissingSessionKey)
            }
        }
    }

    async fn delete_rules(&self, session: &SessionToken, ids: &[RowId]) -> Result<DeleteOutcome> {
        if ids.is_empty() {
            return Err(Error::invalid_input("delete_rules called with no ids"));
        }

        let payload = delete_payload(ids);
        tracing::debug!("Delete payload: {}", payload);

        let response = self.call(session, &payload).await?;
        let status = response.status().as_u16();
        if status != 200 {
            tracing::warn!("Delete failed: HTTP {}", status);
            return Ok(DeleteOutcome::Rejected { status });
        }

        Ok(DeleteOutcome::Deleted)
    }

    async fn add_rule(&self, session: &SessionToken, rule: &DomainRule) -> Result<AddOutcome> {
        let payload = add_payload(rule);
        tracing::debug!(
            "Adding rule {} ({} domains) on {}",
            rule.comment,
            rule.domains.len(),
            rule.interface
        );

        let response = self.call(session, &payload).await?;
        let status = response.status().as_u16();
        if status != 200 {
            return Ok(AddOutcome::Rejected { status });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::http(format!("Failed to read add response: {}", e)))?;

        let row_id = parse_row_id(&body)?;
        if row_id.is_blank() {
            tracing::debug!("Add response without RowId: {}", body);
        }

        Ok(AddOutcome::Added { row_id })
    }

    fn api_name(&self) -> &'static str {
        "ikuai"
    }
}
