// # HTTP Domain Source
//
// This crate provides the HTTP implementation of `DomainSource`.
//
// ## Behavior
//
// - One plain GET per fetch, no retry
// - The whole body is buffered and split into lines (`\n`, `\r\n` or `\r`)
// - Entries are returned in order, unvalidated
// - A non-200 status yields an empty list; transport failures are errors

use async_trait::async_trait;
use rulesync_core::traits::DomainSource;
use rulesync_core::{Error, Result};
use std::time::Duration;

/// Default HTTP timeout for list downloads (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Domain list fetched from a URL
#[derive(Debug, Clone)]
pub struct HttpDomainSource {
    /// List URL
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpDomainSource {
    /// Create a source for the newline-delimited list at `url`
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(url, client))
    }

    /// Create a source around an existing `reqwest::Client`
    pub fn with_client(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    /// List URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Split a list body into entries
///
/// `\n`, `\r\n` and a bare `\r` all end a line. A trailing line break does
/// not produce an empty last entry.
pub fn split_domains(body: &str) -> Vec<String> {
    let mut domains = Vec::new();
    let mut rest = body;

    while !rest.is_empty() {
        match rest.find(|c: char| c == '\n' || c == '\r') {
            Some(pos) => {
                domains.push(rest[..pos].to_string());
                let width = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[pos + width..];
            }
            None => {
                domains.push(rest.to_string());
                break;
            }
        }
    }
    domains
}

#[async_trait]
impl DomainSource for HttpDomainSource {
    async fn fetch(&self) -> Result<Vec<String>> {
        tracing::debug!("Fetching domain list from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::domain_source(format!("Request failed: {}", e)))?;

        let status = response.status().as_u16();
        if status != 200 {
            tracing::warn!("Failed to fetch domain list: HTTP {}", status);
            return Ok(Vec::new());
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::domain_source(format!("Failed to read response: {}", e)))?;

        Ok(split_domains(&body))
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}
