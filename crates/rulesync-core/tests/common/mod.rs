//! Test doubles and common utilities for sync contract tests
//!
//! The doubles record every call so tests can assert exactly which requests
//! a run would have sent to the router.

#![allow(dead_code)]

use rulesync_core::config::{EngineSettings, SyncConfig};
use rulesync_core::error::Result;
use rulesync_core::rule::{DomainRule, RowId, join_row_ids};
use rulesync_core::traits::{
    AddOutcome, DeleteOutcome, DomainSource, LoginOutcome, RuleApi, SessionToken,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A call the engine made against the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Login { username: String },
    Delete { ids: String },
    Add { comment: String, domains: usize },
}

/// A scripted RuleApi that records calls
///
/// Clones share the script and the call log.
#[derive(Clone)]
pub struct MockRuleApi {
    login: Arc<Mutex<LoginOutcome>>,
    delete: Arc<Mutex<DeleteOutcome>>,
    /// Outcomes for successive add calls; once drained, adds succeed with
    /// ids counting up from `next_row_id`
    adds: Arc<Mutex<VecDeque<AddOutcome>>>,
    next_row_id: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<ApiCall>>>,
}

impl MockRuleApi {
    /// Accept everything; added rules get ids 100, 101, ...
    pub fn new() -> Self {
        Self {
            login: Arc::new(Mutex::new(LoginOutcome::Authenticated(SessionToken::new(
                "sess-test",
            )))),
            delete: Arc::new(Mutex::new(DeleteOutcome::Deleted)),
            adds: Arc::new(Mutex::new(VecDeque::new())),
            next_row_id: Arc::new(AtomicUsize::new(100)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_login(self, outcome: LoginOutcome) -> Self {
        *self.login.lock().unwrap() = outcome;
        self
    }

    pub fn with_delete(self, outcome: DeleteOutcome) -> Self {
        *self.delete.lock().unwrap() = outcome;
        self
    }

    pub fn with_adds(self, outcomes: Vec<AddOutcome>) -> Self {
        *self.adds.lock().unwrap() = outcomes.into();
        self
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::Delete { ids } => Some(ids),
                _ => None,
            })
            .collect()
    }

    /// Domain counts of the add calls, in order
    pub fn add_sizes(&self) -> Vec<usize> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ApiCall::Add { domains, .. } => Some(domains),
                _ => None,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl RuleApi for MockRuleApi {
    async fn login(&self, username: &str, _password: &str) -> Result<LoginOutcome> {
        self.calls.lock().unwrap().push(ApiCall::Login {
            username: username.to_string(),
        });
        Ok(self.login.lock().unwrap().clone())
    }

    async fn delete_rules(&self, _session: &SessionToken, ids: &[RowId]) -> Result<DeleteOutcome> {
        assert!(!ids.is_empty(), "delete_rules called with no ids");
        self.calls.lock().unwrap().push(ApiCall::Delete {
            ids: join_row_ids(ids),
        });
        Ok(*self.delete.lock().unwrap())
    }

    async fn add_rule(&self, _session: &SessionToken, rule: &DomainRule) -> Result<AddOutcome> {
        self.calls.lock().unwrap().push(ApiCall::Add {
            comment: rule.comment.clone(),
            domains: rule.domains.len(),
        });

        let scripted = self.adds.lock().unwrap().pop_front();
        Ok(scripted.unwrap_or_else(|| {
            let id = self.next_row_id.fetch_add(1, Ordering::SeqCst);
            AddOutcome::Added {
                row_id: RowId::Number(id as i64),
            }
        }))
    }

    fn api_name(&self) -> &'static str {
        "mock"
    }
}

/// A DomainSource that returns a fixed list
#[derive(Clone)]
pub struct StaticDomainSource {
    domains: Vec<String>,
    fetch_count: Arc<AtomicUsize>,
}

impl StaticDomainSource {
    pub fn new(domains: Vec<String>) -> Self {
        Self {
            domains,
            fetch_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// `count` distinct domains
    pub fn generated(count: usize) -> Self {
        Self::new(domain_list(count))
    }

    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DomainSource for StaticDomainSource {
    async fn fetch(&self) -> Result<Vec<String>> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.domains.clone())
    }

    fn source_name(&self) -> &'static str {
        "static"
    }
}

pub fn domain_list(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("site{}.example.org", i)).collect()
}

/// Helper to create a valid SyncConfig for testing
pub fn test_config() -> SyncConfig {
    SyncConfig {
        server_address: "http://192.168.9.1".to_string(),
        username: "admin".to_string(),
        password: "admin".to_string(),
        domain_list_url: "https://lists.example.org/domains.txt".to_string(),
        domain_interface: "wan2".to_string(),
        domain_src_addr: String::new(),
        domain_comment: "gfw".to_string(),
        domain_row_ids: None,
    }
}

/// Engine settings without the cooldown
pub fn fast_settings() -> EngineSettings {
    EngineSettings::default().with_cooldown(Duration::ZERO)
}

pub fn row_ids(values: &[i64]) -> Vec<RowId> {
    values.iter().copied().map(RowId::Number).collect()
}
