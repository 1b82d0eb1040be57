//! Core sync engine
//!
//! The SyncEngine is responsible for:
//! - Logging into the router via RuleApi
//! - Fetching the domain list via DomainSource
//! - Deleting the rules recorded by the previous run
//! - Adding the fetched domains back in batches
//! - Persisting the new rule ids via RowIdStore
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────┐
//!                 │  SyncEngine  │
//!                 └──────────────┘
//!                         │
//!     ┌───────────────┬───┴───────────┬───────────────┐
//!     ▼               ▼               ▼               ▼
//! ┌─────────┐   ┌─────────────┐  ┌───────────┐  ┌──────────┐
//! │ RuleApi │   │DomainSource │  │RowIdStore │  │  Events  │
//! │ (login, │   │  (fetch)    │  │(load/save)│  │ (notify) │
//! │ del/add)│   └─────────────┘  └───────────┘  └──────────┘
//! └─────────┘
//! ```
//!
//! ## Run Flow
//!
//! `Authenticating → Fetching → Deleting (skipped with no tracked ids) →
//! Adding (one call per batch) → Persisting → Cooldown`
//!
//! A run stops early, without touching the store, when the login is refused,
//! the list is empty, or the delete is refused. Rejected add calls are
//! skipped: their batch gets no id and is never retried.

use std::time::Duration;

use crate::config::{EngineSettings, SyncConfig};
use crate::error::Result;
use crate::rule::{DomainRule, RowId, join_row_ids, plan_batches};
use crate::traits::{
    AddOutcome, DeleteOutcome, DomainSource, LoginOutcome, RowIdStore, RuleApi, SessionToken,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events emitted by the SyncEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Login succeeded
    LoggedIn,

    /// Domain list fetched
    DomainsFetched { count: usize },

    /// Previously tracked rules deleted
    RulesDeleted { ids: Vec<RowId> },

    /// A batch was added
    BatchAdded {
        index: usize,
        comment: String,
        domains: usize,
        row_id: RowId,
    },

    /// A batch was refused by the router
    BatchRejected { index: usize, status: u16 },

    /// New ids written to the store
    RowIdsPersisted { count: usize },

    /// Run ended
    Finished { outcome: String },
}

/// Summary of a run that reached the end of the add phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    /// Number of planned batches (add calls issued)
    pub batches: usize,
    /// Batches the router accepted
    pub added: usize,
    /// Batches the router refused
    pub rejected: usize,
    /// One id per accepted batch, in batch order
    pub row_ids: Vec<RowId>,
    /// Whether the ids were written to the store
    pub persisted: bool,
    /// Whether the previously tracked rules were deleted first
    pub deleted_previous: bool,
}

/// Where a run stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Login answered with a non-200 status
    LoginRejected { status: u16 },
    /// Login succeeded without a session cookie
    SessionKeyMissing,
    /// Domain list came back empty
    NoDomains,
    /// Delete of the previous rules was refused; nothing was added
    DeleteRejected { status: u16 },
    /// Dry run: the calls below would have been made
    DryRun {
        /// Ids that would be deleted
        delete: Vec<RowId>,
        /// Rules that would be added
        batches: usize,
    },
    /// Add phase completed
    Completed(SyncReport),
}

impl SyncOutcome {
    /// Whether the run went all the way through the add phase
    pub fn is_completed(&self) -> bool {
        matches!(self, SyncOutcome::Completed(_))
    }

    fn label(&self) -> String {
        match self {
            SyncOutcome::LoginRejected { status } => format!("login rejected ({})", status),
            SyncOutcome::SessionKeyMissing => "session key missing".to_string(),
            SyncOutcome::NoDomains => "no domains".to_string(),
            SyncOutcome::DeleteRejected { status } => format!("delete rejected ({})", status),
            SyncOutcome::DryRun { .. } => "dry run".to_string(),
            SyncOutcome::Completed(report) => format!(
                "completed ({}/{} batches added)",
                report.added, report.batches
            ),
        }
    }
}

/// Core sync engine
///
/// One [`SyncEngine::run()`] call performs one full sync. Calls are strictly
/// sequential; the engine spawns no tasks.
pub struct SyncEngine {
    /// Router API
    api: Box<dyn RuleApi>,

    /// Domain list source
    source: Box<dyn DomainSource>,

    /// Persistence for created rule ids
    store: Box<dyn RowIdStore>,

    /// Credentials and rule template
    config: SyncConfig,

    /// Batching, cooldown and dry-run knobs
    settings: EngineSettings,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<SyncEvent>,
}

impl SyncEngine {
    /// Create a new sync engine
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        api: Box<dyn RuleApi>,
        source: Box<dyn DomainSource>,
        store: Box<dyn RowIdStore>,
        config: SyncConfig,
        settings: EngineSettings,
    ) -> Result<(Self, mpsc::Receiver<SyncEvent>)> {
        config.validate()?;
        settings.validate()?;

        let (tx, rx) = mpsc::channel(settings.event_channel_capacity);

        let engine = Self {
            api,
            source,
            store,
            config,
            settings,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run one sync
    ///
    /// # Returns
    ///
    /// - `Ok(SyncOutcome)`: Where the run stopped (handled failures included)
    /// - `Err(Error)`: Transport, parse or storage failure
    pub async fn run(&self) -> Result<SyncOutcome> {
        let outcome = self.run_internal().await?;
        info!("Sync finished: {}", outcome.label());
        self.emit_event(SyncEvent::Finished {
            outcome: outcome.label(),
        }).await;
        Ok(outcome)
    }

    /// Run one sync while handing every event to `on_event`
    ///
    /// Consumes the engine so the event stream ends with the run. Use this
    /// instead of [`SyncEngine::run()`] when the receiver is read in the same
    /// task: the channel is bounded and would otherwise stall a long run.
    pub async fn run_with_events<F>(
        self,
        mut events: mpsc::Receiver<SyncEvent>,
        mut on_event: F,
    ) -> Result<SyncOutcome>
    where
        F: FnMut(SyncEvent),
    {
        let run = async move {
            let outcome = self.run().await;
            drop(self);
            outcome
        };
        let drain = async {
            while let Some(event) = events.recv().await {
                on_event(event);
            }
        };

        let (outcome, ()) = tokio::join!(run, drain);
        outcome
    }

    async fn run_internal(&self) -> Result<SyncOutcome> {
        // Authenticating
        let session = match self
            .api
            .login(&self.config.username, &self.config.password)
            .await?
        {
            LoginOutcome::Authenticated(session) => session,
            LoginOutcome::Rejected { status } => {
                warn!("Login failed: HTTP {}", status);
                return Ok(SyncOutcome::LoginRejected { status });
            }
            LoginOutcome::MissingSessionKey => {
                warn!("Login response did not set sess_key; stopping");
                return Ok(SyncOutcome::SessionKeyMissing);
            }
        };
        info!("Logged in to {} as {}", self.api.api_name(), self.config.username);
        self.emit_event(SyncEvent::LoggedIn).await;

        // Fetching
        let domains = self.source.fetch().await?;
        if domains.is_empty() {
            warn!("No domains fetched from {}", self.source.source_name());
            return Ok(SyncOutcome::NoDomains);
        }
        info!("Fetched {} domain(s)", domains.len());
        self.emit_event(SyncEvent::DomainsFetched {
            count: domains.len(),
        }).await;

        let previous = self.store.load_row_ids().await?;
        let batches = plan_batches(
            &domains,
            self.settings.batch_size,
            &self.config.rule_template(),
        );

        if self.settings.dry_run {
            return Ok(self.describe_dry_run(previous, &batches));
        }

        // Deleting
        let deleted_previous = !previous.is_empty();
        if deleted_previous {
            match self.api.delete_rules(&session, &previous).await? {
                DeleteOutcome::Deleted => {
                    info!(
                        "Deleted {} previously added rule(s): {}",
                        previous.len(),
                        join_row_ids(&previous)
                    );
                    self.emit_event(SyncEvent::RulesDeleted { ids: previous }).await;
                }
                DeleteOutcome::Rejected { status } => {
                    warn!("Failed to delete previous rules: HTTP {}; stopping", status);
                    return Ok(SyncOutcome::DeleteRejected { status });
                }
            }
        } else {
            debug!("No tracked rules, skipping delete");
        }

        // Adding
        let mut report = self.add_batches(&session, &batches).await?;
        report.deleted_previous = deleted_previous;

        // Persisting
        report.persisted = self.store.store_row_ids(&report.row_ids).await?;
        if report.persisted {
            info!("Persisted {} row id(s)", report.row_ids.len());
            self.emit_event(SyncEvent::RowIdsPersisted {
                count: report.row_ids.len(),
            }).await;
        } else {
            debug!("Row id store is not tracking ids");
        }

        // Cooldown
        self.cooldown().await;

        Ok(SyncOutcome::Completed(report))
    }

    /// Add every batch, one call each, collecting the returned ids
    async fn add_batches(
        &self,
        session: &SessionToken,
        batches: &[DomainRule],
    ) -> Result<SyncReport> {
        let mut report = SyncReport {
            batches: batches.len(),
            added: 0,
            rejected: 0,
            row_ids: Vec::with_capacity(batches.len()),
            persisted: false,
            deleted_previous: false,
        };

        for (i, rule) in batches.iter().enumerate() {
            let index = i + 1;
            match self.api.add_rule(session, rule).await? {
                AddOutcome::Added { row_id } => {
                    report.added += 1;
                    if row_id.is_blank() {
                        warn!(
                            "Added rule {} but the response carried no RowId; tracking a blank id",
                            rule.comment
                        );
                    } else {
                        info!(
                            "Added rule {} ({} domains), RowId: {}",
                            rule.comment,
                            rule.domains.len(),
                            row_id
                        );
                    }
                    report.row_ids.push(row_id.clone());
                    self.emit_event(SyncEvent::BatchAdded {
                        index,
                        comment: rule.comment.clone(),
                        domains: rule.domains.len(),
                        row_id,
                    }).await;
                }
                AddOutcome::Rejected { status } => {
                    report.rejected += 1;
                    warn!("Failed to add rule {}: HTTP {}", rule.comment, status);
                    self.emit_event(SyncEvent::BatchRejected { index, status }).await;
                }
            }
        }

        Ok(report)
    }

    fn describe_dry_run(&self, previous: Vec<RowId>, batches: &[DomainRule]) -> SyncOutcome {
        if previous.is_empty() {
            info!("[DRY-RUN] No tracked rules, would skip delete");
        } else {
            info!("[DRY-RUN] Would delete rules: {}", join_row_ids(&previous));
        }
        for rule in batches {
            info!(
                "[DRY-RUN] Would add rule {} with {} domain(s) on {}",
                rule.comment,
                rule.domains.len(),
                rule.interface
            );
        }

        SyncOutcome::DryRun {
            delete: previous,
            batches: batches.len(),
        }
    }

    async fn cooldown(&self) {
        if self.settings.cooldown > Duration::ZERO {
            debug!("Cooling down for {:?}", self.settings.cooldown);
            tokio::time::sleep(self.settings.cooldown).await;
        }
    }

    /// Emit an engine event
    ///
    /// A full channel pauses the run until the receiver catches up. A dropped
    /// receiver turns events off.
    async fn emit_event(&self, event: SyncEvent) {
        // Err only when the receiver is gone
        let _ = self.event_tx.send(event).await;
    }
}
