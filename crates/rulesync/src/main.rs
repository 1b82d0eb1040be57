// # rulesync - iKuai domain rule synchronizer
//
// This binary is a THIN integration layer: all sync logic lives in
// rulesync-core, all wire details in rulesync-ikuai and rulesync-source-http.
//
// One invocation performs one sync and exits:
// 1. Read settings from environment variables
// 2. Load and validate the YAML config file
// 3. Wire the router client, list source and row id store into the engine
// 4. Run once
//
// ## Configuration
//
// Router credentials, list URL and rule fields live in the YAML file.
// The process itself is configured via environment variables:
//
// - `RULESYNC_CONFIG`: Config file path (default: `config.yml`)
// - `RULESYNC_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - `RULESYNC_MODE`: `dry-run` to log the delete/add calls without sending them
//
// ## Example
//
// ```bash
// export RULESYNC_CONFIG=/etc/rulesync/config.yml
// rulesync
// ```

use anyhow::{Context, Result};
use rulesync_core::{
    ConfigDocument, EngineSettings, FileRowIdStore, SyncEngine, SyncOutcome,
    config::DEFAULT_CONFIG_PATH,
};
use rulesync_ikuai::IkuaiClient;
use rulesync_source_http::HttpDomainSource;
use std::env;
use std::process::ExitCode;
use tracing::{Level, debug, error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// - 0: The run reached an outcome (a refused login or delete included)
/// - 1: Configuration error
/// - 2: Runtime error (transport or file failure)
#[derive(Debug, Clone, Copy)]
enum RulesyncExitCode {
    /// Run finished
    CleanExit = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<RulesyncExitCode> for ExitCode {
    fn from(code: RulesyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Process settings
struct Settings {
    config_path: String,
    log_level: String,
    dry_run: bool,
}

impl Settings {
    /// Load settings from environment variables
    fn from_env() -> Self {
        Self {
            config_path: env::var("RULESYNC_CONFIG")
                .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string()),
            log_level: env::var("RULESYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            dry_run: env::var("RULESYNC_MODE")
                .map(|m| m.eq_ignore_ascii_case("dry-run"))
                .unwrap_or(false),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.config_path.trim().is_empty() {
            anyhow::bail!("RULESYNC_CONFIG cannot be empty");
        }

        self.level()?;
        Ok(())
    }

    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "RULESYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

fn main() -> ExitCode {
    let settings = Settings::from_env();

    if let Err(e) = settings.validate() {
        eprintln!("Configuration validation error: {}", e);
        return RulesyncExitCode::ConfigError.into();
    }

    let log_level = settings.level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return RulesyncExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return RulesyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let document = match ConfigDocument::load(&settings.config_path).await {
            Ok(document) => document,
            Err(e) => {
                error!("Failed to load {}: {}", settings.config_path, e);
                return RulesyncExitCode::ConfigError;
            }
        };

        if let Err(e) = document.config().validate() {
            error!("Invalid config {}: {}", settings.config_path, e);
            return RulesyncExitCode::ConfigError;
        }

        match run_sync(document, settings.dry_run).await {
            Ok(outcome) => {
                debug!("Outcome: {:?}", outcome);
                RulesyncExitCode::CleanExit
            }
            Err(e) => {
                error!("Sync failed: {:#}", e);
                RulesyncExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Run one sync against the router described by `document`
async fn run_sync(document: ConfigDocument, dry_run: bool) -> Result<SyncOutcome> {
    let store = FileRowIdStore::new(document.path());
    let config = document.into_config();

    info!(
        "Syncing {} into {} (interface {})",
        config.domain_list_url, config.server_address, config.domain_interface
    );
    if dry_run {
        info!("Dry-run mode: no rules will be deleted or added");
    }

    let api = IkuaiClient::new(config.server_address.clone())
        .context("Failed to create router client")?;
    let source = HttpDomainSource::new(config.domain_list_url.clone())
        .context("Failed to create domain source")?;

    let settings = EngineSettings::default().with_dry_run(dry_run);
    let (engine, events) = SyncEngine::new(
        Box::new(api),
        Box::new(source),
        Box::new(store),
        config,
        settings,
    )?;

    let outcome = engine
        .run_with_events(events, |event| debug!("Event: {:?}", event))
        .await?;

    Ok(outcome)
}
