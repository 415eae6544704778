//! Sync command - mirror Google Drive to the local download root
//!
//! Provides the `gdmirror sync` CLI command which:
//! 1. Applies command-line overrides to the loaded configuration
//! 2. Loads the service-account credentials and the bearer access token
//! 3. Builds the Drive adapter and the SyncEngine
//! 4. Initializes, runs one pass and prints the report
//!
//! SIGINT and SIGTERM interrupt the pass; the change cache is saved before
//! exiting so verified downloads are not fetched again next time.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use gdmirror_core::config::Config;
use gdmirror_core::domain::ServiceAccountCredentials;
use gdmirror_gdrive::client::DriveClient;
use gdmirror_gdrive::provider::GoogleDriveProvider;
use gdmirror_sync::{SyncEngine, SyncReport};

use crate::output::{get_formatter, plural, OutputFormat, OutputFormatter};
use crate::Session;

#[derive(Debug, Args)]
pub struct SyncCommand {
    /// Local directory receiving one sub-directory per remote root
    #[arg(long)]
    pub download_root: Option<PathBuf>,

    /// Service-account JSON file
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// OAuth bearer token with the drive.readonly scope
    #[arg(long, env = "GDMIRROR_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Files downloaded in parallel per folder
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Ignore the change cache and download every file
    #[arg(long)]
    pub no_cache: bool,
}

impl SyncCommand {
    /// Command-line flags take precedence over the configuration file
    fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(root) = &self.download_root {
            config.sync.download_root = root.clone();
        }
        if let Some(path) = &self.credentials {
            config.credentials.path = Some(path.clone());
        }
        if let Some(n) = self.batch_size {
            config.sync.batch_size = n;
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
        config
    }

    pub async fn execute(&self, session: Session) -> Result<()> {
        let formatter = get_formatter(session.format, session.quiet);
        let config = self.apply_overrides(session.config);

        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(ToString::to_string).collect();
            bail!("Invalid configuration: {}", messages.join("; "));
        }

        let Some(token) = self.access_token.as_deref().filter(|t| !t.is_empty()) else {
            bail!("No access token: pass --access-token or set GDMIRROR_ACCESS_TOKEN");
        };

        let client = DriveClient::new(token);
        let provider = Arc::new(GoogleDriveProvider::new(client).with_page_size(config.sync.page_size));

        let credentials = match &config.credentials.path {
            Some(path) => Some(ServiceAccountCredentials::load(path).with_context(|| {
                format!("Failed to read credentials from {}", path.display())
            })?),
            None => None,
        };

        let mut engine = SyncEngine::new(config, provider);
        if let Some(credentials) = credentials {
            engine = engine.with_credentials(credentials);
        }

        let shutdown = CancellationToken::new();
        tokio::spawn(shutdown_signal(shutdown.clone()));

        formatter.info("Starting synchronization...");

        let outcome = tokio::select! {
            result = run(&engine) => Some(result),
            _ = shutdown.cancelled() => None,
        };

        let Some(result) = outcome else {
            engine.save_cache().await;
            bail!("Sync interrupted; change cache saved");
        };

        let report = result?;
        print_report(&report, session.format, formatter.as_ref())?;
        Ok(())
    }
}

async fn run(engine: &SyncEngine) -> Result<SyncReport> {
    engine.initialize().await?;
    Ok(engine.sync().await?)
}

/// Resolves on the first SIGINT or SIGTERM and cancels `token`
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

fn print_report(report: &SyncReport, format: OutputFormat, formatter: &dyn OutputFormatter) -> Result<()> {
    if format == OutputFormat::Json {
        let json = serde_json::to_value(report).context("Failed to serialize sync report")?;
        formatter.print_json(&json);
        return Ok(());
    }

    let duration = if report.duration_ms >= 1000 {
        format!("{:.1}s", report.duration_ms as f64 / 1000.0)
    } else {
        format!("{}ms", report.duration_ms)
    };

    if report.files_downloaded == 0 && report.errors.is_empty() {
        formatter.success(&format!("Already up to date ({duration})"));
    } else {
        formatter.success(&format!("Sync completed in {duration}"));
    }

    formatter.info(&format!(
        "Roots:       {}",
        plural(report.roots.len() as u64, "folder")
    ));
    formatter.info(&format!("Downloaded:  {}", plural(report.files_downloaded, "file")));
    formatter.info(&format!("Up to date:  {}", plural(report.files_skipped, "file")));
    if report.files_unsupported > 0 {
        formatter.info(&format!(
            "Skipped:     {} (Google Docs formats)",
            plural(report.files_unsupported, "file")
        ));
    }
    formatter.info(&format!("Manifest:    {}", report.manifest_path.display()));

    if !report.errors.is_empty() {
        formatter.warn(&format!(
            "{} failed, {} failed",
            plural(report.files_failed, "file"),
            plural(report.folders_failed, "folder")
        ));
        for err in &report.errors {
            formatter.info(&format!("  - {err}"));
        }
    }

    Ok(())
}
