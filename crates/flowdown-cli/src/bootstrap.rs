//! CLI bootstrap - the composition root.
//!
//! This module is the ONLY place where infrastructure is wired together
//! for the CLI adapter:
//! - Database pool and repositories (via flowdown-db)
//! - Settings service (via flowdown-core)
//! - MCP client factory and connection service (via flowdown-mcp)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use flowdown_core::{Settings, SettingsService, database_path};
use flowdown_db::{CoreFactory, setup_database};
use flowdown_mcp::{DefaultClientFactory, McpService, McpServiceOptions};

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
}

impl CliConfig {
    /// Create config with the default database location.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self {
            database_path: database_path()?,
        })
    }

    /// Use `path` when given, the default location otherwise.
    pub fn with_database(path: Option<PathBuf>) -> Result<Self> {
        match path {
            Some(database_path) => Ok(Self { database_path }),
            None => Self::with_defaults(),
        }
    }
}

/// Fully composed application context for CLI commands.
pub struct CliContext {
    mcp: McpService,
    settings: Arc<SettingsService>,
    snapshot: Settings,
}

impl CliContext {
    /// Access the MCP connection service.
    pub const fn mcp(&self) -> &McpService {
        &self.mcp
    }

    /// Access the settings service.
    pub fn settings(&self) -> &SettingsService {
        &self.settings
    }

    /// Settings as they were when the context was built.
    pub const fn settings_snapshot(&self) -> &Settings {
        &self.snapshot
    }

    /// Start reconciliation, connecting every enabled server up front when
    /// `prepare_on_launch` is set.
    pub async fn start_mcp(&self) -> Result<()> {
        self.mcp.start().await?;
        if self.snapshot.prepare_on_launch() {
            for err in self.mcp.prepare_for_conversation().await {
                tracing::warn!(error = %err, "MCP server failed to prepare on launch");
            }
        }
        Ok(())
    }
}

/// Bootstrap the CLI application.
///
/// Opens (and migrates) the database, loads settings, and builds the MCP
/// service with timeouts taken from those settings. The service is not
/// started; handlers that need live connections call
/// [`CliContext::start_mcp`].
pub async fn bootstrap(config: CliConfig) -> Result<CliContext> {
    // 1. Database pool with full schema setup
    let pool = setup_database(&config.database_path).await?;
    let repos = CoreFactory::build_repos(pool);

    // 2. Settings
    let settings = Arc::new(SettingsService::new(repos.settings.clone()));
    let snapshot = settings.get().await?;

    // 3. MCP service with injected repository and client factory
    let factory = Arc::new(DefaultClientFactory::from_settings(&snapshot));
    let mcp = McpService::new(
        repos.mcp_servers.clone(),
        factory,
        McpServiceOptions::from_settings(&snapshot),
    );

    tracing::debug!(database = %config.database_path.display(), "CLI context ready");

    Ok(CliContext {
        mcp,
        settings,
        snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdown_core::NewMcpServer;
    use std::time::Duration;

    #[tokio::test]
    async fn test_bootstrap_uses_stored_timeouts() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::with_database(Some(dir.path().join("flowdown.db"))).unwrap();

        let ctx = bootstrap(config.clone()).await.unwrap();
        assert_eq!(
            ctx.mcp().options().connect_timeout,
            Duration::from_secs(flowdown_core::DEFAULT_CONNECT_TIMEOUT_SECS)
        );
        ctx.settings()
            .set("mcp_connect_timeout_secs", "5")
            .await
            .unwrap();
        drop(ctx);

        let ctx = bootstrap(config).await.unwrap();
        assert_eq!(ctx.mcp().options().connect_timeout, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_servers_persist_across_contexts() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig::with_database(Some(dir.path().join("flowdown.db"))).unwrap();

        let ctx = bootstrap(config.clone()).await.unwrap();
        ctx.mcp()
            .insert(NewMcpServer::new_http("remote", "https://example.com/mcp").with_enabled(false))
            .await
            .unwrap();
        drop(ctx);

        let ctx = bootstrap(config).await.unwrap();
        ctx.mcp().refresh().await.unwrap();
        let names: Vec<_> = ctx.mcp().servers().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["remote"]);
    }
}
