//! Composition utilities for wiring `SQLite` repositories.
//!
//! Construction only; no domain logic lives here.

use sqlx::SqlitePool;
use std::sync::Arc;

use flowdown_core::Repos;

use crate::repositories::{SqliteMcpRepository, SqliteSettingsRepository};

/// Factory for creating repository instances with `SQLite` backends.
pub struct CoreFactory;

impl CoreFactory {
    /// Build all `SQLite` repositories from a pool.
    ///
    /// This is the recommended way for adapters to obtain repositories.
    pub fn build_repos(pool: SqlitePool) -> Repos {
        Repos::new(
            Arc::new(SqliteSettingsRepository::new(pool.clone())),
            Arc::new(SqliteMcpRepository::new(pool)),
        )
    }

    /// Create a settings repository from a pool.
    pub fn settings_repository(pool: SqlitePool) -> Arc<SqliteSettingsRepository> {
        Arc::new(SqliteSettingsRepository::new(pool))
    }

    /// Create an MCP server repository from a pool.
    pub fn mcp_repository(pool: SqlitePool) -> Arc<SqliteMcpRepository> {
        Arc::new(SqliteMcpRepository::new(pool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::setup_test_database;
    use flowdown_core::NewMcpServer;

    #[tokio::test]
    async fn test_build_repos_share_pool() {
        let pool = setup_test_database().await.unwrap();
        let repos = CoreFactory::build_repos(pool.clone());

        repos
            .mcp_servers
            .insert(NewMcpServer::new_http("shared", "https://example.com/mcp"))
            .await
            .unwrap();

        let direct = CoreFactory::mcp_repository(pool);
        assert_eq!(
            flowdown_core::McpServerRepository::list(direct.as_ref())
                .await
                .unwrap()
                .len(),
            1
        );

        let settings = repos.settings.load().await.unwrap();
        assert!(!settings.prepare_on_launch());
    }
}
