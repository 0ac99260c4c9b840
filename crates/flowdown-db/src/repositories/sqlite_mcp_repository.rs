//! `SQLite` implementation of the MCP server repository.
//!
//! Environment variables live in a separate table with base64 encoding (not
//! encryption). Args, headers and capabilities are stored as JSON text.
//! Multi-statement writes run inside a transaction so readers never observe
//! a server without its env.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use flowdown_core::domain::mcp::{
    ConnectionStatus, McpEnvEntry, McpServer, McpServerConfig, McpServerType, NewMcpServer,
};
use flowdown_core::ports::{McpRepositoryError, McpServerEdit, McpServerRepository};

/// `SQLite` implementation of the MCP server repository.
pub struct SqliteMcpRepository {
    pool: SqlitePool,
}

impl SqliteMcpRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal row types for database queries
// ─────────────────────────────────────────────────────────────────────────────

const SELECT_SERVER: &str = r#"
    SELECT id, name, type, enabled, command, args, cwd, url, headers,
           created_at, connection_status, last_connected_at, capabilities
    FROM mcp_servers
"#;

#[derive(sqlx::FromRow)]
struct McpServerRow {
    id: i64,
    name: String,
    #[sqlx(rename = "type")]
    server_type: String,
    enabled: bool,
    command: Option<String>,
    args: String,
    cwd: Option<String>,
    url: Option<String>,
    headers: String,
    created_at: String,
    connection_status: String,
    last_connected_at: Option<String>,
    capabilities: String,
}

#[derive(sqlx::FromRow)]
struct EnvRow {
    key: String,
    value: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Helper functions
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a stored timestamp.
///
/// Accepts RFC 3339 (written by this repository) and `SQLite`'s own
/// `datetime('now')` format (column defaults).
fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|dt| Utc.from_utc_datetime(&dt))
        })
        .unwrap_or_else(|_| Utc::now())
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_server_type(s: &str) -> McpServerType {
    match s {
        "stdio" => McpServerType::Stdio,
        _ => McpServerType::Http,
    }
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, McpRepositoryError> {
    serde_json::to_string(value)
        .map_err(|e| McpRepositoryError::Internal(format!("Failed to encode column: {e}")))
}

/// Convert a `McpServerRow` (with env) to domain `McpServer`.
///
/// Malformed JSON columns degrade to empty values instead of failing the read.
fn row_to_server(row: McpServerRow, env: Vec<McpEnvEntry>) -> McpServer {
    let args: Vec<String> = serde_json::from_str(&row.args).unwrap_or_default();
    let headers: BTreeMap<String, String> = serde_json::from_str(&row.headers).unwrap_or_default();
    let capabilities: Vec<String> = serde_json::from_str(&row.capabilities).unwrap_or_default();

    McpServer {
        id: row.id,
        name: row.name,
        server_type: parse_server_type(&row.server_type),
        config: McpServerConfig {
            command: row.command,
            args,
            working_dir: row.cwd,
            url: row.url,
            headers,
        },
        env,
        enabled: row.enabled,
        created_at: parse_datetime(&row.created_at),
        connection_status: ConnectionStatus::from_stored(&row.connection_status),
        last_connected_at: row.last_connected_at.as_deref().map(parse_datetime),
        capabilities,
    }
}

/// Decode a base64-encoded environment variable value.
fn decode_env_value(encoded: &str) -> Result<String, McpRepositoryError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded)
        .map_err(|e| McpRepositoryError::Internal(format!("Failed to decode env var: {e}")))?;

    String::from_utf8(bytes)
        .map_err(|e| McpRepositoryError::Internal(format!("Invalid UTF-8 in env var: {e}")))
}

fn encode_env_value(value: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(value.as_bytes())
}

/// Map `SQLx` errors to `McpRepositoryError`.
fn map_sqlx_error(e: sqlx::Error) -> McpRepositoryError {
    if let Some(db) = e.as_database_error() {
        if db.is_unique_violation() {
            let msg = db.message();
            if msg.contains("mcp_servers.name") {
                return McpRepositoryError::Conflict(
                    "MCP server name already exists".to_string(),
                );
            }
            if msg.contains("mcp_server_env") {
                return McpRepositoryError::Conflict(
                    "Duplicate environment variable key".to_string(),
                );
            }
        }
    }
    McpRepositoryError::Internal(e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection-level queries, shared by pooled reads and transactions
// ─────────────────────────────────────────────────────────────────────────────

async fn fetch_env(
    conn: &mut SqliteConnection,
    server_id: i64,
) -> Result<Vec<McpEnvEntry>, McpRepositoryError> {
    let rows = sqlx::query_as::<_, EnvRow>(
        "SELECT key, value FROM mcp_server_env WHERE server_id = ? ORDER BY id",
    )
    .bind(server_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    rows.into_iter()
        .map(|row| Ok(McpEnvEntry::new(row.key, decode_env_value(&row.value)?)))
        .collect()
}

async fn fetch_server(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<McpServer, McpRepositoryError> {
    let row = sqlx::query_as::<_, McpServerRow>(&format!("{SELECT_SERVER} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| McpRepositoryError::NotFound(id.to_string()))?;

    let env = fetch_env(conn, id).await?;
    Ok(row_to_server(row, env))
}

async fn replace_env(
    conn: &mut SqliteConnection,
    server_id: i64,
    env: &[McpEnvEntry],
) -> Result<(), McpRepositoryError> {
    sqlx::query("DELETE FROM mcp_server_env WHERE server_id = ?")
        .bind(server_id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    for entry in env {
        sqlx::query("INSERT INTO mcp_server_env (server_id, key, value) VALUES (?, ?, ?)")
            .bind(server_id)
            .bind(&entry.key)
            .bind(encode_env_value(&entry.value))
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
    }

    Ok(())
}

/// Write every mutable column of `server` back to its row.
async fn write_server(
    conn: &mut SqliteConnection,
    server: &McpServer,
) -> Result<(), McpRepositoryError> {
    let result = sqlx::query(
        r#"
        UPDATE mcp_servers
        SET name = ?, type = ?, enabled = ?, command = ?, args = ?, cwd = ?, url = ?,
            headers = ?, connection_status = ?, last_connected_at = ?, capabilities = ?
        WHERE id = ?
        "#,
    )
    .bind(&server.name)
    .bind(server.server_type.as_str())
    .bind(server.enabled)
    .bind(&server.config.command)
    .bind(to_json(&server.config.args)?)
    .bind(&server.config.working_dir)
    .bind(&server.config.url)
    .bind(to_json(&server.config.headers)?)
    .bind(server.connection_status.as_str())
    .bind(server.last_connected_at.as_ref().map(format_datetime))
    .bind(to_json(&server.capabilities)?)
    .bind(server.id)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    if result.rows_affected() == 0 {
        return Err(McpRepositoryError::NotFound(server.id.to_string()));
    }

    replace_env(conn, server.id, &server.env).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Repository implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl McpServerRepository for SqliteMcpRepository {
    async fn insert(&self, server: NewMcpServer) -> Result<McpServer, McpRepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            INSERT INTO mcp_servers (name, type, enabled, command, args, cwd, url, headers)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&server.name)
        .bind(server.server_type.as_str())
        .bind(server.enabled)
        .bind(&server.config.command)
        .bind(to_json(&server.config.args)?)
        .bind(&server.config.working_dir)
        .bind(&server.config.url)
        .bind(to_json(&server.config.headers)?)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let server_id = result.last_insert_rowid();
        replace_env(&mut tx, server_id, &server.env).await?;
        let inserted = fetch_server(&mut tx, server_id).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        tracing::debug!(server_id, server_name = %inserted.name, "Inserted MCP server");
        Ok(inserted)
    }

    async fn get(&self, id: i64) -> Result<McpServer, McpRepositoryError> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        fetch_server(&mut conn, id).await
    }

    async fn list(&self) -> Result<Vec<McpServer>, McpRepositoryError> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;

        let rows = sqlx::query_as::<_, McpServerRow>(&format!("{SELECT_SERVER} ORDER BY name"))
            .fetch_all(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        let mut servers = Vec::with_capacity(rows.len());
        for row in rows {
            let env = fetch_env(&mut conn, row.id).await?;
            servers.push(row_to_server(row, env));
        }

        Ok(servers)
    }

    async fn update(&self, server: &McpServer) -> Result<(), McpRepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        write_server(&mut tx, server).await?;
        tx.commit().await.map_err(map_sqlx_error)
    }

    async fn remove(&self, id: i64) -> Result<(), McpRepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // Explicit env delete so removal does not depend on PRAGMA foreign_keys
        sqlx::query("DELETE FROM mcp_server_env WHERE server_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        let result = sqlx::query("DELETE FROM mcp_servers WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(McpRepositoryError::NotFound(id.to_string()));
        }

        tx.commit().await.map_err(map_sqlx_error)?;
        tracing::debug!(server_id = id, "Removed MCP server");
        Ok(())
    }

    async fn edit(&self, id: i64, edit: McpServerEdit) -> Result<McpServer, McpRepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let mut server = fetch_server(&mut tx, id).await?;
        edit(&mut server);
        server.id = id;

        write_server(&mut tx, &server).await?;
        let edited = fetch_server(&mut tx, id).await?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(edited)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
