//! JSON-RPC clients for MCP servers.
//!
//! [`DefaultClientFactory`] turns a server record into an unconnected
//! [`McpClientPort`]: a [`StdioClient`] for local processes or an
//! [`HttpClient`] for remote endpoints.

mod http;
pub mod protocol;
mod stdio;

use std::time::Duration;

use flowdown_core::{
    DEFAULT_REQUEST_TIMEOUT_SECS, McpClientError, McpClientFactory, McpClientPort, McpServer,
    McpServerType, Settings,
};

pub use http::HttpClient;
pub use stdio::StdioClient;

/// Factory used by the service outside of tests.
#[derive(Debug, Clone, Copy)]
pub struct DefaultClientFactory {
    request_timeout: Duration,
}

impl DefaultClientFactory {
    pub const fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    /// Use the request timeout from application settings.
    pub const fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.request_timeout())
    }

    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl Default for DefaultClientFactory {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS))
    }
}

impl McpClientFactory for DefaultClientFactory {
    fn create(&self, server: &McpServer) -> Result<Box<dyn McpClientPort>, McpClientError> {
        server
            .config
            .validate(server.server_type)
            .map_err(McpClientError::InvalidConfig)?;

        match server.server_type {
            McpServerType::Stdio => Ok(Box::new(StdioClient::new(server, self.request_timeout)?)),
            McpServerType::Http => Ok(Box::new(HttpClient::new(server, self.request_timeout)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use flowdown_core::{ConnectionStatus, McpServerConfig};

    fn server(server_type: McpServerType, config: McpServerConfig) -> McpServer {
        McpServer {
            id: 1,
            name: "test".to_string(),
            server_type,
            config,
            env: vec![],
            enabled: true,
            created_at: Utc::now(),
            connection_status: ConnectionStatus::Disconnected,
            last_connected_at: None,
            capabilities: vec![],
        }
    }

    #[test]
    fn test_creates_unconnected_clients() {
        let factory = DefaultClientFactory::default();

        let stdio = factory
            .create(&server(
                McpServerType::Stdio,
                McpServerConfig::stdio("npx", vec!["-y".to_string()]),
            ))
            .unwrap();
        assert!(!stdio.is_connected());

        let http = factory
            .create(&server(
                McpServerType::Http,
                McpServerConfig::http("https://example.com/mcp"),
            ))
            .unwrap();
        assert!(!http.is_connected());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let factory = DefaultClientFactory::default();

        // Placeholder record: HTTP with no URL yet
        let result = factory.create(&server(McpServerType::Http, McpServerConfig::default()));
        assert!(matches!(result, Err(McpClientError::InvalidConfig(_))));

        let result = factory.create(&server(
            McpServerType::Stdio,
            McpServerConfig::stdio("npx -y server", vec![]),
        ));
        assert!(matches!(result, Err(McpClientError::InvalidConfig(_))));
    }

    #[test]
    fn test_request_timeout_from_settings() {
        let settings = Settings {
            mcp_request_timeout_secs: Some(7),
            ..Settings::with_defaults()
        };
        let factory = DefaultClientFactory::from_settings(&settings);
        assert_eq!(factory.request_timeout(), Duration::from_secs(7));
    }
}
