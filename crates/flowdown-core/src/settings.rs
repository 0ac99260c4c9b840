//! Settings domain types and validation.
//!
//! This module contains the core settings types used across the application.
//! These are pure domain types with no infrastructure dependencies.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bound on a single MCP connect attempt, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default bound on a single MCP request/response exchange, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Upper bound accepted for either timeout.
const MAX_TIMEOUT_SECS: u64 = 600;

/// Application settings structure.
///
/// All fields are optional to support partial updates and graceful defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Seconds before an MCP connect attempt is abandoned.
    pub mcp_connect_timeout_secs: Option<u64>,

    /// Seconds to wait for any single MCP response.
    pub mcp_request_timeout_secs: Option<u64>,

    /// Whether to connect every enabled server when the application starts,
    /// instead of waiting for the first conversation.
    pub prepare_on_launch: Option<bool>,
}

impl Settings {
    /// Create settings with sensible defaults.
    #[must_use]
    pub const fn with_defaults() -> Self {
        Self {
            mcp_connect_timeout_secs: Some(DEFAULT_CONNECT_TIMEOUT_SECS),
            mcp_request_timeout_secs: Some(DEFAULT_REQUEST_TIMEOUT_SECS),
            prepare_on_launch: Some(false),
        }
    }

    /// Effective connect timeout (with default fallback).
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        match self.mcp_connect_timeout_secs {
            Some(secs) => Duration::from_secs(secs),
            None => Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Effective request timeout (with default fallback).
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        match self.mcp_request_timeout_secs {
            Some(secs) => Duration::from_secs(secs),
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Effective launch behaviour (defaults to lazy).
    #[must_use]
    pub fn prepare_on_launch(&self) -> bool {
        self.prepare_on_launch.unwrap_or(false)
    }

    /// Merge another settings into this one, only updating fields that are Some.
    pub fn merge(&mut self, other: &SettingsUpdate) {
        if let Some(ref secs) = other.mcp_connect_timeout_secs {
            self.mcp_connect_timeout_secs = *secs;
        }
        if let Some(ref secs) = other.mcp_request_timeout_secs {
            self.mcp_request_timeout_secs = *secs;
        }
        if let Some(ref prepare) = other.prepare_on_launch {
            self.prepare_on_launch = *prepare;
        }
    }
}

/// Partial settings update.
///
/// Each field is `Option<Option<T>>`:
/// - `None` = don't change this field
/// - `Some(None)` = reset field to its default
/// - `Some(Some(value))` = set field to value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub mcp_connect_timeout_secs: Option<Option<u64>>,
    pub mcp_request_timeout_secs: Option<Option<u64>>,
    pub prepare_on_launch: Option<Option<bool>>,
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("{field} must be between 1 and {MAX_TIMEOUT_SECS} seconds, got {value}")]
    InvalidTimeout { field: &'static str, value: u64 },

    #[error("Unknown setting: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    for (field, value) in [
        ("mcp_connect_timeout_secs", settings.mcp_connect_timeout_secs),
        ("mcp_request_timeout_secs", settings.mcp_request_timeout_secs),
    ] {
        if let Some(value) = value {
            if !(1..=MAX_TIMEOUT_SECS).contains(&value) {
                return Err(SettingsError::InvalidTimeout { field, value });
            }
        }
    }

    Ok(())
}

impl SettingsUpdate {
    /// Build a single-field update from a `key` / textual `value` pair.
    ///
    /// An empty `value` resets the field.
    pub fn from_key_value(key: &str, value: &str) -> Result<Self, SettingsError> {
        let invalid = || SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        };
        let trimmed = value.trim();

        let mut update = Self::default();
        match key {
            "mcp_connect_timeout_secs" | "mcp_request_timeout_secs" => {
                let parsed = if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.parse::<u64>().map_err(|_| invalid())?)
                };
                if key == "mcp_connect_timeout_secs" {
                    update.mcp_connect_timeout_secs = Some(parsed);
                } else {
                    update.mcp_request_timeout_secs = Some(parsed);
                }
            }
            "prepare_on_launch" => {
                let parsed = if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.parse::<bool>().map_err(|_| invalid())?)
                };
                update.prepare_on_launch = Some(parsed);
            }
            other => return Err(SettingsError::UnknownKey(other.to_string())),
        }
        Ok(update)
    }
}
