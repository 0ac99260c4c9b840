//! Settings persistence port.

use async_trait::async_trait;

use super::RepositoryError;
use crate::settings::Settings;

/// Stores the MCP timeouts and launch behaviour as one record.
///
/// Fields that were never saved come back as `None`; callers fill in
/// defaults (see [`crate::SettingsService::get`]).
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Load whatever has been saved, or an all-`None` record.
    async fn load(&self) -> Result<Settings, RepositoryError>;

    /// Replace the stored record.
    async fn save(&self, settings: &Settings) -> Result<(), RepositoryError>;
}
