//! Settings service - orchestrates settings operations.

use std::sync::Arc;

use crate::ports::{CoreError, SettingsRepository};
use crate::settings::{Settings, SettingsUpdate, validate_settings};

/// Service for settings operations.
pub struct SettingsService {
    repo: Arc<dyn SettingsRepository>,
}

impl SettingsService {
    pub fn new(repo: Arc<dyn SettingsRepository>) -> Self {
        Self { repo }
    }

    /// Current settings, with defaults filled in for anything never stored.
    pub async fn get(&self) -> Result<Settings, CoreError> {
        let stored = self.repo.load().await?;
        let mut settings = Settings::with_defaults();
        settings.merge(&SettingsUpdate {
            mcp_connect_timeout_secs: stored.mcp_connect_timeout_secs.map(Some),
            mcp_request_timeout_secs: stored.mcp_request_timeout_secs.map(Some),
            prepare_on_launch: stored.prepare_on_launch.map(Some),
        });
        Ok(settings)
    }

    /// Apply a partial update, validate, and persist.
    pub async fn update(&self, update: SettingsUpdate) -> Result<Settings, CoreError> {
        let mut current = self.repo.load().await?;
        current.merge(&update);
        validate_settings(&current)?;
        self.repo.save(&current).await?;
        tracing::debug!(?current, "Settings updated");
        Ok(current)
    }

    /// Set one field from its textual form. An empty value resets it.
    pub async fn set(&self, key: &str, value: &str) -> Result<Settings, CoreError> {
        let update = SettingsUpdate::from_key_value(key, value)?;
        self.update(update).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RepositoryError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct MockSettingsRepo {
        settings: Mutex<Settings>,
    }

    impl MockSettingsRepo {
        fn empty() -> Self {
            Self {
                settings: Mutex::new(Settings::default()),
            }
        }
    }

    #[async_trait]
    impl SettingsRepository for MockSettingsRepo {
        async fn load(&self) -> Result<Settings, RepositoryError> {
            Ok(self.settings.lock().unwrap().clone())
        }

        async fn save(&self, settings: &Settings) -> Result<(), RepositoryError> {
            *self.settings.lock().unwrap() = settings.clone();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_get_fills_defaults() {
        let service = SettingsService::new(Arc::new(MockSettingsRepo::empty()));

        let settings = service.get().await.unwrap();
        assert_eq!(settings, Settings::with_defaults());
    }

    #[tokio::test]
    async fn test_update_settings() {
        let service = SettingsService::new(Arc::new(MockSettingsRepo::empty()));

        let update = SettingsUpdate {
            mcp_connect_timeout_secs: Some(Some(10)),
            ..Default::default()
        };
        let updated = service.update(update).await.unwrap();
        assert_eq!(updated.mcp_connect_timeout_secs, Some(10));

        let fetched = service.get().await.unwrap();
        assert_eq!(fetched.mcp_connect_timeout_secs, Some(10));
        assert_eq!(fetched.mcp_request_timeout_secs, Some(30));
    }

    #[tokio::test]
    async fn test_update_rejects_invalid() {
        let repo = Arc::new(MockSettingsRepo::empty());
        let service = SettingsService::new(repo.clone());

        let result = service.set("mcp_request_timeout_secs", "0").await;
        assert!(matches!(result, Err(CoreError::Settings(_))));
        assert_eq!(repo.load().await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn test_set_resets_with_empty_value() {
        let service = SettingsService::new(Arc::new(MockSettingsRepo::empty()));
        service.set("prepare_on_launch", "true").await.unwrap();
        assert!(service.get().await.unwrap().prepare_on_launch());

        service.set("prepare_on_launch", "").await.unwrap();
        assert!(!service.get().await.unwrap().prepare_on_launch());
    }
}
