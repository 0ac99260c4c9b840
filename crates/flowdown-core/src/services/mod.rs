//! Core services that orchestrate ports without knowing their implementations.

mod settings_service;

pub use settings_service::SettingsService;
