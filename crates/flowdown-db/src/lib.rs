//! `SQLite` persistence for FlowDown.
//!
//! Implements the repository ports from `flowdown-core` on top of `sqlx`.
//! Nothing outside this crate sees a `SqlitePool` except through
//! [`setup_database`] and [`CoreFactory`].

#![deny(unsafe_code)]

pub mod factory;
pub mod repositories;
pub mod setup;

pub use factory::CoreFactory;
pub use repositories::{SqliteMcpRepository, SqliteSettingsRepository};
pub use setup::setup_database;
#[cfg(any(test, feature = "test-utils"))]
pub use setup::setup_test_database;
