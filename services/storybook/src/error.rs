//! services/storybook/src/error.rs
//!
//! Defines the primary error type for the storybook service.

use crate::config::ConfigError;
use crate::playback::PlaybackError;
use storybook_core::ports::PortError;

/// The primary error type for the `storybook` service.
#[derive(Debug, thiserror::Error)]
pub enum StorybookError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core capability ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A playback session refused a command.
    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error while applying database migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
