//! services/storybook/src/config.rs
//!
//! Defines the reader's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;
use uuid::Uuid;

use crate::playback::ReaderProfile;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Which durable backend holds the parental unlock record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    File(PathBuf),
    Postgres(String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub log_level: Level,
    pub story_library_path: PathBuf,
    pub story_id: Option<Uuid>,
    pub reader_profile: ReaderProfile,
    pub speech_language: String,
    pub speech_pitch: f32,
    pub speech_ms_per_char: u64,
    pub storage: StorageBackend,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Story Library ---
        let story_library_path = lookup("STORY_LIBRARY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/stories.json"));
        let story_id = lookup("STORY_ID")
            .map(|raw| parse_var::<Uuid>("STORY_ID", &raw))
            .transpose()?;

        let reader_profile = match lookup("READER_PROFILE")
            .unwrap_or_else(|| "player".to_string())
            .to_lowercase()
            .as_str()
        {
            "player" => ReaderProfile::player(),
            "viewer" => ReaderProfile::viewer(),
            other => {
                return Err(ConfigError::InvalidValue(
                    "READER_PROFILE".to_string(),
                    format!("'{}' is not one of player, viewer", other),
                ))
            }
        };

        // --- Speech Settings ---
        let speech_language = lookup("SPEECH_LANGUAGE").unwrap_or_else(|| "ja-JP".to_string());
        let speech_pitch = lookup("SPEECH_PITCH")
            .map(|raw| parse_var::<f32>("SPEECH_PITCH", &raw))
            .transpose()?
            .unwrap_or(1.0);
        let speech_ms_per_char = lookup("SPEECH_MS_PER_CHAR")
            .map(|raw| parse_var::<u64>("SPEECH_MS_PER_CHAR", &raw))
            .transpose()?
            .unwrap_or(200);

        // --- Storage Backend ---
        let storage = match lookup("STORAGE_BACKEND")
            .unwrap_or_else(|| "file".to_string())
            .to_lowercase()
            .as_str()
        {
            "file" => StorageBackend::File(
                lookup("KV_STORE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./data/kv_store.json")),
            ),
            "postgres" => StorageBackend::Postgres(
                lookup("DATABASE_URL")
                    .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?,
            ),
            other => {
                return Err(ConfigError::InvalidValue(
                    "STORAGE_BACKEND".to_string(),
                    format!("'{}' is not one of file, postgres", other),
                ))
            }
        };

        Ok(Self {
            log_level,
            story_library_path,
            story_id,
            reader_profile,
            speech_language,
            speech_pitch,
            speech_ms_per_char,
            storage,
        })
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}
