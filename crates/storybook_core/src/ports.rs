//! crates/storybook_core/src/ports.rs
//!
//! Defines the capability contracts (traits) the controllers are built against.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to stay independent of the speech engine, the storage backend and the clock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{SpeechOptions, Story};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (speech engine, storage).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The capability cannot serve the request (unsupported voice, backend down).
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    /// The operation was cut short by a `stop` or a newer request.
    #[error("Interrupted")]
    Interrupted,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Capability Ports (Traits)
//=========================================================================================

/// The process-wide text-to-speech capability.
///
/// Starting an utterance implicitly stops any other in-flight one, so callers must
/// never assume exclusive ownership of the engine.
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Speaks `text` and resolves exactly once: `Ok` when the utterance is done,
    /// `Err` when it failed or was interrupted.
    async fn speak(&self, text: &str, options: &SpeechOptions) -> PortResult<()>;

    /// Cancels any in-flight utterance. Safe to call when nothing is speaking.
    fn stop(&self);
}

/// A durable string key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> PortResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> PortResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> PortResult<()>;
}

/// The read side of the saved-story library.
#[async_trait]
pub trait StoryLibrary: Send + Sync {
    async fn get_story(&self, story_id: Uuid) -> PortResult<Story>;

    async fn list_stories(&self) -> PortResult<Vec<Story>>;
}

/// Wall-clock source, injected so unlock expiry can be tested.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
