//! crates/storybook_core/src/domain.rs
//!
//! Defines the pure, core data structures for the storybook reader.
//! These structs are independent of any storage or serialization format.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

/// A single illustrated page of a story.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub id: Uuid,
    /// Narration text. May be empty, which means there is nothing to speak.
    pub content: String,
    /// Opaque illustration reference, never interpreted by the core.
    pub image_url: String,
}

impl Page {
    pub fn new(content: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            image_url: image_url.into(),
        }
    }

    /// True when the page has no speakable text.
    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// A story read during a playback session. Pages are in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct Story {
    pub id: Uuid,
    pub title: String,
    pub pages: Vec<Page>,
}

impl Story {
    pub fn new(title: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            pages,
        }
    }

    /// The "no content yet" story used when a story is missing or deleted.
    pub fn empty(id: Uuid) -> Self {
        Self {
            id,
            title: String::new(),
            pages: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn last_index(&self) -> Option<usize> {
        self.pages.len().checked_sub(1)
    }
}

/// Voice parameters handed to the speech engine with every utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechOptions {
    pub language: String,
    pub pitch: f32,
    pub rate: f32,
}

impl Default for SpeechOptions {
    fn default() -> Self {
        Self {
            language: "ja-JP".to_string(),
            pitch: 1.0,
            rate: 1.0,
        }
    }
}

/// The persisted proof of a successful parental challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnlockRecord {
    /// When the challenge was answered correctly.
    pub unlocked_at: DateTime<Utc>,
}

impl UnlockRecord {
    /// How long a successful unlock stays valid.
    pub const WINDOW_SECS: i64 = 30 * 60;

    pub fn new(unlocked_at: DateTime<Utc>) -> Self {
        Self { unlocked_at }
    }

    /// `None` when the window would end past the last representable instant.
    pub fn unlocked_until(&self) -> Option<DateTime<Utc>> {
        self.unlocked_at
            .checked_add_signed(Duration::seconds(Self::WINDOW_SECS))
    }

    /// Access is granted iff `now < unlocked_until`.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.unlocked_until().is_some_and(|until| now < until)
    }
}
