//! services/storybook/src/adapters/library.rs
//!
//! A read-only `StoryLibrary` loaded from a JSON document of stories.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use storybook_core::ports::{PortError, PortResult, StoryLibrary};
use storybook_core::{Page, Story};
use tracing::info;
use uuid::Uuid;

//=========================================================================================
// "Impure" File Record Structs
//=========================================================================================

#[derive(Deserialize)]
struct LibraryFile {
    stories: Vec<StoryRecord>,
}

#[derive(Deserialize)]
struct StoryRecord {
    id: Uuid,
    title: String,
    #[serde(default)]
    pages: Vec<PageRecord>,
}

#[derive(Deserialize)]
struct PageRecord {
    #[serde(default = "Uuid::new_v4")]
    id: Uuid,
    #[serde(default)]
    content: String,
    #[serde(default, alias = "imageUrl")]
    image_url: String,
}

impl StoryRecord {
    fn into_domain(self) -> Story {
        Story {
            id: self.id,
            title: self.title,
            pages: self
                .pages
                .into_iter()
                .map(|page| Page {
                    id: page.id,
                    content: page.content,
                    image_url: page.image_url,
                })
                .collect(),
        }
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct JsonStoryLibrary {
    stories: Vec<Story>,
}

impl JsonStoryLibrary {
    /// Parses a library document of the form `{"stories": [...]}`.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let file: LibraryFile = serde_json::from_str(raw)?;
        Ok(Self {
            stories: file.stories.into_iter().map(StoryRecord::into_domain).collect(),
        })
    }

    pub async fn load(path: impl AsRef<Path>) -> PortResult<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            PortError::Unavailable(format!("cannot read {}: {}", path.display(), e))
        })?;
        let library = Self::from_json(&raw).map_err(|e| {
            PortError::Unexpected(format!("invalid story library {}: {}", path.display(), e))
        })?;
        info!(path = %path.display(), stories = library.stories.len(), "Story library loaded.");
        Ok(library)
    }
}

#[async_trait]
impl StoryLibrary for JsonStoryLibrary {
    async fn get_story(&self, story_id: Uuid) -> PortResult<Story> {
        self.stories
            .iter()
            .find(|story| story.id == story_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("story {}", story_id)))
    }

    async fn list_stories(&self) -> PortResult<Vec<Story>> {
        Ok(self.stories.clone())
    }
}
