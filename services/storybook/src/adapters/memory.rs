//! services/storybook/src/adapters/memory.rs
//!
//! In-process implementations of the storage and library ports, used by tests and
//! by sessions that do not need durability.

use async_trait::async_trait;
use std::collections::HashMap;
use storybook_core::ports::{KeyValueStore, PortError, PortResult, StoryLibrary};
use storybook_core::Story;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> PortResult<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> PortResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}

/// A story library held in memory, in insertion order.
#[derive(Default)]
pub struct MemoryStoryLibrary {
    stories: Mutex<Vec<Story>>,
}

impl MemoryStoryLibrary {
    pub fn new(stories: Vec<Story>) -> Self {
        Self {
            stories: Mutex::new(stories),
        }
    }

    /// Adds a story, replacing any story with the same id.
    pub async fn insert(&self, story: Story) {
        let mut stories = self.stories.lock().await;
        match stories.iter_mut().find(|existing| existing.id == story.id) {
            Some(existing) => *existing = story,
            None => stories.push(story),
        }
    }

    /// Deletes a story. Returns whether it existed.
    pub async fn delete(&self, story_id: Uuid) -> bool {
        let mut stories = self.stories.lock().await;
        let before = stories.len();
        stories.retain(|story| story.id != story_id);
        stories.len() != before
    }
}

#[async_trait]
impl StoryLibrary for MemoryStoryLibrary {
    async fn get_story(&self, story_id: Uuid) -> PortResult<Story> {
        self.stories
            .lock()
            .await
            .iter()
            .find(|story| story.id == story_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("story {}", story_id)))
    }

    async fn list_stories(&self) -> PortResult<Vec<Story>> {
        Ok(self.stories.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storybook_core::Page;

    #[tokio::test]
    async fn key_value_round_trip_and_idempotent_remove() {
        let store = MemoryKeyValueStore::default();
        assert_eq!(store.get("k").await.unwrap(), None);
        store.set("k", "v").await.unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.remove("k").await.unwrap();
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn deleted_stories_are_not_found() {
        let story = Story::new("うみのぼうけん", vec![Page::new("なみがきらきら", "")]);
        let id = story.id;
        let library = MemoryStoryLibrary::new(vec![story]);

        assert!(library.get_story(id).await.is_ok());
        assert!(library.delete(id).await);
        assert!(!library.delete(id).await);
        assert!(matches!(
            library.get_story(id).await,
            Err(PortError::NotFound(_))
        ));
        assert!(library.list_stories().await.unwrap().is_empty());
    }
}
