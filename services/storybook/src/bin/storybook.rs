//! services/storybook/src/bin/storybook.rs

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use storybook_core::ports::{KeyValueStore, SpeechService, StoryLibrary};
use storybook_core::SpeechOptions;
use storybook_lib::{
    adapters::{FileKeyValueStore, JsonStoryLibrary, PgKeyValueStore, SimulatedSpeechAdapter, SystemClock},
    config::{Config, StorageBackend},
    error::StorybookError,
    gate::ParentalGate,
    playback::{PlaybackEvent, PlaybackOptions, StoryPlaybackController},
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), StorybookError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting reader...");

    // --- 2. Open the Key-Value Store ---
    let store: Arc<dyn KeyValueStore> = match &config.storage {
        StorageBackend::File(path) => {
            info!(path = %path.display(), "Using the file key-value store.");
            Arc::new(FileKeyValueStore::new(path.clone()))
        }
        StorageBackend::Postgres(url) => {
            info!("Connecting to database...");
            let pool = PgPoolOptions::new().max_connections(5).connect(url).await?;
            let db_adapter = PgKeyValueStore::new(pool);
            info!("Running database migrations...");
            db_adapter.run_migrations().await?;
            info!("Database migrations complete.");
            Arc::new(db_adapter)
        }
    };

    // --- 3. Parental Gate ---
    let gate = ParentalGate::load(store, Arc::new(SystemClock)).await;
    if gate.check_access().await {
        info!(until = ?gate.unlocked_until().await, "Parent-only views are open.");
    } else {
        info!("Parent-only views require the arithmetic challenge.");
    }

    // --- 4. Resolve the Story ---
    let library = JsonStoryLibrary::load(&config.story_library_path).await?;
    let story_id = match config.story_id {
        Some(id) => id,
        None => library
            .list_stories()
            .await?
            .first()
            .map(|story| story.id)
            .ok_or_else(|| StorybookError::Internal("the story library is empty".to_string()))?,
    };

    // --- 5. Read It Aloud ---
    let speech: Arc<dyn SpeechService> =
        Arc::new(SimulatedSpeechAdapter::new(config.speech_ms_per_char));
    let options = PlaybackOptions {
        profile: config.reader_profile,
        voice: SpeechOptions {
            language: config.speech_language.clone(),
            pitch: config.speech_pitch,
            ..SpeechOptions::default()
        },
        start_index: 0,
    };
    let (controller, mut notices) =
        StoryPlaybackController::open(&library, story_id, speech, options).await?;
    let snapshot = controller.snapshot().await;
    info!(title = %snapshot.title, pages = snapshot.page_count, "Story opened.");
    if !snapshot.has_content() {
        warn!(%story_id, "Nothing to read.");
        controller.close().await;
        return Ok(());
    }

    // Without auto-turn the reader reads one page and stops.
    controller.play().await?;
    while let Some(notice) = notices.recv().await {
        match notice.event {
            PlaybackEvent::EndOfStory => {
                info!("The end.");
                break;
            }
            PlaybackEvent::NarrationFailed { index, reason } => {
                warn!(index, "Narration failed: {}", reason);
                break;
            }
            PlaybackEvent::NarrationFinished { index }
                if !controller.snapshot().await.settings.auto_page_turn =>
            {
                info!(index, "Page read; auto page turn is off.");
                break;
            }
            event => info!(?event, "Playback event."),
        }
    }

    controller.close().await;
    Ok(())
}
