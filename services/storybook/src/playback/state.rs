//! services/storybook/src/playback/state.rs
//!
//! Defines the per-session playback state and the snapshot handed to renderers.

use storybook_core::Story;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::settings::PlaybackSettings;

/// An enum representing where the session is in its narration cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    Idle,
    Speaking,
    WaitingToAdvance,
    Closed,
}

/// The narration run currently allowed to speak and schedule page turns.
pub(crate) struct ActiveRun {
    pub id: u64,
    pub token: CancellationToken,
    pub handle: JoinHandle<()>,
}

/// The state for a single reading session.
pub(crate) struct SessionState {
    pub story: Story,
    /// `None` exactly when the story has no pages.
    pub current_page_index: Option<usize>,
    pub phase: PlaybackPhase,
    pub settings: PlaybackSettings,
    pub active_run: Option<ActiveRun>,
    /// The task of the last cancelled or finished run. The next run waits for it to
    /// exit before it touches the speech engine.
    pub retired_run: Option<JoinHandle<()>>,
    last_run_id: u64,
}

impl SessionState {
    pub fn new(story: Story, start_index: usize, settings: PlaybackSettings) -> Self {
        let current_page_index = story.last_index().map(|last| start_index.min(last));
        Self {
            story,
            current_page_index,
            phase: PlaybackPhase::Idle,
            settings,
            active_run: None,
            retired_run: None,
            last_run_id: 0,
        }
    }

    pub fn next_run_id(&mut self) -> u64 {
        self.last_run_id += 1;
        self.last_run_id
    }

    /// True only for the run that is still current; superseded runs must bail out.
    pub fn owns(&self, run_id: u64) -> bool {
        self.active_run.as_ref().map(|run| run.id) == Some(run_id)
    }

    pub fn is_playing(&self) -> bool {
        matches!(
            self.phase,
            PlaybackPhase::Speaking | PlaybackPhase::WaitingToAdvance
        )
    }

    pub fn is_closed(&self) -> bool {
        self.phase == PlaybackPhase::Closed
    }

    /// Ends the current run from inside the run itself.
    pub fn finish_run(&mut self) {
        self.retire_run();
        self.phase = PlaybackPhase::Idle;
    }

    /// Detaches the active run and returns its id and token. Its task handle is kept
    /// for the next run to await.
    pub fn retire_run(&mut self) -> Option<(u64, CancellationToken)> {
        let run = self.active_run.take()?;
        self.retired_run = Some(run.handle);
        Some((run.id, run.token))
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            story_id: self.story.id,
            title: self.story.title.clone(),
            current_page_index: self.current_page_index,
            page_count: self.story.page_count(),
            phase: self.phase,
            is_playing: self.is_playing(),
            is_speaking: self.phase == PlaybackPhase::Speaking,
            settings: self.settings,
        }
    }
}

/// Everything a reading screen needs to render the session.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSnapshot {
    pub story_id: Uuid,
    pub title: String,
    pub current_page_index: Option<usize>,
    pub page_count: usize,
    pub phase: PlaybackPhase,
    pub is_playing: bool,
    pub is_speaking: bool,
    pub settings: PlaybackSettings,
}

impl PlaybackSnapshot {
    /// False for the "no content" state: nothing to narrate, navigation disabled.
    pub fn has_content(&self) -> bool {
        self.page_count > 0
    }

    pub fn can_go_next(&self) -> bool {
        matches!(self.current_page_index, Some(index) if index + 1 < self.page_count)
    }

    pub fn can_go_prev(&self) -> bool {
        matches!(self.current_page_index, Some(index) if index > 0)
    }
}
