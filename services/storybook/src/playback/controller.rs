//! services/storybook/src/playback/controller.rs
//!
//! The story playback controller: page navigation, speech-synchronised narration
//! and automatic page turns for one reading session.
//!
//! Narration is driven by a spawned "run" task. Each run owns a child
//! `CancellationToken` of the session token and a run id; every state mutation the
//! task makes is guarded by the id, so a superseded run can neither speak nor turn a
//! page. A new run waits for its predecessor's task to exit before it stops or starts
//! the speech engine. At most one run (and so one utterance or one pending page turn)
//! is live.

use std::sync::Arc;
use std::time::Duration;

use storybook_core::{PortError, PortResult, SpeechOptions, SpeechService, Story, StoryLibrary};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::events::{PlaybackEvent, PlaybackNotice};
use super::settings::{clamp_delay, clamp_volume, step_speed, PlaybackSettings, ReaderProfile};
use super::state::{ActiveRun, PlaybackPhase, PlaybackSnapshot, SessionState};

/// Receives the notices of one playback session.
pub type PlaybackReceiver = mpsc::UnboundedReceiver<PlaybackNotice>;

/// Commands a playback session can refuse.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("The story has no pages to play")]
    NoContent,
    #[error("The playback session is closed")]
    Closed,
}

/// How a session is opened.
#[derive(Debug, Clone)]
pub struct PlaybackOptions {
    pub profile: ReaderProfile,
    /// Language and pitch for every utterance. The rate comes from the reading speed.
    pub voice: SpeechOptions,
    /// Page to resume at. Clamped to the last page.
    pub start_index: usize,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            profile: ReaderProfile::player(),
            voice: SpeechOptions::default(),
            start_index: 0,
        }
    }
}

/// What the run task does after inspecting the current page.
enum NarrationStep {
    Speak {
        index: usize,
        content: String,
        options: SpeechOptions,
    },
    Advance(Duration),
}

struct Shared {
    state: Mutex<SessionState>,
    speech: Arc<dyn SpeechService>,
    events: mpsc::UnboundedSender<PlaybackNotice>,
    session_token: CancellationToken,
    profile: ReaderProfile,
    voice: SpeechOptions,
}

impl Shared {
    fn emit(&self, event: PlaybackEvent) {
        let notice = PlaybackNotice {
            at: Instant::now(),
            event,
        };
        if self.events.send(notice).is_err() {
            debug!("No playback listener; notice dropped.");
        }
    }

    /// Cancels the live run, if any, and silences the engine on its behalf.
    fn cancel_run(&self, state: &mut SessionState) {
        if let Some((run_id, token)) = state.retire_run() {
            token.cancel();
            self.speech.stop();
            debug!(run_id, "Narration run cancelled.");
        }
    }

    fn halt(&self, state: &mut SessionState) {
        let was_playing = state.is_playing();
        self.cancel_run(state);
        state.phase = PlaybackPhase::Idle;
        if was_playing {
            self.emit(PlaybackEvent::Paused);
        }
    }

    fn start_run(self: &Arc<Self>, state: &mut SessionState) {
        self.cancel_run(state);
        let id = state.next_run_id();
        let token = self.session_token.child_token();
        let previous = state.retired_run.take();
        // The task cannot observe `active_run` before the caller releases the lock.
        let handle = tokio::spawn(Arc::clone(self).narrate(id, token.clone(), previous));
        state.active_run = Some(ActiveRun { id, token, handle });
        state.phase = PlaybackPhase::Speaking;
        debug!(run_id = id, "Narration run started.");
    }

    fn move_to(&self, state: &mut SessionState, target: usize) -> bool {
        if state.current_page_index == Some(target) {
            return false;
        }
        state.current_page_index = Some(target);
        self.emit(PlaybackEvent::PageChanged { index: target });
        true
    }

    fn apply_speed(&self, state: &mut SessionState, speed: f32) -> f32 {
        if !speed.is_finite() {
            return state.settings.reading_speed;
        }
        let speed = self.profile.clamp_speed(speed);
        state.settings.reading_speed = speed;
        // The rate of an utterance cannot change mid-flight.
        if state.phase == PlaybackPhase::Speaking {
            info!(speed, "Reading speed changed while speaking; narration stopped.");
            self.halt(state);
        }
        speed
    }

    /// Decides what follows a narrated (or skipped) page.
    /// Returns the delay before the next page when an advance was scheduled.
    fn after_narration(
        &self,
        state: &mut SessionState,
        index: usize,
        content: &str,
    ) -> Option<Duration> {
        if state.story.last_index() == Some(index) {
            state.finish_run();
            info!(story_id = %state.story.id, "Reached the end of the story.");
            self.emit(PlaybackEvent::EndOfStory);
            return None;
        }
        if !state.settings.auto_page_turn {
            state.finish_run();
            return None;
        }
        let delay = self.profile.timing.advance_delay(
            content,
            state.settings.reading_speed,
            state.settings.auto_page_turn_delay_secs,
        );
        state.phase = PlaybackPhase::WaitingToAdvance;
        self.emit(PlaybackEvent::AdvanceScheduled { from: index, delay });
        Some(delay)
    }

    /// The body of a narration run.
    async fn narrate(
        self: Arc<Self>,
        run_id: u64,
        token: CancellationToken,
        previous: Option<JoinHandle<()>>,
    ) {
        // A superseded run may still be between its ownership check and the engine.
        if let Some(previous) = previous {
            if let Err(e) = previous.await {
                warn!(run_id, error = %e, "Previous narration run ended abnormally.");
            }
        }
        loop {
            let step = {
                let mut state = self.state.lock().await;
                if !state.owns(run_id) || token.is_cancelled() {
                    return;
                }
                let current = state.current_page_index.and_then(|index| {
                    state
                        .story
                        .pages
                        .get(index)
                        .map(|page| (index, page.content.clone()))
                });
                let Some((index, content)) = current else {
                    state.finish_run();
                    return;
                };

                if content.trim().is_empty() {
                    debug!(index, "Page has no text; nothing to narrate.");
                    self.emit(PlaybackEvent::NarrationSkipped { index });
                    match self.after_narration(&mut state, index, &content) {
                        Some(delay) => NarrationStep::Advance(delay),
                        None => return,
                    }
                } else {
                    let mut options = self.voice.clone();
                    options.rate = self.profile.clamp_speed(state.settings.reading_speed);
                    state.phase = PlaybackPhase::Speaking;
                    self.emit(PlaybackEvent::NarrationStarted { index });
                    NarrationStep::Speak {
                        index,
                        content,
                        options,
                    }
                }
            };

            let delay = match step {
                NarrationStep::Advance(delay) => delay,
                NarrationStep::Speak {
                    index,
                    content,
                    options,
                } => {
                    if token.is_cancelled() {
                        return;
                    }
                    // The engine is shared process-wide: always stop before starting.
                    self.speech.stop();
                    let outcome = tokio::select! {
                        biased;
                        _ = token.cancelled() => return,
                        outcome = self.speech.speak(&content, &options) => outcome,
                    };

                    let mut state = self.state.lock().await;
                    if !state.owns(run_id) || token.is_cancelled() {
                        return;
                    }
                    if let Err(err) = outcome {
                        warn!(index, error = %err, "Narration failed; playback stopped.");
                        state.finish_run();
                        self.emit(PlaybackEvent::NarrationFailed {
                            index,
                            reason: err.to_string(),
                        });
                        return;
                    }
                    self.emit(PlaybackEvent::NarrationFinished { index });
                    match self.after_narration(&mut state, index, &content) {
                        Some(delay) => delay,
                        None => return,
                    }
                }
            };

            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let mut state = self.state.lock().await;
            if !state.owns(run_id) || token.is_cancelled() {
                return;
            }
            let next = state.current_page_index.map(|index| index + 1);
            match next {
                Some(next) if next < state.story.page_count() => {
                    self.move_to(&mut state, next);
                }
                _ => {
                    state.finish_run();
                    return;
                }
            }
        }
    }
}

/// Drives paginated, narrated reading of one story.
///
/// Dropping the controller cancels any narration, the same as `close()`.
pub struct StoryPlaybackController {
    shared: Arc<Shared>,
}

impl StoryPlaybackController {
    /// Opens a session over an already resolved story.
    pub fn new(
        story: Story,
        speech: Arc<dyn SpeechService>,
        options: PlaybackOptions,
    ) -> (Self, PlaybackReceiver) {
        let (events, receiver) = mpsc::unbounded_channel();
        let settings = PlaybackSettings::for_profile(&options.profile);
        info!(
            story_id = %story.id,
            pages = story.page_count(),
            "Opening playback session."
        );
        let state = SessionState::new(story, options.start_index, settings);
        let shared = Arc::new(Shared {
            state: Mutex::new(state),
            speech,
            events,
            session_token: CancellationToken::new(),
            profile: options.profile,
            voice: options.voice,
        });
        (Self { shared }, receiver)
    }

    /// Resolves `story_id` through the library and opens a session for it.
    ///
    /// A story that no longer exists opens as the "no content" state.
    pub async fn open(
        library: &dyn StoryLibrary,
        story_id: Uuid,
        speech: Arc<dyn SpeechService>,
        options: PlaybackOptions,
    ) -> PortResult<(Self, PlaybackReceiver)> {
        let story = match library.get_story(story_id).await {
            Ok(story) => story,
            Err(PortError::NotFound(what)) => {
                warn!(%story_id, "Story not found ({}); opening an empty session.", what);
                Story::empty(story_id)
            }
            Err(e) => return Err(e),
        };
        Ok(Self::new(story, speech, options))
    }

    pub async fn snapshot(&self) -> PlaybackSnapshot {
        self.shared.state.lock().await.snapshot()
    }

    /// Starts narrating the current page in autoplay mode.
    pub async fn play(&self) -> Result<(), PlaybackError> {
        let mut state = self.shared.state.lock().await;
        if state.is_closed() {
            return Err(PlaybackError::Closed);
        }
        if state.current_page_index.is_none() {
            return Err(PlaybackError::NoContent);
        }
        if state.is_playing() {
            return Ok(());
        }
        info!(page = ?state.current_page_index, "Playback started.");
        self.shared.start_run(&mut state);
        Ok(())
    }

    /// Stops narration and any pending page turn.
    pub async fn pause(&self) {
        let mut state = self.shared.state.lock().await;
        if state.is_closed() {
            return;
        }
        self.shared.halt(&mut state);
    }

    /// Flips between playing and paused. Returns whether the session is now playing.
    pub async fn toggle_play(&self) -> Result<bool, PlaybackError> {
        let playing = self.shared.state.lock().await.is_playing();
        if playing {
            self.pause().await;
            Ok(false)
        } else {
            self.play().await?;
            Ok(true)
        }
    }

    /// Moves one page forward. A no-op on the last page.
    pub async fn next_page(&self) -> bool {
        let mut state = self.shared.state.lock().await;
        let target = match state.current_page_index {
            Some(index) if !state.is_closed() && index + 1 < state.story.page_count() => index + 1,
            _ => return false,
        };
        self.shared.halt(&mut state);
        self.shared.move_to(&mut state, target)
    }

    /// Moves one page back. A no-op on the first page.
    pub async fn prev_page(&self) -> bool {
        let mut state = self.shared.state.lock().await;
        let target = match state.current_page_index {
            Some(index) if !state.is_closed() && index > 0 => index - 1,
            _ => return false,
        };
        self.shared.halt(&mut state);
        self.shared.move_to(&mut state, target)
    }

    /// Jumps to `page`, clamped to the last page. Always stops narration.
    /// Returns whether the current page changed.
    pub async fn go_to_page(&self, page: usize) -> bool {
        let mut state = self.shared.state.lock().await;
        let Some(last) = state.story.last_index() else {
            return false;
        };
        if state.is_closed() {
            return false;
        }
        self.shared.halt(&mut state);
        self.shared.move_to(&mut state, page.min(last))
    }

    /// Sets the reading speed, clamped to the profile's range. Returns the applied value.
    pub async fn set_reading_speed(&self, speed: f32) -> f32 {
        let mut state = self.shared.state.lock().await;
        self.shared.apply_speed(&mut state, speed)
    }

    pub async fn increase_reading_speed(&self) -> f32 {
        let mut state = self.shared.state.lock().await;
        let speed = step_speed(state.settings.reading_speed, true);
        self.shared.apply_speed(&mut state, speed)
    }

    pub async fn decrease_reading_speed(&self) -> f32 {
        let mut state = self.shared.state.lock().await;
        let speed = step_speed(state.settings.reading_speed, false);
        self.shared.apply_speed(&mut state, speed)
    }

    /// Turning auto page turn off cancels a pending page turn.
    pub async fn set_auto_page_turn(&self, enabled: bool) {
        let mut state = self.shared.state.lock().await;
        state.settings.auto_page_turn = enabled;
        if !enabled && state.phase == PlaybackPhase::WaitingToAdvance {
            self.shared.halt(&mut state);
        }
    }

    /// Sets the pause before a page turn, clamped to `[3, 10]` seconds.
    /// A page turn that is already pending keeps its original deadline.
    pub async fn set_auto_page_turn_delay(&self, secs: u32) -> u32 {
        let mut state = self.shared.state.lock().await;
        state.settings.auto_page_turn_delay_secs = clamp_delay(secs);
        state.settings.auto_page_turn_delay_secs
    }

    pub async fn increase_auto_page_turn_delay(&self) -> u32 {
        let current = self.shared.state.lock().await.settings.auto_page_turn_delay_secs;
        self.set_auto_page_turn_delay(current.saturating_add(1)).await
    }

    pub async fn decrease_auto_page_turn_delay(&self) -> u32 {
        let current = self.shared.state.lock().await.settings.auto_page_turn_delay_secs;
        self.set_auto_page_turn_delay(current.saturating_sub(1)).await
    }

    pub async fn set_volume(&self, volume: f32) -> f32 {
        let mut state = self.shared.state.lock().await;
        if volume.is_finite() {
            state.settings.volume = clamp_volume(volume);
        }
        state.settings.volume
    }

    /// Ends the session: cancels narration and pending page turns. Idempotent.
    pub async fn close(&self) {
        let mut state = self.shared.state.lock().await;
        if state.is_closed() {
            return;
        }
        self.shared.cancel_run(&mut state);
        self.shared.session_token.cancel();
        state.phase = PlaybackPhase::Closed;
        info!(story_id = %state.story.id, "Playback session closed.");
        self.shared.emit(PlaybackEvent::Closed);
    }
}

impl Drop for StoryPlaybackController {
    fn drop(&mut self) {
        self.shared.session_token.cancel();
        match self.shared.state.try_lock() {
            Ok(mut state) => {
                if !state.is_closed() {
                    self.shared.cancel_run(&mut state);
                    state.phase = PlaybackPhase::Closed;
                }
            }
            Err(_) => self.shared.speech.stop(),
        }
    }
}
