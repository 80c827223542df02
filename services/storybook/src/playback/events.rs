//! services/storybook/src/playback/events.rs
//!
//! Notifications a playback session publishes to its UI caller.

use std::time::Duration;
use tokio::time::Instant;

/// Something observable that happened in a playback session.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    /// The current page moved, either manually or by auto-advance.
    PageChanged { index: usize },

    /// Narration of a page was handed to the speech engine.
    NarrationStarted { index: usize },

    /// The page had no speakable text, so nothing was sent to the engine.
    NarrationSkipped { index: usize },

    /// The speech engine reported the page's utterance as done.
    NarrationFinished { index: usize },

    /// The speech engine failed. The session is back to idle and can be retried.
    NarrationFailed { index: usize, reason: String },

    /// The page will turn after `delay` unless the user intervenes.
    AdvanceScheduled { from: usize, delay: Duration },

    /// Narration of the last page finished while playing. Reported once per run.
    EndOfStory,

    /// Playback stopped because the user paused, navigated, or changed a setting.
    Paused,

    /// The session was closed; no further events follow.
    Closed,
}

/// A `PlaybackEvent` stamped with the (tokio) instant it happened.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackNotice {
    pub at: Instant,
    pub event: PlaybackEvent,
}
