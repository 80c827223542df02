//! services/storybook/src/playback/settings.rs
//!
//! Playback settings, their clamping rules, and the two auto-advance timing models.

use std::time::Duration;

/// Speed choices offered by the voice controls.
pub const SPEED_PRESETS: [f32; 5] = [0.5, 0.75, 1.0, 1.25, 1.5];

pub const MIN_AUTO_PAGE_TURN_DELAY_SECS: u32 = 3;
pub const MAX_AUTO_PAGE_TURN_DELAY_SECS: u32 = 10;

const SPEED_STEP: f32 = 0.1;
const MIN_READING_TIME_MS: f64 = 3000.0;
const READING_MS_PER_CHAR: f64 = 200.0;

/// How long to wait after a page's narration completes before turning the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceTiming {
    /// Wait exactly `auto_page_turn_delay_secs`, whatever the page length.
    FixedDelay,
    /// Wait `max(3000 ms, chars * 200 ms / speed)` plus `auto_page_turn_delay_secs`.
    ReadingTime,
}

impl AdvanceTiming {
    pub fn advance_delay(self, content: &str, reading_speed: f32, delay_secs: u32) -> Duration {
        let pause = Duration::from_secs(u64::from(delay_secs));
        match self {
            AdvanceTiming::FixedDelay => pause,
            AdvanceTiming::ReadingTime => {
                let chars = content.chars().count() as f64;
                let reading_ms =
                    (chars * READING_MS_PER_CHAR / f64::from(reading_speed)).max(MIN_READING_TIME_MS);
                Duration::from_millis(reading_ms.round() as u64) + pause
            }
        }
    }
}

/// Per-surface reading behaviour: one consistent timing model and its speed domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReaderProfile {
    pub timing: AdvanceTiming,
    pub min_speed: f32,
    pub max_speed: f32,
    pub default_speed: f32,
    pub default_delay_secs: u32,
    pub default_auto_page_turn: bool,
}

impl ReaderProfile {
    /// The full story player: length-proportional timing, speed in `[0.5, 1.5]`.
    pub fn player() -> Self {
        Self {
            timing: AdvanceTiming::ReadingTime,
            min_speed: 0.5,
            max_speed: 1.5,
            default_speed: 0.8,
            default_delay_secs: 5,
            default_auto_page_turn: true,
        }
    }

    /// The swipeable story viewer: fixed delay, speed in `[0.5, 2.0]`.
    pub fn viewer() -> Self {
        Self {
            timing: AdvanceTiming::FixedDelay,
            min_speed: 0.5,
            max_speed: 2.0,
            default_speed: 1.0,
            default_delay_secs: 3,
            default_auto_page_turn: false,
        }
    }

    pub fn clamp_speed(&self, speed: f32) -> f32 {
        speed.clamp(self.min_speed, self.max_speed)
    }
}

impl Default for ReaderProfile {
    fn default() -> Self {
        Self::player()
    }
}

/// The user-adjustable settings of one playback session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackSettings {
    pub reading_speed: f32,
    pub auto_page_turn: bool,
    pub auto_page_turn_delay_secs: u32,
    /// Stored for the UI only, never handed to the speech engine.
    pub volume: f32,
}

impl PlaybackSettings {
    pub fn for_profile(profile: &ReaderProfile) -> Self {
        Self {
            reading_speed: profile.clamp_speed(profile.default_speed),
            auto_page_turn: profile.default_auto_page_turn,
            auto_page_turn_delay_secs: clamp_delay(profile.default_delay_secs),
            volume: 1.0,
        }
    }
}

pub fn clamp_delay(secs: u32) -> u32 {
    secs.clamp(MIN_AUTO_PAGE_TURN_DELAY_SECS, MAX_AUTO_PAGE_TURN_DELAY_SECS)
}

pub fn clamp_volume(volume: f32) -> f32 {
    volume.clamp(0.0, 1.0)
}

/// One speed step up or down, rounded to a single decimal so repeated steps do not drift.
pub fn step_speed(speed: f32, up: bool) -> f32 {
    let next = if up { speed + SPEED_STEP } else { speed - SPEED_STEP };
    (next * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_delay_ignores_text_length() {
        let timing = AdvanceTiming::FixedDelay;
        assert_eq!(timing.advance_delay("", 1.0, 3), Duration::from_secs(3));
        assert_eq!(
            timing.advance_delay(&"あ".repeat(500), 0.5, 7),
            Duration::from_secs(7)
        );
    }

    #[test]
    fn reading_time_has_a_three_second_floor() {
        let timing = AdvanceTiming::ReadingTime;
        // 5 chars * 200ms = 1000ms, below the floor.
        assert_eq!(
            timing.advance_delay("こんにちは", 1.0, 5),
            Duration::from_millis(3000 + 5000)
        );
    }

    #[test]
    fn reading_time_scales_with_length_and_speed() {
        let timing = AdvanceTiming::ReadingTime;
        let text = "あ".repeat(20);
        // 20 * 200 / 0.8 = 5000ms
        assert_eq!(
            timing.advance_delay(&text, 0.8, 3),
            Duration::from_millis(5000 + 3000)
        );
        // 20 * 200 / 0.5 = 8000ms
        assert_eq!(
            timing.advance_delay(&text, 0.5, 3),
            Duration::from_millis(8000 + 3000)
        );
    }

    #[test]
    fn profiles_clamp_speed_to_their_own_domain() {
        assert_eq!(ReaderProfile::player().clamp_speed(2.0), 1.5);
        assert_eq!(ReaderProfile::viewer().clamp_speed(2.0), 2.0);
        assert_eq!(ReaderProfile::viewer().clamp_speed(0.1), 0.5);
    }

    #[test]
    fn delay_and_volume_are_clamped() {
        assert_eq!(clamp_delay(0), 3);
        assert_eq!(clamp_delay(6), 6);
        assert_eq!(clamp_delay(60), 10);
        assert_eq!(clamp_volume(-0.5), 0.0);
        assert_eq!(clamp_volume(1.7), 1.0);
    }

    #[test]
    fn speed_steps_round_to_one_decimal() {
        assert_eq!(step_speed(0.8, true), 0.9);
        assert_eq!(step_speed(0.9, true), 1.0);
        assert_eq!(step_speed(0.6, false), 0.5);
    }

    #[test]
    fn default_settings_follow_the_profile() {
        let player = PlaybackSettings::for_profile(&ReaderProfile::player());
        assert_eq!(player.reading_speed, 0.8);
        assert_eq!(player.auto_page_turn_delay_secs, 5);
        assert!(player.auto_page_turn);

        let viewer = PlaybackSettings::for_profile(&ReaderProfile::viewer());
        assert_eq!(viewer.reading_speed, 1.0);
        assert_eq!(viewer.auto_page_turn_delay_secs, 3);
        assert!(!viewer.auto_page_turn);
    }
}
