//! services/storybook/src/adapters/speech.rs
//!
//! This module contains a simulated speech engine. It implements the
//! `SpeechService` port without producing audio: each utterance is logged and
//! "lasts" as long as the text would take to read at the requested rate.

use async_trait::async_trait;
use std::time::Duration;
use storybook_core::ports::{PortError, PortResult, SpeechService};
use storybook_core::SpeechOptions;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info};

/// One utterance the engine was asked to speak.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub language: String,
    pub rate: f32,
    pub started_at: Instant,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A speech engine that narrates into the log instead of a speaker.
pub struct SimulatedSpeechAdapter {
    ms_per_char: u64,
    /// Bumped on every `stop` and every new utterance; an utterance that sees the
    /// generation move has been interrupted.
    generation: watch::Sender<u64>,
    transcript: std::sync::Mutex<Vec<Utterance>>,
}

impl SimulatedSpeechAdapter {
    /// Creates a new `SimulatedSpeechAdapter` speaking `ms_per_char` per character at rate 1.0.
    pub fn new(ms_per_char: u64) -> Self {
        Self {
            ms_per_char,
            generation: watch::channel(0).0,
            transcript: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// How long `text` takes at `rate`.
    pub fn utterance_duration(&self, text: &str, rate: f32) -> Duration {
        let chars = text.chars().count() as f64;
        let rate = f64::from(rate.max(0.1));
        Duration::from_millis((chars * self.ms_per_char as f64 / rate).round() as u64)
    }

    /// Every utterance started so far, oldest first.
    pub fn transcript(&self) -> Vec<Utterance> {
        self.transcript
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    fn bump(&self) -> u64 {
        self.generation.send_modify(|generation| *generation += 1);
        *self.generation.borrow()
    }
}

//=========================================================================================
// `SpeechService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SpeechService for SimulatedSpeechAdapter {
    async fn speak(&self, text: &str, options: &SpeechOptions) -> PortResult<()> {
        if options.language.trim().is_empty() {
            return Err(PortError::Unavailable("no voice for an empty language".to_string()));
        }

        // A new utterance interrupts whatever was speaking.
        let generation = self.bump();
        let mut observed = self.generation.subscribe();
        let duration = self.utterance_duration(text, options.rate);

        if let Ok(mut log) = self.transcript.lock() {
            log.push(Utterance {
                text: text.to_string(),
                language: options.language.clone(),
                rate: options.rate,
                started_at: Instant::now(),
            });
        }
        info!(language = %options.language, rate = options.rate, "🔊 {}", text);

        let sleep = tokio::time::sleep(duration);
        tokio::pin!(sleep);
        loop {
            let current = *observed.borrow_and_update();
            if current != generation {
                debug!("Utterance interrupted.");
                return Err(PortError::Interrupted);
            }
            tokio::select! {
                _ = &mut sleep => return Ok(()),
                changed = observed.changed() => {
                    if changed.is_err() {
                        return Err(PortError::Interrupted);
                    }
                }
            }
        }
    }

    fn stop(&self) {
        self.bump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn options(rate: f32) -> SpeechOptions {
        SpeechOptions {
            rate,
            ..SpeechOptions::default()
        }
    }

    #[test]
    fn duration_scales_with_length_and_rate() {
        let engine = SimulatedSpeechAdapter::new(200);
        assert_eq!(
            engine.utterance_duration("あいう", 1.0),
            Duration::from_millis(600)
        );
        assert_eq!(
            engine.utterance_duration("あいう", 2.0),
            Duration::from_millis(300)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn completes_after_the_simulated_duration() {
        let engine = SimulatedSpeechAdapter::new(100);
        let start = Instant::now();
        engine.speak("abcde", &options(1.0)).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(500));
        assert_eq!(engine.transcript().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_interrupts_the_current_utterance() {
        let engine = Arc::new(SimulatedSpeechAdapter::new(1000));
        let speaking = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.speak("long text", &options(1.0)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        engine.stop();
        assert_eq!(speaking.await.unwrap(), Err(PortError::Interrupted));
        // Idempotent when nothing is speaking.
        engine.stop();
    }

    #[tokio::test]
    async fn empty_language_is_unavailable() {
        let engine = SimulatedSpeechAdapter::new(1);
        let options = SpeechOptions {
            language: String::new(),
            ..SpeechOptions::default()
        };
        assert!(matches!(
            engine.speak("hi", &options).await,
            Err(PortError::Unavailable(_))
        ));
    }
}
