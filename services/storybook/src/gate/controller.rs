//! services/storybook/src/gate/controller.rs
//!
//! The parental gate: arithmetic challenge, bounded attempts, and a persisted
//! 30-minute unlock window.
//!
//! Every storage failure is treated as "locked".

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use storybook_core::{Clock, KeyValueStore, UnlockRecord};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use super::challenge::{generate_challenge, Challenge};
use super::record::{self, PARENTAL_LOCK_KEY};

/// Wrong answers allowed before the challenge session locks out.
pub const MAX_ATTEMPTS: u32 = 3;

/// A successful challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unlocked {
    pub until: DateTime<Utc>,
}

/// Why an answer did not unlock the gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("Please enter a number")]
    InvalidInput,
    #[error("Wrong answer, {remaining_attempts} attempts left")]
    WrongAnswer { remaining_attempts: u32 },
    #[error("Too many wrong answers; dismiss the gate and try again later")]
    LockedOut,
    #[error("No challenge is open")]
    NoActiveChallenge,
    #[error("The unlock could not be saved")]
    StorageUnavailable,
}

/// One opening of the challenge modal.
struct ChallengeSession {
    challenge: Challenge,
    attempts: u32,
    locked_out: bool,
}

struct GateState {
    rng: StdRng,
    session: Option<ChallengeSession>,
    /// Set by `lock()` so a failed removal can never leave access open.
    force_locked: bool,
    unlocked_until: Option<DateTime<Utc>>,
}

/// Gates parent-only views behind a locally generated arithmetic question.
pub struct ParentalGate {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<GateState>,
}

impl ParentalGate {
    /// Creates the gate and reads the persisted unlock once, discarding it if stale.
    pub async fn load(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self::load_with_rng(store, clock, StdRng::from_entropy()).await
    }

    pub async fn load_with_rng(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        rng: StdRng,
    ) -> Self {
        let gate = Self {
            store,
            clock,
            state: Mutex::new(GateState {
                rng,
                session: None,
                force_locked: false,
                unlocked_until: None,
            }),
        };
        let until = gate.read_unlock().await;
        match until {
            Some(until) => info!(%until, "Parental access is unlocked."),
            None => info!("Parental access is locked."),
        }
        gate.state.lock().await.unlocked_until = until;
        gate
    }

    /// Reads the stored record and returns its expiry if still valid.
    /// Stale or unreadable records are removed.
    async fn read_unlock(&self) -> Option<DateTime<Utc>> {
        let raw = match self.store.get(PARENTAL_LOCK_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!("Error checking parental lock status: {}", e);
                return None;
            }
        };

        let now = self.clock.now();
        match record::decode(&raw) {
            Ok(unlock) if unlock.is_valid_at(now) => unlock.unlocked_until(),
            Ok(unlock) => {
                info!(expired_at = ?unlock.unlocked_until(), "Parental unlock expired.");
                self.discard_record().await;
                None
            }
            Err(e) => {
                warn!("Unreadable parental lock record discarded: {}", e);
                self.discard_record().await;
                None
            }
        }
    }

    async fn discard_record(&self) {
        if let Err(e) = self.store.remove(PARENTAL_LOCK_KEY).await {
            error!("Error removing parental lock record: {}", e);
        }
    }

    /// True iff a successful unlock is stored and `now < unlocked_until`.
    pub async fn check_access(&self) -> bool {
        if self.state.lock().await.force_locked {
            return false;
        }
        let until = self.read_unlock().await;
        let mut state = self.state.lock().await;
        if state.force_locked {
            return false;
        }
        state.unlocked_until = until;
        until.is_some()
    }

    /// Returns true when access is open; otherwise opens a challenge and returns false.
    pub async fn request_access(&self) -> bool {
        if self.check_access().await {
            return true;
        }
        self.begin_challenge().await;
        false
    }

    /// Opens a fresh challenge session with zero attempts.
    pub async fn begin_challenge(&self) -> Challenge {
        let mut state = self.state.lock().await;
        let challenge = generate_challenge(&mut state.rng);
        Self::open_session(&mut state, challenge.clone());
        challenge
    }

    fn open_session(state: &mut GateState, challenge: Challenge) {
        state.session = Some(ChallengeSession {
            challenge,
            attempts: 0,
            locked_out: false,
        });
    }

    #[cfg(test)]
    pub(crate) async fn begin_challenge_with(&self, challenge: Challenge) {
        let mut state = self.state.lock().await;
        Self::open_session(&mut state, challenge);
    }

    /// Closes the challenge modal without unlocking.
    pub async fn dismiss(&self) {
        self.state.lock().await.session = None;
    }

    pub async fn is_prompt_visible(&self) -> bool {
        self.state.lock().await.session.is_some()
    }

    /// The question to display, when a challenge is open.
    pub async fn question(&self) -> Option<String> {
        let state = self.state.lock().await;
        state
            .session
            .as_ref()
            .map(|session| session.challenge.question.clone())
    }

    pub async fn attempts(&self) -> u32 {
        let state = self.state.lock().await;
        state.session.as_ref().map_or(0, |session| session.attempts)
    }

    /// Expiry of the unlock as of the last access check.
    pub async fn unlocked_until(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.unlocked_until
    }

    /// Checks an answer to the open challenge.
    pub async fn submit_answer(&self, input: &str) -> Result<Unlocked, GateError> {
        let mut state = self.state.lock().await;
        let Some(session) = state.session.as_mut() else {
            return Err(GateError::NoActiveChallenge);
        };
        if session.locked_out {
            return Err(GateError::LockedOut);
        }
        let answer = input
            .trim()
            .parse::<i32>()
            .map_err(|_| GateError::InvalidInput)?;

        if answer == session.challenge.correct_answer {
            let unlock = UnlockRecord::new(self.clock.now());
            let Some(until) = unlock.unlocked_until() else {
                error!("Clock is past the last representable unlock window.");
                return Err(GateError::StorageUnavailable);
            };
            let persisted = match record::encode(&unlock) {
                Ok(raw) => self.store.set(PARENTAL_LOCK_KEY, &raw).await,
                Err(e) => Err(e),
            };
            if let Err(e) = persisted {
                error!("Error saving parental lock status: {}", e);
                return Err(GateError::StorageUnavailable);
            }
            state.session = None;
            state.force_locked = false;
            state.unlocked_until = Some(until);
            info!(%until, "Parental gate unlocked.");
            return Ok(Unlocked { until });
        }

        session.attempts += 1;
        if session.attempts >= MAX_ATTEMPTS {
            session.attempts = 0;
            session.locked_out = true;
            warn!("Parental gate locked out after {} wrong answers.", MAX_ATTEMPTS);
            return Err(GateError::LockedOut);
        }
        let remaining_attempts = MAX_ATTEMPTS - session.attempts;
        let challenge = generate_challenge(&mut state.rng);
        if let Some(session) = state.session.as_mut() {
            session.challenge = challenge;
        }
        Err(GateError::WrongAnswer { remaining_attempts })
    }

    /// Re-locks immediately, whatever the remaining window.
    pub async fn lock(&self) {
        let mut state = self.state.lock().await;
        state.force_locked = true;
        state.unlocked_until = None;
        if let Err(e) = self.store.remove(PARENTAL_LOCK_KEY).await {
            error!("Error locking parental access: {}", e);
        }
        info!("Parental access locked.");
    }
}
