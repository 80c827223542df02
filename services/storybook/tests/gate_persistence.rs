//! The parental unlock survives a restart through the file store, and only for its window.

use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::sync::{Arc, Mutex};
use storybook_core::ports::{Clock, KeyValueStore};
use storybook_lib::adapters::FileKeyValueStore;
use storybook_lib::gate::{GateError, ParentalGate, PARENTAL_LOCK_KEY};
use tempfile::TempDir;

struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

async fn restart(path: &Path, clock: Arc<ManualClock>) -> ParentalGate {
    ParentalGate::load_with_rng(
        Arc::new(FileKeyValueStore::new(path)),
        clock,
        StdRng::seed_from_u64(7),
    )
    .await
}

#[tokio::test]
async fn unlock_persists_across_restarts_until_the_window_closes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kv_store.json");
    let clock = ManualClock::at(Utc.timestamp_opt(1_700_000_000, 0).unwrap());

    let gate = restart(&path, clock.clone()).await;
    assert!(!gate.request_access().await);
    assert!(gate.is_prompt_visible().await);
    assert_eq!(
        gate.submit_answer("not a number").await,
        Err(GateError::InvalidInput)
    );
    assert_eq!(gate.attempts().await, 0);

    let challenge = gate.begin_challenge().await;
    let unlocked = gate
        .submit_answer(&challenge.correct_answer.to_string())
        .await
        .unwrap();
    assert_eq!(unlocked.until - clock.now(), Duration::seconds(1800));
    drop(gate);

    clock.advance(Duration::seconds(1799));
    let gate = restart(&path, clock.clone()).await;
    assert!(gate.check_access().await);
    drop(gate);

    clock.advance(Duration::seconds(1));
    let gate = restart(&path, clock.clone()).await;
    assert!(!gate.check_access().await);
    let store = FileKeyValueStore::new(&path);
    assert_eq!(store.get(PARENTAL_LOCK_KEY).await.unwrap(), None);
}

#[tokio::test]
async fn lock_is_durable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kv_store.json");
    let clock = ManualClock::at(Utc.timestamp_opt(1_700_000_000, 0).unwrap());

    let gate = restart(&path, clock.clone()).await;
    let challenge = gate.begin_challenge().await;
    gate.submit_answer(&challenge.correct_answer.to_string())
        .await
        .unwrap();
    gate.lock().await;
    assert!(!gate.check_access().await);

    let gate = restart(&path, clock).await;
    assert!(!gate.check_access().await);
}

#[tokio::test]
async fn record_uses_the_millisecond_timestamp_format() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("kv_store.json");
    let clock = ManualClock::at(Utc.timestamp_opt(1_700_000_000, 0).unwrap());

    let gate = restart(&path, clock).await;
    let challenge = gate.begin_challenge().await;
    gate.submit_answer(&challenge.correct_answer.to_string())
        .await
        .unwrap();

    let raw = FileKeyValueStore::new(&path)
        .get(PARENTAL_LOCK_KEY)
        .await
        .unwrap()
        .unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["timestamp"], serde_json::json!(1_700_000_000_000i64));
}
