//! services/storybook/src/gate/record.rs
//!
//! The stored form of the parental unlock: `{"timestamp": <unix millis>}`.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use storybook_core::{PortError, PortResult, UnlockRecord};

/// The fixed key the unlock record lives under.
pub const PARENTAL_LOCK_KEY: &str = "parental_lock_status";

#[derive(Serialize, Deserialize)]
struct StoredUnlock {
    timestamp: i64,
}

pub fn encode(record: &UnlockRecord) -> PortResult<String> {
    let stored = StoredUnlock {
        timestamp: record.unlocked_at.timestamp_millis(),
    };
    serde_json::to_string(&stored).map_err(|e| PortError::Unexpected(e.to_string()))
}

pub fn decode(raw: &str) -> PortResult<UnlockRecord> {
    let stored: StoredUnlock =
        serde_json::from_str(raw).map_err(|e| PortError::Unexpected(e.to_string()))?;
    let unlocked_at = Utc
        .timestamp_millis_opt(stored.timestamp)
        .single()
        .ok_or_else(|| PortError::Unexpected(format!("timestamp {} out of range", stored.timestamp)))?;
    let record = UnlockRecord::new(unlocked_at);
    if record.unlocked_until().is_none() {
        return Err(PortError::Unexpected(format!(
            "timestamp {} leaves no room for the unlock window",
            stored.timestamp
        )));
    }
    Ok(record)
}
