//! services/storybook/src/adapters/clock.rs

use chrono::{DateTime, Utc};
use storybook_core::ports::Clock;

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
