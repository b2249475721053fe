//! Manually advanced clock for TTL and cooldown tests.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::app::clock::{chrono_duration, Clock};

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// A clock frozen at 2024-03-01 09:00:00 UTC.
    pub fn at_epoch() -> Self {
        Self::new(epoch())
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = *now + chrono_duration(by);
    }

    pub fn advance_minutes(&self, minutes: i64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = *now + chrono::Duration::minutes(minutes);
    }

    pub fn advance_seconds(&self, seconds: i64) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = *now + chrono::Duration::seconds(seconds);
    }

    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::at_epoch()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Fixed starting instant used across tests.
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}
