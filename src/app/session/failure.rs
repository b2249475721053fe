//! Login failure tracking and cooldown policy
//!
//! Each consecutive failed login for a connection extends the lockout window
//! by five minutes, up to thirty. A success removes the record entirely.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::app::session::ConnectionKey;
use crate::constants::auth;
use crate::errors::{AuthError, AuthResult};

/// Consecutive failures for one connection key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailureRecord {
    pub count: u32,
    pub last_attempt: DateTime<Utc>,
}

impl FailureRecord {
    /// Cooldown window in minutes: `min(count * 5, 30)`
    pub fn cooldown_minutes(&self) -> i64 {
        (i64::from(self.count) * auth::COOLDOWN_STEP_MINUTES).min(auth::MAX_COOLDOWN_MINUTES)
    }

    /// Time left in the cooldown window, `None` once it has elapsed
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        let window = Duration::minutes(self.cooldown_minutes());
        let elapsed = now - self.last_attempt;
        (elapsed < window).then(|| window - elapsed)
    }

    /// Time left in whole minutes, rounded up
    pub fn remaining_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        self.remaining(now)
            .map(|left| (left.num_seconds() + 59).div_euclid(60).max(1))
    }
}

/// Failure table shared by every pooled client
#[derive(Debug, Default)]
pub struct FailureTracker {
    records: RwLock<HashMap<ConnectionKey, FailureRecord>>,
}

impl FailureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail fast if `key` is inside its cooldown window
    ///
    /// # Errors
    ///
    /// Returns `AuthError::CooldownActive` with the remaining minutes
    pub async fn check(&self, key: &ConnectionKey, now: DateTime<Utc>) -> AuthResult<()> {
        let records = self.records.read().await;
        let Some(record) = records.get(key) else {
            return Ok(());
        };

        match record.remaining_minutes(now) {
            Some(remaining_minutes) => Err(AuthError::CooldownActive {
                remaining_minutes,
                failures: record.count,
            }),
            None => Ok(()),
        }
    }

    /// Count one more failure at `now`
    pub async fn record_failure(&self, key: &ConnectionKey, now: DateTime<Utc>) -> FailureRecord {
        let mut records = self.records.write().await;
        let record = records.entry(key.clone()).or_insert(FailureRecord {
            count: 0,
            last_attempt: now,
        });
        record.count += 1;
        record.last_attempt = now;
        *record
    }

    /// Forget failures for `key`
    pub async fn clear(&self, key: &ConnectionKey) -> bool {
        self.records.write().await.remove(key).is_some()
    }

    pub async fn get(&self, key: &ConnectionKey) -> Option<FailureRecord> {
        self.records.read().await.get(key).copied()
    }

    pub async fn clear_all(&self) {
        self.records.write().await.clear();
    }
}
