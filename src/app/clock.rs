//! Time source abstraction
//!
//! Cache TTLs, the auto-refresh threshold, session leases, and login
//! cooldowns all compare against [`Clock::now`], so tests can drive those
//! boundaries with a manual clock instead of sleeping.

use std::fmt::Debug;
use std::sync::Arc;

use chrono::{DateTime, Utc};

/// Source of the current wall-clock time
pub trait Clock: Send + Sync + Debug {
    /// Current time
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Shared clock handle
pub type SharedClock = Arc<dyn Clock>;

/// Shared handle to the system clock
pub fn system_clock() -> SharedClock {
    Arc::new(SystemClock)
}

/// Convert a std duration to a chrono duration, saturating on overflow
pub fn chrono_duration(duration: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_system_clock_advances() {
        let clock = system_clock();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }

    #[test]
    fn test_chrono_duration_conversion() {
        assert_eq!(
            chrono_duration(Duration::from_secs(90)),
            chrono::Duration::seconds(90)
        );
        assert_eq!(chrono_duration(Duration::MAX), chrono::Duration::MAX);
    }
}
