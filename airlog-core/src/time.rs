//! Time sources
//!
//! Log rows carry wall-clock Unix time as floating-point seconds. Sample and
//! row timestamps are taken through [`TimeSource`] so tests can pin them:
//! - [`SystemTime`] for deployment
//! - [`FixedTime`] for deterministic tests

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unix epoch time in seconds
pub type Timestamp = f64;

/// Source of wall-clock time
pub trait TimeSource: Send + Sync {
    /// Current time in seconds since the Unix epoch
    fn now(&self) -> Timestamp;
}

/// System clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTime;

impl TimeSource for SystemTime {
    fn now(&self) -> Timestamp {
        use std::time::{SystemTime as StdSystemTime, UNIX_EPOCH};

        // A clock set before 1970 reads as the epoch rather than failing
        StdSystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
    }
}

/// Settable time source for testing
///
/// Clones share the same instant, so a test can keep a handle and advance
/// the clock seen by a pipeline it handed another clone to.
#[derive(Debug, Clone)]
pub struct FixedTime {
    bits: Arc<AtomicU64>,
}

impl FixedTime {
    /// Clock frozen at `timestamp`
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(timestamp.to_bits())),
        }
    }

    /// Jump to `timestamp`
    pub fn set(&self, timestamp: Timestamp) {
        self.bits.store(timestamp.to_bits(), Ordering::Release);
    }

    /// Move forward by `seconds`
    pub fn advance(&self, seconds: f64) {
        self.set(self.now() + seconds);
    }
}

impl TimeSource for FixedTime {
    fn now(&self) -> Timestamp {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_time_advances() {
        let time = FixedTime::new(1000.0);
        assert_eq!(time.now(), 1000.0);

        time.advance(0.5);
        assert_eq!(time.now(), 1000.5);
    }

    #[test]
    fn fixed_time_clones_share_instant() {
        let time = FixedTime::new(1.0);
        let handle = time.clone();
        handle.set(42.0);
        assert_eq!(time.now(), 42.0);
    }

    #[test]
    fn system_time_is_after_2020() {
        assert!(SystemTime.now() > 1_577_836_800.0);
    }
}
