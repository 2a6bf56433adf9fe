//! Injected time source
//!
//! All validity checks and fetch timestamps go through a `Clock` so tests can
//! freeze or advance time without sleeping.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Supplies the current time as Unix seconds.
pub trait Clock: Send + Sync {
    fn now_unix(&self) -> f64;
}

/// Wall-clock time from the system.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> f64 {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs_f64(),
            // Pre-epoch system time; treat as epoch rather than panicking
            Err(_) => 0.0,
        }
    }
}

/// Manually driven clock with millisecond resolution.
#[derive(Default)]
pub struct FixedClock {
    millis: AtomicU64,
}

impl FixedClock {
    pub fn at(seconds: f64) -> Arc<Self> {
        let clock = Arc::new(Self::default());
        clock.set(seconds);
        clock
    }

    pub fn set(&self, seconds: f64) {
        self.millis.store((seconds * 1000.0) as u64, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_unix(&self) -> f64 {
        self.millis.load(Ordering::SeqCst) as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_reports_what_was_set() {
        let clock = FixedClock::at(100.5);
        assert_eq!(clock.now_unix(), 100.5);
        clock.set(200.0);
        assert_eq!(clock.now_unix(), 200.0);
    }

    #[test]
    fn system_clock_is_past_2020() {
        assert!(SystemClock.now_unix() > 1_577_836_800.0);
    }
}
