//! Idle detector contract and the in-process implementations.
//!
//! The machine asks "how long has the user been idle?" at most once a second
//! and never blocks on the answer. Platform sensors implement
//! [`IdleDetector`] outside this crate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::Instant;

use crate::error::IdleError;

pub trait IdleDetector: Send {
    /// Seconds since the last user input.
    fn idle_seconds(&self) -> Result<u64, IdleError>;
}

impl<F> IdleDetector for F
where
    F: Fn() -> Result<u64, IdleError> + Send,
{
    fn idle_seconds(&self) -> Result<u64, IdleError> {
        self()
    }
}

/// Idle time measured from the last [`ActivityClock::record_activity`].
///
/// Clones share the same clock, so an input listener can hold one clone
/// while the session holds another.
#[derive(Debug, Clone)]
pub struct ActivityClock {
    last_activity: Arc<Mutex<Instant>>,
}

impl ActivityClock {
    pub fn new() -> Self {
        Self {
            last_activity: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn record_activity(&self) {
        let mut last = self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *last = Instant::now();
    }
}

impl Default for ActivityClock {
    fn default() -> Self {
        Self::new()
    }
}

impl IdleDetector for ActivityClock {
    fn idle_seconds(&self) -> Result<u64, IdleError> {
        let last = *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(last.elapsed().as_secs())
    }
}

/// An idle value set from outside. Clones share the value.
#[derive(Debug, Clone, Default)]
pub struct FixedIdle {
    secs: Arc<AtomicU64>,
}

impl FixedIdle {
    pub fn new(secs: u64) -> Self {
        Self {
            secs: Arc::new(AtomicU64::new(secs)),
        }
    }

    pub fn set(&self, secs: u64) {
        self.secs.store(secs, Ordering::Relaxed);
    }
}

impl IdleDetector for FixedIdle {
    fn idle_seconds(&self) -> Result<u64, IdleError> {
        Ok(self.secs.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn activity_clock_measures_time_since_input() {
        let clock = ActivityClock::new();
        let listener = clock.clone();

        tokio::time::advance(Duration::from_secs(42)).await;
        assert_eq!(clock.idle_seconds().unwrap(), 42);

        listener.record_activity();
        assert_eq!(clock.idle_seconds().unwrap(), 0);
    }

    #[test]
    fn fixed_idle_is_shared_between_clones() {
        let idle = FixedIdle::new(5);
        let handle = idle.clone();
        handle.set(400);
        assert_eq!(idle.idle_seconds().unwrap(), 400);
    }

    #[test]
    fn closures_are_detectors() {
        let failing =
            || -> Result<u64, IdleError> { Err(IdleError::Unavailable("no display".into())) };
        assert!(failing.idle_seconds().is_err());
    }
}
