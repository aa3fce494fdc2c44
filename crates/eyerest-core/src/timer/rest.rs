//! Countdown for one rest interval.
//!
//! The session owns the clock: it calls [`RestSession::tick`] once a second
//! and passes the current instant to [`RestSession::extend`]. Nothing here
//! sleeps or spawns.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::error::RestError;

/// Seconds added by one extension.
pub const EXTEND_STEP_SECS: u64 = 60;

/// Remaining seconds at which the pre-completion cue fires.
pub const CUE_AT_SECS: u64 = 10;

/// Phrase that unlocks a rest early when early unlock is allowed.
pub const UNLOCK_PHRASE: &str = "123456789123456789123456789";

/// What the overlay shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestDisplay {
    pub remaining_minutes: u64,
    pub remaining_seconds: u64,
    pub remaining_display: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session is not running; nothing changed.
    Inactive,
    Running { remaining: u64 },
    /// Same as `Running`, and the one-shot cue should play now.
    Cue { remaining: u64 },
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendOutcome {
    Extended { remaining: u64 },
    TryLater { retry_in: Duration },
    NotActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestEnd {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct RestSession {
    total_seconds: u64,
    remaining_seconds: u64,
    last_extend_at: Option<Instant>,
    is_active: bool,
    cooldown: Duration,
    cue_at: Option<u64>,
    cue_fired: bool,
}

impl RestSession {
    /// A session that has not started yet.
    ///
    /// `cue` enables the pre-completion cue at [`CUE_AT_SECS`].
    pub fn new(cooldown: Duration, cue: bool) -> Self {
        Self {
            total_seconds: 0,
            remaining_seconds: 0,
            last_extend_at: None,
            is_active: false,
            cooldown,
            cue_at: cue.then_some(CUE_AT_SECS),
            cue_fired: false,
        }
    }

    pub fn start(&mut self, total_seconds: u64) -> RestDisplay {
        self.total_seconds = total_seconds;
        self.remaining_seconds = total_seconds;
        self.last_extend_at = None;
        self.cue_fired = false;
        self.is_active = true;
        self.display()
    }

    /// Advance by one second.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_active {
            return TickOutcome::Inactive;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds == 0 {
            self.is_active = false;
            return TickOutcome::Completed;
        }

        let remaining = self.remaining_seconds;
        if !self.cue_fired && self.cue_at == Some(remaining) {
            self.cue_fired = true;
            return TickOutcome::Cue { remaining };
        }
        TickOutcome::Running { remaining }
    }

    /// Add [`EXTEND_STEP_SECS`] unless the last extension was less than the
    /// cooldown ago.
    pub fn extend(&mut self, now: Instant) -> ExtendOutcome {
        if !self.is_active {
            return ExtendOutcome::NotActive;
        }

        if let Some(last) = self.last_extend_at {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.cooldown {
                return ExtendOutcome::TryLater {
                    retry_in: self.cooldown - elapsed,
                };
            }
        }

        self.remaining_seconds += EXTEND_STEP_SECS;
        self.total_seconds += EXTEND_STEP_SECS;
        self.last_extend_at = Some(now);
        ExtendOutcome::Extended {
            remaining: self.remaining_seconds,
        }
    }

    /// Early-unlock gate. Does not stop the session by itself.
    pub fn unlock(&self, phrase: &str, allowed: bool) -> Result<(), RestError> {
        if !self.is_active {
            return Err(RestError::NotActive);
        }
        if !allowed {
            return Err(RestError::NotAllowed);
        }
        if phrase.trim() != UNLOCK_PHRASE {
            return Err(RestError::WrongPhrase);
        }
        Ok(())
    }

    pub fn cancel(&mut self, early: bool) -> RestEnd {
        self.is_active = false;
        if early {
            RestEnd::Cancelled
        } else {
            RestEnd::Completed
        }
    }

    pub fn display(&self) -> RestDisplay {
        let minutes = self.remaining_seconds / 60;
        let seconds = self.remaining_seconds % 60;
        RestDisplay {
            remaining_minutes: minutes,
            remaining_seconds: seconds,
            remaining_display: format!("{minutes:02}:{seconds:02}"),
            is_active: self.is_active,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    pub fn cue_fired(&self) -> bool {
        self.cue_fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(total: u64) -> RestSession {
        let mut rest = RestSession::new(Duration::from_millis(100), true);
        rest.start(total);
        rest
    }

    #[test]
    fn start_shows_full_duration() {
        let mut rest = RestSession::new(Duration::from_millis(100), false);
        let display = rest.start(90);
        assert_eq!(display.remaining_display, "01:30");
        assert_eq!(display.remaining_minutes, 1);
        assert_eq!(display.remaining_seconds, 30);
        assert!(display.is_active);
    }

    #[test]
    fn completes_after_total_ticks() {
        let mut rest = started(60);
        for _ in 0..59 {
            assert!(matches!(
                rest.tick(),
                TickOutcome::Running { .. } | TickOutcome::Cue { .. }
            ));
        }
        assert_eq!(rest.tick(), TickOutcome::Completed);
        assert!(!rest.is_active());
        assert_eq!(rest.tick(), TickOutcome::Inactive);
    }

    #[test]
    fn cue_fires_once_at_threshold() {
        let mut rest = started(12);
        assert_eq!(rest.tick(), TickOutcome::Running { remaining: 11 });
        assert_eq!(rest.tick(), TickOutcome::Cue { remaining: 10 });
        assert!(rest.cue_fired());
        assert_eq!(rest.tick(), TickOutcome::Running { remaining: 9 });
    }

    #[test]
    fn cue_disabled_never_fires() {
        let mut rest = RestSession::new(Duration::from_millis(100), false);
        rest.start(11);
        assert_eq!(rest.tick(), TickOutcome::Running { remaining: 10 });
        assert!(!rest.cue_fired());
    }

    #[test]
    fn extend_is_gated_by_cooldown() {
        let mut rest = started(60);
        let t0 = Instant::now();

        assert_eq!(rest.extend(t0), ExtendOutcome::Extended { remaining: 120 });
        assert_eq!(
            rest.extend(t0 + Duration::from_millis(40)),
            ExtendOutcome::TryLater {
                retry_in: Duration::from_millis(60)
            }
        );
        assert_eq!(rest.remaining_seconds(), 120);
        assert_eq!(
            rest.extend(t0 + Duration::from_millis(100)),
            ExtendOutcome::Extended { remaining: 180 }
        );
    }

    #[test]
    fn extend_inactive_is_rejected() {
        let mut rest = RestSession::new(Duration::ZERO, false);
        assert_eq!(rest.extend(Instant::now()), ExtendOutcome::NotActive);
    }

    #[test]
    fn unlock_gate() {
        let rest = started(60);
        assert_eq!(rest.unlock(UNLOCK_PHRASE, false), Err(RestError::NotAllowed));
        assert_eq!(rest.unlock("123", true), Err(RestError::WrongPhrase));
        assert_eq!(rest.unlock(UNLOCK_PHRASE, true), Ok(()));
    }

    #[test]
    fn cancel_reports_how_it_ended() {
        let mut rest = started(60);
        assert_eq!(rest.cancel(true), RestEnd::Cancelled);
        assert!(!rest.is_active());
        assert_eq!(rest.unlock(UNLOCK_PHRASE, true), Err(RestError::NotActive));

        let mut rest = started(60);
        assert_eq!(rest.cancel(false), RestEnd::Completed);
    }
}
