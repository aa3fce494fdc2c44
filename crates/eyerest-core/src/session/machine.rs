//! Session state machine.
//!
//! Owns the mode, the timers and the rest session. Every change happens
//! inside [`SessionMachine::dispatch`], which the worker calls once per
//! dequeued event; nothing else mutates the session.

use chrono::Local;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::Mode;
use crate::events::{Event, Notification, WorkParams};
use crate::idle::IdleDetector;
use crate::storage::{Config, ConfigKey, ConfigUpdate, StatisticsLedger};
use crate::timer::{
    Envelope, ExtendOutcome, RestDisplay, RestEnd, RestSession, TickOutcome, TimerId,
    TimerRegistry,
};

pub const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(5);
pub const ACTIVITY_CHECK_INTERVAL: Duration = Duration::from_secs(2);
pub const DISPLAY_INTERVAL: Duration = Duration::from_secs(1);
pub const REST_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Collaborators injected into the machine at construction.
pub struct SessionContext {
    pub config: Config,
    /// Where config changes are persisted. `None` keeps them in memory.
    pub config_path: Option<PathBuf>,
    pub ledger: StatisticsLedger,
    pub idle: Box<dyn IdleDetector>,
}

impl SessionContext {
    /// In-memory context: nothing is written to disk.
    pub fn new(config: Config, idle: impl IdleDetector + 'static) -> Self {
        Self {
            config,
            config_path: None,
            ledger: StatisticsLedger::in_memory(),
            idle: Box::new(idle),
        }
    }

    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_ledger(mut self, ledger: StatisticsLedger) -> Self {
        self.ledger = ledger;
        self
    }
}

/// Mutable session state.
#[derive(Debug, Clone)]
pub struct Session {
    mode: Mode,
    mode_entered_at: Instant,
    work_deadline: Option<Instant>,
    remaining_work: Option<Duration>,
    away_started_at: Option<Instant>,
    temp_pause_started_at: Option<Instant>,
    rest: Option<RestSession>,
}

impl Session {
    fn new() -> Self {
        Self {
            mode: Mode::Idle,
            mode_entered_at: Instant::now(),
            work_deadline: None,
            remaining_work: None,
            away_started_at: None,
            temp_pause_started_at: None,
            rest: None,
        }
    }

    fn enter(&mut self, mode: Mode, now: Instant) {
        self.mode = mode;
        self.mode_entered_at = now;
        match mode {
            Mode::Idle => {
                self.work_deadline = None;
                self.remaining_work = None;
                self.away_started_at = None;
                self.temp_pause_started_at = None;
                self.rest = None;
            }
            Mode::Working => {
                self.away_started_at = None;
                self.temp_pause_started_at = None;
            }
            Mode::Away => self.away_started_at = Some(now),
            Mode::Resting => {
                self.work_deadline = None;
                self.remaining_work = None;
                self.away_started_at = None;
                self.temp_pause_started_at = None;
            }
            Mode::TempPaused => self.temp_pause_started_at = Some(now),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn mode_entered_at(&self) -> Instant {
        self.mode_entered_at
    }

    pub fn work_deadline(&self) -> Option<Instant> {
        self.work_deadline
    }

    /// Work time saved when the user went away.
    pub fn remaining_work(&self) -> Option<Duration> {
        self.remaining_work
    }

    pub fn away_started_at(&self) -> Option<Instant> {
        self.away_started_at
    }

    pub fn temp_pause_started_at(&self) -> Option<Instant> {
        self.temp_pause_started_at
    }

    pub fn rest(&self) -> Option<&RestSession> {
        self.rest.as_ref()
    }
}

/// Read-only copy of the session published after every event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub mode: Mode,
    pub status: String,
    pub work_remaining_secs: Option<u64>,
    pub rest: Option<RestDisplay>,
    pub today_completed: u32,
    pub total_completed: u64,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            mode: Mode::Idle,
            status: "Ready".into(),
            work_remaining_secs: None,
            rest: None,
            today_completed: 0,
            total_completed: 0,
        }
    }
}

fn mmss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

pub struct SessionMachine {
    session: Session,
    ctx: SessionContext,
    timers: TimerRegistry,
    notify: UnboundedSender<Notification>,
}

impl SessionMachine {
    /// `queue` is the session's own event queue; timers feed their events
    /// into it.
    pub fn new(
        ctx: SessionContext,
        queue: UnboundedSender<Envelope>,
        notify: UnboundedSender<Notification>,
    ) -> Self {
        Self {
            session: Session::new(),
            ctx,
            timers: TimerRegistry::new(queue),
            notify,
        }
    }

    /// Process one dequeued event.
    pub fn dispatch(&mut self, envelope: Envelope) {
        let event = envelope.event;
        if let Some(ticket) = envelope.ticket {
            if !self.timers.claim(ticket) {
                debug!(
                    event = event.name(),
                    timer = %ticket.id,
                    token = ticket.token,
                    "stale timer event discarded"
                );
                return;
            }
        }

        if event.is_high_frequency() {
            debug!(event = event.name(), mode = %self.session.mode, "processing event");
        } else {
            info!(event = event.name(), mode = %self.session.mode, "processing event");
        }

        let before = self.session.mode;
        self.handle(event);
        if self.session.mode != before {
            self.publish_status();
        }
    }

    fn handle(&mut self, event: Event) {
        match event {
            Event::StartWork(params) => self.on_start_work(params),
            Event::StopWork => self.on_stop_work(),
            Event::ForceRest => self.on_force_rest(),
            Event::TempPause => self.on_temp_pause(),
            Event::TempResume => self.on_temp_resume("TEMP_RESUME"),
            Event::TempPauseTimeout => self.on_temp_resume("TEMP_PAUSE_TIMEOUT"),
            Event::RestComplete => self.on_rest_finished(RestEnd::Completed),
            Event::RestCancel => self.on_rest_finished(RestEnd::Cancelled),
            Event::Unlock(phrase) => self.on_unlock(&phrase),
            Event::UpdateConfig(update) => self.on_update_config(&update),
            Event::WorkTimeout => self.on_work_timeout(),
            Event::CheckIdle => self.on_check_idle(),
            Event::CheckActivity => self.on_check_activity(),
            Event::UpdateDisplay => self.on_update_display(),
            Event::RestTick => self.on_rest_tick(),
        }
    }

    /// Cancel every outstanding timer. Called once the worker stops.
    pub fn shutdown(&mut self) {
        self.timers.cancel_all();
        info!(mode = %self.session.mode, "session shut down");
    }

    // ── User commands ────────────────────────────────────────────────

    fn on_start_work(&mut self, params: WorkParams) {
        if self.session.mode != Mode::Idle {
            self.reject("START_WORK");
            return;
        }

        match self.ctx.config.apply(&ConfigUpdate::from(&params)) {
            Ok(changed) => self.after_config_change(&changed),
            Err(e) => {
                warn!(error = %e, "work parameters rejected, session not started");
                return;
            }
        }

        self.transition(Mode::Working);
        self.arm_work_timers(self.ctx.config.work_duration());
        info!(
            work_min = self.ctx.config.work_time,
            rest_min = self.ctx.config.rest_time,
            "work session started"
        );
    }

    fn on_stop_work(&mut self) {
        if self.session.mode == Mode::Idle {
            self.reject("STOP_WORK");
            return;
        }

        self.timers.cancel_all();
        if let Some(mut rest) = self.session.rest.take() {
            let end = rest.cancel(true);
            self.emit(Notification::RestFinished {
                completed: end == RestEnd::Completed,
            });
        }
        self.transition(Mode::Idle);
    }

    fn on_force_rest(&mut self) {
        match self.session.mode {
            Mode::Idle => info!("force rest ignored, no work session running"),
            Mode::Working | Mode::Away => {
                self.timers.cancel_all();
                self.start_rest();
            }
            Mode::Resting => self.extend_rest(),
            Mode::TempPaused => {
                self.timers.cancel(TimerId::TempPause);
                self.resume_rest();
            }
        }
    }

    fn on_temp_pause(&mut self) {
        if self.session.mode != Mode::Resting {
            self.reject("TEMP_PAUSE");
            return;
        }
        if !self.ctx.config.temp_pause_enabled {
            info!("temporary pause is disabled, ignored");
            return;
        }
        if !self.session.rest.as_ref().is_some_and(RestSession::is_active) {
            warn!("rest session not active, temporary pause ignored");
            return;
        }

        self.timers.cancel(TimerId::RestTick);
        self.transition(Mode::TempPaused);
        self.timers.start(TimerId::TempPause, self.ctx.config.temp_pause());
        self.emit(Notification::TempPauseEntered {
            secs: u64::from(self.ctx.config.temp_pause_duration),
        });
    }

    fn on_temp_resume(&mut self, event: &'static str) {
        if self.session.mode != Mode::TempPaused {
            self.reject(event);
            return;
        }
        self.timers.cancel(TimerId::TempPause);
        self.resume_rest();
    }

    fn on_unlock(&mut self, phrase: &str) {
        if self.session.mode != Mode::Resting {
            self.reject("UNLOCK");
            return;
        }
        let allowed = self.ctx.config.allow_password_skip;
        let Some(rest) = self.session.rest.as_mut() else {
            warn!("resting without a rest session, unlock ignored");
            return;
        };

        match rest.unlock(phrase, allowed) {
            Ok(()) => {
                let end = rest.cancel(true);
                info!("rest unlocked early");
                self.finish_rest(end);
            }
            Err(e) => {
                info!(reason = %e, "unlock rejected");
                self.emit(Notification::UnlockRejected {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn on_update_config(&mut self, update: &ConfigUpdate) {
        match self.ctx.config.apply(update) {
            Ok(changed) if changed.is_empty() => debug!("configuration unchanged"),
            Ok(changed) => {
                self.after_config_change(&changed);
                if self.session.mode == Mode::Working
                    && changed.contains(&ConfigKey::IdleDetectionEnabled)
                {
                    if self.ctx.config.idle_detection_enabled {
                        self.timers.start(TimerId::IdleCheck, IDLE_CHECK_INTERVAL);
                    } else {
                        self.timers.cancel(TimerId::IdleCheck);
                    }
                }
            }
            Err(e) => warn!(error = %e, "configuration update rejected"),
        }
    }

    fn after_config_change(&mut self, changed: &[ConfigKey]) {
        if changed.is_empty() {
            return;
        }
        info!(keys = ?changed, "configuration updated");
        if changed.iter().any(|key| key.affects_hotkeys()) {
            self.emit(Notification::HotkeysChanged);
        }
        if let Some(path) = &self.ctx.config_path {
            if let Err(e) = self.ctx.config.save_to(path) {
                warn!(error = %e, "failed to persist configuration");
            }
        }
    }

    // ── Timer events ─────────────────────────────────────────────────

    fn on_work_timeout(&mut self) {
        if self.session.mode != Mode::Working {
            self.reject("WORK_TIMEOUT");
            return;
        }
        info!("work period over, time to rest");
        self.timers.cancel_all();
        self.start_rest();
    }

    fn on_check_idle(&mut self) {
        if self.session.mode != Mode::Working {
            self.reject("CHECK_IDLE");
            return;
        }
        if !self.ctx.config.idle_detection_enabled {
            debug!("idle detection disabled, idle check not re-armed");
            return;
        }

        if self.user_idle() {
            let now = Instant::now();
            let remaining = self
                .session
                .work_deadline
                .map(|deadline| deadline.saturating_duration_since(now));
            self.timers.cancel(TimerId::WorkCountdown);
            self.transition(Mode::Away);
            self.session.work_deadline = None;
            self.session.remaining_work = remaining;
            self.timers.start(TimerId::ActivityCheck, ACTIVITY_CHECK_INTERVAL);
            info!(
                remaining_secs = remaining.map(|d| d.as_secs()),
                "user away, work countdown frozen"
            );
        } else {
            self.timers.start(TimerId::IdleCheck, IDLE_CHECK_INTERVAL);
        }
    }

    fn on_check_activity(&mut self) {
        if self.session.mode != Mode::Away {
            self.reject("CHECK_ACTIVITY");
            return;
        }

        if self.user_idle() {
            self.timers.start(TimerId::ActivityCheck, ACTIVITY_CHECK_INTERVAL);
            return;
        }

        self.timers.cancel(TimerId::ActivityCheck);
        let countdown = self
            .session
            .remaining_work
            .take()
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| self.ctx.config.work_duration());
        self.transition(Mode::Working);
        self.arm_work_timers(countdown);
        info!(remaining_secs = countdown.as_secs(), "user back, work resumed");
    }

    fn on_update_display(&mut self) {
        match self.session.mode {
            Mode::Working => {
                self.publish_status();
                self.timers.start(TimerId::DisplayUpdate, DISPLAY_INTERVAL);
            }
            Mode::Away => self.publish_status(),
            _ => self.reject("UPDATE_DISPLAY"),
        }
    }

    fn on_rest_tick(&mut self) {
        if self.session.mode != Mode::Resting {
            self.reject("REST_TICK");
            return;
        }
        let Some(rest) = self.session.rest.as_mut() else {
            warn!("resting without a rest session, tick ignored");
            return;
        };
        let outcome = rest.tick();
        let display = rest.display();

        match outcome {
            TickOutcome::Inactive => debug!("rest session inactive, tick ignored"),
            TickOutcome::Running { .. } => {
                self.emit(Notification::RestTick { display });
                self.timers.start(TimerId::RestTick, REST_TICK_INTERVAL);
            }
            TickOutcome::Cue { remaining } => {
                debug!(remaining, "rest almost over, cue");
                self.emit(Notification::RestCue);
                self.emit(Notification::RestTick { display });
                self.timers.start(TimerId::RestTick, REST_TICK_INTERVAL);
            }
            TickOutcome::Completed => {
                self.emit(Notification::RestTick { display });
                self.finish_rest(RestEnd::Completed);
            }
        }
    }

    /// Reported by a rest overlay that runs its own countdown.
    fn on_rest_finished(&mut self, end: RestEnd) {
        if self.session.mode != Mode::Resting {
            self.reject(match end {
                RestEnd::Completed => "REST_COMPLETE",
                RestEnd::Cancelled => "REST_CANCEL",
            });
            return;
        }
        self.finish_rest(end);
    }

    /// End the current rest and start the next work period, within the
    /// handler that saw the rest end.
    fn finish_rest(&mut self, end: RestEnd) {
        let completed = end == RestEnd::Completed;
        if completed {
            if let Err(e) = self.ctx.ledger.record_completion(Local::now()) {
                warn!(error = %e, "failed to persist statistics");
            }
        }
        self.timers.cancel_all();
        self.session.rest = None;
        self.emit(Notification::RestFinished { completed });
        self.transition(Mode::Working);
        self.arm_work_timers(self.ctx.config.work_duration());
        info!(completed, "rest over, new work period");
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn transition(&mut self, to: Mode) {
        let from = self.session.mode;
        self.session.enter(to, Instant::now());
        info!(from = %from, to = %to, "mode changed");
        self.emit(Notification::ModeChanged { from, to });
    }

    fn arm_work_timers(&mut self, countdown: Duration) {
        self.session.work_deadline = Some(Instant::now() + countdown);
        self.timers.start(TimerId::WorkCountdown, countdown);
        if self.ctx.config.idle_detection_enabled {
            self.timers.start(TimerId::IdleCheck, IDLE_CHECK_INTERVAL);
        }
        self.timers.start(TimerId::DisplayUpdate, DISPLAY_INTERVAL);
    }

    fn start_rest(&mut self) {
        let config = &self.ctx.config;
        let mut rest = RestSession::new(config.extend_cooldown(), config.play_sound_after_rest);
        let total_secs = config.rest_seconds();
        let display = rest.start(total_secs);
        self.session.rest = Some(rest);

        self.transition(Mode::Resting);
        self.timers.start(TimerId::RestTick, REST_TICK_INTERVAL);
        self.emit(Notification::RestStarted { total_secs });
        self.emit(Notification::RestTick { display });
    }

    fn resume_rest(&mut self) {
        self.transition(Mode::Resting);
        self.timers.start(TimerId::RestTick, REST_TICK_INTERVAL);
        self.emit(Notification::TempPauseExited);
        if let Some(rest) = &self.session.rest {
            let display = rest.display();
            self.emit(Notification::RestTick { display });
        }
    }

    fn extend_rest(&mut self) {
        let Some(rest) = self.session.rest.as_mut() else {
            warn!("resting without a rest session, extend ignored");
            return;
        };
        match rest.extend(Instant::now()) {
            ExtendOutcome::Extended { remaining } => {
                let display = rest.display();
                info!(remaining_secs = remaining, "rest extended");
                self.emit(Notification::RestExtended {
                    remaining_secs: remaining,
                });
                self.emit(Notification::RestTick { display });
            }
            ExtendOutcome::TryLater { retry_in } => {
                debug!(
                    retry_in_ms = retry_in.as_millis() as u64,
                    "extend within cooldown, deferred"
                );
                self.emit(Notification::ExtendDeferred { retry_in });
            }
            ExtendOutcome::NotActive => warn!("rest session not active, extend ignored"),
        }
    }

    /// Idle according to the detector. A failing detector counts as active.
    fn user_idle(&self) -> bool {
        match self.ctx.idle.idle_seconds() {
            Ok(secs) => secs >= self.ctx.config.idle_threshold_secs(),
            Err(e) => {
                warn!(error = %e, "idle detector failed, assuming user is active");
                false
            }
        }
    }

    fn reject(&self, event: &'static str) {
        warn!(event, mode = %self.session.mode, "event not valid in current mode, dropped");
    }

    fn emit(&self, notification: Notification) {
        let _ = self.notify.send(notification);
    }

    fn publish_status(&self) {
        self.emit(Notification::StatusChanged {
            text: self.status_text(),
        });
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.session.mode
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &Config {
        &self.ctx.config
    }

    pub fn ledger(&self) -> &StatisticsLedger {
        &self.ctx.ledger
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    pub fn status_text(&self) -> String {
        let now = Instant::now();
        match self.session.mode {
            Mode::Idle => "Ready".into(),
            Mode::Working => match self.session.work_deadline {
                Some(deadline) if deadline > now => {
                    let left = deadline.duration_since(now).as_secs();
                    format!("Working: {} left", mmss(left))
                }
                _ => "Working".into(),
            },
            Mode::Resting => "Resting".into(),
            Mode::Away => match self.session.away_started_at {
                Some(since) => {
                    let away = now.saturating_duration_since(since).as_secs();
                    format!("Away ({})", mmss(away))
                }
                None => "Away".into(),
            },
            Mode::TempPaused => match self.session.temp_pause_started_at {
                Some(since) => {
                    let paused = now.saturating_duration_since(since).as_secs();
                    let left =
                        u64::from(self.ctx.config.temp_pause_duration).saturating_sub(paused);
                    format!("Paused ({left} s left)")
                }
                None => "Paused".into(),
            },
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let now = Instant::now();
        SessionSnapshot {
            mode: self.session.mode,
            status: self.status_text(),
            work_remaining_secs: match self.session.mode {
                Mode::Working => self
                    .session
                    .work_deadline
                    .map(|d| d.saturating_duration_since(now).as_secs()),
                Mode::Away => self.session.remaining_work.map(|d| d.as_secs()),
                _ => None,
            },
            rest: self.session.rest.as_ref().map(RestSession::display),
            today_completed: self.ctx.ledger.today_count(),
            total_completed: self.ctx.ledger.total_count(),
        }
    }
}
