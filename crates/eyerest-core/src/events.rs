use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::session::Mode;
use crate::storage::ConfigUpdate;
use crate::timer::RestDisplay;

/// Parameters supplied when a work session starts.
///
/// The first four are always provided by the caller; the optional ones keep
/// the current configuration value when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkParams {
    pub work_time: u32,
    pub rest_time: u32,
    pub play_sound_after_rest: bool,
    pub allow_password_skip: bool,
    #[serde(default)]
    pub idle_detection_enabled: Option<bool>,
    #[serde(default)]
    pub idle_threshold_minutes: Option<u32>,
    #[serde(default)]
    pub temp_pause_enabled: Option<bool>,
    #[serde(default)]
    pub temp_pause_duration: Option<u32>,
}

impl WorkParams {
    pub fn new(work_time: u32, rest_time: u32) -> Self {
        Self {
            work_time,
            rest_time,
            play_sound_after_rest: true,
            allow_password_skip: false,
            idle_detection_enabled: None,
            idle_threshold_minutes: None,
            temp_pause_enabled: None,
            temp_pause_duration: None,
        }
    }
}

impl From<&WorkParams> for ConfigUpdate {
    fn from(params: &WorkParams) -> Self {
        ConfigUpdate {
            work_time: Some(params.work_time),
            rest_time: Some(params.rest_time),
            play_sound_after_rest: Some(params.play_sound_after_rest),
            allow_password_skip: Some(params.allow_password_skip),
            idle_detection_enabled: params.idle_detection_enabled,
            idle_threshold_minutes: params.idle_threshold_minutes,
            temp_pause_enabled: params.temp_pause_enabled,
            temp_pause_duration: params.temp_pause_duration,
            ..ConfigUpdate::default()
        }
    }
}

/// Everything the session worker can be asked to process.
///
/// The first group comes from users (tray, hotkeys, the rest overlay); the
/// second group is produced by timers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    StartWork(WorkParams),
    StopWork,
    ForceRest,
    TempPause,
    TempResume,
    RestComplete,
    RestCancel,
    Unlock(String),
    UpdateConfig(ConfigUpdate),

    WorkTimeout,
    TempPauseTimeout,
    CheckIdle,
    CheckActivity,
    UpdateDisplay,
    RestTick,
}

impl Event {
    /// Stable symbolic name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::StartWork(_) => "START_WORK",
            Event::StopWork => "STOP_WORK",
            Event::ForceRest => "FORCE_REST",
            Event::TempPause => "TEMP_PAUSE",
            Event::TempResume => "TEMP_RESUME",
            Event::RestComplete => "REST_COMPLETE",
            Event::RestCancel => "REST_CANCEL",
            Event::Unlock(_) => "UNLOCK",
            Event::UpdateConfig(_) => "UPDATE_CONFIG",
            Event::WorkTimeout => "WORK_TIMEOUT",
            Event::TempPauseTimeout => "TEMP_PAUSE_TIMEOUT",
            Event::CheckIdle => "CHECK_IDLE",
            Event::CheckActivity => "CHECK_ACTIVITY",
            Event::UpdateDisplay => "UPDATE_DISPLAY",
            Event::RestTick => "REST_TICK",
        }
    }

    /// Events that arrive every few seconds and are logged at debug level.
    pub fn is_high_frequency(&self) -> bool {
        matches!(
            self,
            Event::UpdateDisplay | Event::CheckIdle | Event::CheckActivity | Event::RestTick
        )
    }
}

/// Outbound notifications for whatever UI is attached.
///
/// Delivery is fire-and-forget; nothing in the core waits on a listener.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Notification {
    StatusChanged {
        text: String,
    },
    ModeChanged {
        from: Mode,
        to: Mode,
    },
    RestStarted {
        total_secs: u64,
    },
    RestTick {
        display: RestDisplay,
    },
    RestExtended {
        remaining_secs: u64,
    },
    ExtendDeferred {
        #[serde(with = "duration_ms")]
        retry_in: Duration,
    },
    /// Pre-completion cue, e.g. a chime ten seconds before the end.
    RestCue,
    RestFinished {
        completed: bool,
    },
    UnlockRejected {
        reason: String,
    },
    TempPauseEntered {
        secs: u64,
    },
    TempPauseExited,
    /// The registered hotkeys are out of date and must be re-registered.
    HotkeysChanged,
}

mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_screaming_snake_case() {
        assert_eq!(Event::StartWork(WorkParams::new(10, 1)).name(), "START_WORK");
        assert_eq!(Event::TempPauseTimeout.name(), "TEMP_PAUSE_TIMEOUT");
        assert_eq!(Event::Unlock(String::new()).name(), "UNLOCK");
    }

    #[test]
    fn only_periodic_events_are_high_frequency() {
        assert!(Event::RestTick.is_high_frequency());
        assert!(Event::CheckIdle.is_high_frequency());
        assert!(!Event::WorkTimeout.is_high_frequency());
        assert!(!Event::ForceRest.is_high_frequency());
    }

    #[test]
    fn work_params_keep_unset_options_out_of_update() {
        let update = ConfigUpdate::from(&WorkParams::new(25, 5));
        assert_eq!(update.work_time, Some(25));
        assert_eq!(update.rest_time, Some(5));
        assert_eq!(update.idle_detection_enabled, None);
        assert_eq!(update.hotkey, None);
    }

    #[test]
    fn notification_serializes_with_type_tag() {
        let n = Notification::ModeChanged {
            from: Mode::Idle,
            to: Mode::Working,
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "ModeChanged");
        assert_eq!(json["to"], "working");

        let n = Notification::ExtendDeferred {
            retry_in: Duration::from_millis(40),
        };
        assert_eq!(serde_json::to_value(&n).unwrap()["retry_in"], 40);
    }
}
