//! TOML-based application configuration.
//!
//! A flat document of work/rest durations, hotkeys and feature switches.
//! Every key is listed in [`ConfigKey`]; `get`/`set` go through that enum
//! instead of looking fields up by name at runtime.
//!
//! Configuration is stored at `~/.config/eyerest/config.toml`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use super::{data_dir, write_atomic};
use crate::error::ConfigError;
use crate::hotkey::Hotkey;

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/eyerest/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Work period length in minutes.
    #[serde(default = "default_work_time")]
    pub work_time: u32,
    /// Rest period length in minutes.
    #[serde(default = "default_rest_time")]
    pub rest_time: u32,
    /// Force-rest hotkey.
    #[serde(default = "default_hotkey")]
    pub hotkey: String,
    #[serde(default = "default_true")]
    pub play_sound_after_rest: bool,
    #[serde(default)]
    pub allow_password_skip: bool,
    #[serde(default)]
    pub idle_detection_enabled: bool,
    #[serde(default = "default_idle_threshold_minutes")]
    pub idle_threshold_minutes: u32,
    #[serde(default = "default_true")]
    pub temp_pause_enabled: bool,
    /// Temporary pause length in seconds.
    #[serde(default = "default_temp_pause_duration")]
    pub temp_pause_duration: u32,
    #[serde(default = "default_temp_pause_hotkey")]
    pub temp_pause_hotkey: String,
    /// Minimum gap between two rest extensions, in milliseconds.
    #[serde(default = "default_extend_cooldown_ms")]
    pub extend_cooldown_ms: u64,
}

// Default functions
fn default_work_time() -> u32 {
    10
}
fn default_rest_time() -> u32 {
    1
}
fn default_hotkey() -> String {
    "ctrl+shift+r".into()
}
fn default_true() -> bool {
    true
}
fn default_idle_threshold_minutes() -> u32 {
    5
}
fn default_temp_pause_duration() -> u32 {
    20
}
fn default_temp_pause_hotkey() -> String {
    "ctrl+shift+p".into()
}
fn default_extend_cooldown_ms() -> u64 {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_time: default_work_time(),
            rest_time: default_rest_time(),
            hotkey: default_hotkey(),
            play_sound_after_rest: true,
            allow_password_skip: false,
            idle_detection_enabled: false,
            idle_threshold_minutes: default_idle_threshold_minutes(),
            temp_pause_enabled: true,
            temp_pause_duration: default_temp_pause_duration(),
            temp_pause_hotkey: default_temp_pause_hotkey(),
            extend_cooldown_ms: default_extend_cooldown_ms(),
        }
    }
}

/// Every configuration key, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    WorkTime,
    RestTime,
    Hotkey,
    PlaySoundAfterRest,
    AllowPasswordSkip,
    IdleDetectionEnabled,
    IdleThresholdMinutes,
    TempPauseEnabled,
    TempPauseDuration,
    TempPauseHotkey,
    ExtendCooldownMs,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 11] = [
        ConfigKey::WorkTime,
        ConfigKey::RestTime,
        ConfigKey::Hotkey,
        ConfigKey::PlaySoundAfterRest,
        ConfigKey::AllowPasswordSkip,
        ConfigKey::IdleDetectionEnabled,
        ConfigKey::IdleThresholdMinutes,
        ConfigKey::TempPauseEnabled,
        ConfigKey::TempPauseDuration,
        ConfigKey::TempPauseHotkey,
        ConfigKey::ExtendCooldownMs,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::WorkTime => "work_time",
            ConfigKey::RestTime => "rest_time",
            ConfigKey::Hotkey => "hotkey",
            ConfigKey::PlaySoundAfterRest => "play_sound_after_rest",
            ConfigKey::AllowPasswordSkip => "allow_password_skip",
            ConfigKey::IdleDetectionEnabled => "idle_detection_enabled",
            ConfigKey::IdleThresholdMinutes => "idle_threshold_minutes",
            ConfigKey::TempPauseEnabled => "temp_pause_enabled",
            ConfigKey::TempPauseDuration => "temp_pause_duration",
            ConfigKey::TempPauseHotkey => "temp_pause_hotkey",
            ConfigKey::ExtendCooldownMs => "extend_cooldown_ms",
        }
    }

    /// Whether a change to this key invalidates the registered hotkeys.
    pub fn affects_hotkeys(self) -> bool {
        matches!(
            self,
            ConfigKey::Hotkey | ConfigKey::TempPauseHotkey | ConfigKey::TempPauseEnabled
        )
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

/// A partial configuration change. `None` leaves the current value alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub work_time: Option<u32>,
    pub rest_time: Option<u32>,
    pub hotkey: Option<String>,
    pub play_sound_after_rest: Option<bool>,
    pub allow_password_skip: Option<bool>,
    pub idle_detection_enabled: Option<bool>,
    pub idle_threshold_minutes: Option<u32>,
    pub temp_pause_enabled: Option<bool>,
    pub temp_pause_duration: Option<u32>,
    pub temp_pause_hotkey: Option<String>,
    pub extend_cooldown_ms: Option<u64>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ConfigUpdate::default()
    }
}

fn parse_value<T: FromStr>(key: ConfigKey, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key.as_str(), format!("cannot parse '{value}'")))
}

fn require_positive(key: ConfigKey, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::invalid(key.as_str(), "must be at least 1"));
    }
    Ok(())
}

impl Config {
    /// Default location of the config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location.
    ///
    /// # Errors
    ///
    /// See [`Config::load_from`].
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from `path`. A missing file yields the defaults.
    ///
    /// Keys not listed in [`ConfigKey`] are ignored with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// holds an out-of-range value.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        let table: toml::Table =
            toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        for key in table.keys() {
            if key.parse::<ConfigKey>().is_err() {
                warn!(key = %key, path = %path.display(), "ignoring unknown config key");
            }
        }

        let cfg: Config =
            toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `path`, falling back to defaults on any error.
    pub fn load_from_or_default(path: &Path) -> Self {
        Self::load_from(path).unwrap_or_else(|e| {
            warn!(error = %e, path = %path.display(), "config unreadable, using defaults");
            Self::default()
        })
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        match Self::path() {
            Ok(path) => Self::load_from_or_default(&path),
            Err(e) => {
                warn!(error = %e, "config location unavailable, using defaults");
                Self::default()
            }
        }
    }

    /// Persist to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// Persist to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        write_atomic(path, content.as_bytes()).map_err(|source| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get a config value rendered as a string.
    pub fn get(&self, key: ConfigKey) -> String {
        match key {
            ConfigKey::WorkTime => self.work_time.to_string(),
            ConfigKey::RestTime => self.rest_time.to_string(),
            ConfigKey::Hotkey => self.hotkey.clone(),
            ConfigKey::PlaySoundAfterRest => self.play_sound_after_rest.to_string(),
            ConfigKey::AllowPasswordSkip => self.allow_password_skip.to_string(),
            ConfigKey::IdleDetectionEnabled => self.idle_detection_enabled.to_string(),
            ConfigKey::IdleThresholdMinutes => self.idle_threshold_minutes.to_string(),
            ConfigKey::TempPauseEnabled => self.temp_pause_enabled.to_string(),
            ConfigKey::TempPauseDuration => self.temp_pause_duration.to_string(),
            ConfigKey::TempPauseHotkey => self.temp_pause_hotkey.clone(),
            ConfigKey::ExtendCooldownMs => self.extend_cooldown_ms.to_string(),
        }
    }

    /// Set a config value by key name. Does not persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse
    /// or is out of range.
    pub fn set(&mut self, key: &str, value: &str) -> Result<ConfigKey, ConfigError> {
        let key: ConfigKey = key.parse()?;
        let mut update = ConfigUpdate::default();
        match key {
            ConfigKey::WorkTime => update.work_time = Some(parse_value(key, value)?),
            ConfigKey::RestTime => update.rest_time = Some(parse_value(key, value)?),
            ConfigKey::Hotkey => update.hotkey = Some(value.to_string()),
            ConfigKey::PlaySoundAfterRest => {
                update.play_sound_after_rest = Some(parse_value(key, value)?)
            }
            ConfigKey::AllowPasswordSkip => {
                update.allow_password_skip = Some(parse_value(key, value)?)
            }
            ConfigKey::IdleDetectionEnabled => {
                update.idle_detection_enabled = Some(parse_value(key, value)?)
            }
            ConfigKey::IdleThresholdMinutes => {
                update.idle_threshold_minutes = Some(parse_value(key, value)?)
            }
            ConfigKey::TempPauseEnabled => {
                update.temp_pause_enabled = Some(parse_value(key, value)?)
            }
            ConfigKey::TempPauseDuration => {
                update.temp_pause_duration = Some(parse_value(key, value)?)
            }
            ConfigKey::TempPauseHotkey => update.temp_pause_hotkey = Some(value.to_string()),
            ConfigKey::ExtendCooldownMs => {
                update.extend_cooldown_ms = Some(parse_value(key, value)?)
            }
        }
        self.apply(&update)?;
        Ok(key)
    }

    /// Apply a partial update. Either every field is applied or none is.
    ///
    /// Returns the keys whose value actually changed. Hotkeys that only
    /// differ in spelling ("Ctrl+R" vs "control + r") count as unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting configuration is invalid.
    pub fn apply(&mut self, update: &ConfigUpdate) -> Result<Vec<ConfigKey>, ConfigError> {
        let mut next = self.clone();
        if let Some(v) = update.work_time {
            next.work_time = v;
        }
        if let Some(v) = update.rest_time {
            next.rest_time = v;
        }
        if let Some(v) = &update.hotkey {
            next.hotkey = v.clone();
        }
        if let Some(v) = update.play_sound_after_rest {
            next.play_sound_after_rest = v;
        }
        if let Some(v) = update.allow_password_skip {
            next.allow_password_skip = v;
        }
        if let Some(v) = update.idle_detection_enabled {
            next.idle_detection_enabled = v;
        }
        if let Some(v) = update.idle_threshold_minutes {
            next.idle_threshold_minutes = v;
        }
        if let Some(v) = update.temp_pause_enabled {
            next.temp_pause_enabled = v;
        }
        if let Some(v) = update.temp_pause_duration {
            next.temp_pause_duration = v;
        }
        if let Some(v) = &update.temp_pause_hotkey {
            next.temp_pause_hotkey = v.clone();
        }
        if let Some(v) = update.extend_cooldown_ms {
            next.extend_cooldown_ms = v;
        }
        next.validate()?;

        let changed = ConfigKey::ALL
            .into_iter()
            .filter(|&key| match key {
                ConfigKey::Hotkey | ConfigKey::TempPauseHotkey => {
                    Hotkey::parse(&self.get(key)).ok() != Hotkey::parse(&next.get(key)).ok()
                }
                _ => self.get(key) != next.get(key),
            })
            .collect();
        *self = next;
        Ok(changed)
    }

    /// Check ranges and hotkey syntax.
    ///
    /// # Errors
    ///
    /// Returns the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive(ConfigKey::WorkTime, self.work_time)?;
        require_positive(ConfigKey::RestTime, self.rest_time)?;
        require_positive(ConfigKey::IdleThresholdMinutes, self.idle_threshold_minutes)?;
        require_positive(ConfigKey::TempPauseDuration, self.temp_pause_duration)?;
        for key in [ConfigKey::Hotkey, ConfigKey::TempPauseHotkey] {
            Hotkey::parse(&self.get(key))
                .map_err(|e| ConfigError::invalid(key.as_str(), e.to_string()))?;
        }
        Ok(())
    }

    pub fn work_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.work_time) * 60)
    }

    pub fn rest_seconds(&self) -> u64 {
        u64::from(self.rest_time) * 60
    }

    pub fn idle_threshold_secs(&self) -> u64 {
        u64::from(self.idle_threshold_minutes) * 60
    }

    pub fn temp_pause(&self) -> Duration {
        Duration::from_secs(u64::from(self.temp_pause_duration))
    }

    pub fn extend_cooldown(&self) -> Duration {
        Duration::from_millis(self.extend_cooldown_ms)
    }
}
