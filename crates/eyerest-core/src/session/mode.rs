use serde::{Deserialize, Serialize};
use std::fmt;

/// The mode a session is in. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Idle,
    Working,
    Resting,
    /// Working, but the user walked away; the countdown is frozen.
    Away,
    /// Resting, but the rest countdown is suspended for a short while.
    TempPaused,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::Idle,
        Mode::Working,
        Mode::Resting,
        Mode::Away,
        Mode::TempPaused,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Idle => "idle",
            Mode::Working => "working",
            Mode::Resting => "resting",
            Mode::Away => "away",
            Mode::TempPaused => "temp_paused",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
