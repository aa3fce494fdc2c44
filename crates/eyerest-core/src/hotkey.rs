//! Hotkey contract.
//!
//! The OS-level capture lives outside this crate. What the core owns is the
//! normalized form of a key combination, the actions a hotkey can trigger,
//! and the list of bindings a capture layer should register.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::HotkeyError;
use crate::events::Event;
use crate::storage::Config;

/// A normalized key combination such as `control + shift + r`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hotkey {
    parts: Vec<String>,
}

impl Hotkey {
    /// Parse a `+`-separated combination.
    ///
    /// Parts are trimmed and lower-cased; `ctrl` becomes `control` and `win`
    /// becomes `window`.
    pub fn parse(input: &str) -> Result<Self, HotkeyError> {
        if input.trim().is_empty() {
            return Err(HotkeyError::Empty);
        }

        let parts = input
            .split('+')
            .map(|part| {
                let part = part.trim().to_lowercase();
                match part.as_str() {
                    "" => Err(HotkeyError::EmptyPart(input.to_string())),
                    "ctrl" => Ok("control".to_string()),
                    "win" => Ok("window".to_string()),
                    _ => Ok(part),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { parts })
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join(" + "))
    }
}

/// What a registered hotkey does when pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HotkeyAction {
    ForceRest,
    TempPause,
}

impl HotkeyAction {
    pub fn event(self) -> Event {
        match self {
            HotkeyAction::ForceRest => Event::ForceRest,
            HotkeyAction::TempPause => Event::TempPause,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyBinding {
    pub hotkey: Hotkey,
    pub action: HotkeyAction,
}

/// Bindings a capture layer should register for `config`.
///
/// The temp-pause binding is only present while temp pause is enabled.
pub fn hotkey_bindings(config: &Config) -> Result<Vec<HotkeyBinding>, HotkeyError> {
    let mut bindings = vec![HotkeyBinding {
        hotkey: Hotkey::parse(&config.hotkey)?,
        action: HotkeyAction::ForceRest,
    }];
    if config.temp_pause_enabled {
        bindings.push(HotkeyBinding {
            hotkey: Hotkey::parse(&config.temp_pause_hotkey)?,
            action: HotkeyAction::TempPause,
        });
    }
    Ok(bindings)
}
