//! Hotkey combination definitions and parsing
//!
//! A combination is a modifier set plus one key, written as
//! `CmdOrCtrl+G`. Parsing is done by `global-hotkey`, so anything it can
//! register (letters, digits, F-keys, `Space`, ...) is accepted here.
//! `CmdOrCtrl` resolves to Command on macOS and Control everywhere else.

use std::fmt;
use std::str::FromStr;

use global_hotkey::hotkey::{Code, HotKey, CMD_OR_CTRL};

/// Default overlay hotkey
pub const DEFAULT_COMBO: &str = "CmdOrCtrl+G";

/// A global key combination, kept with the text it was written as
#[derive(Debug, Clone)]
pub struct HotkeyCombo {
    spec: String,
    hotkey: HotKey,
}

impl HotkeyCombo {
    /// The binding handed to the OS
    pub fn to_hotkey(&self) -> HotKey {
        self.hotkey
    }
}

impl Default for HotkeyCombo {
    fn default() -> Self {
        Self {
            spec: DEFAULT_COMBO.to_string(),
            hotkey: HotKey::new(Some(CMD_OR_CTRL), Code::KeyG),
        }
    }
}

/// Two combinations are equal when they register the same binding
impl PartialEq for HotkeyCombo {
    fn eq(&self, other: &Self) -> bool {
        self.hotkey == other.hotkey
    }
}

impl Eq for HotkeyCombo {}

impl fmt::Display for HotkeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spec)
    }
}

/// Errors from parsing a hotkey combination
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComboParseError {
    #[error("hotkey is empty")]
    Empty,

    #[error("invalid hotkey `{combo}`: {reason}")]
    Invalid { combo: String, reason: String },

    /// A bare key would swallow ordinary typing system-wide
    #[error("hotkey `{0}` needs at least one modifier")]
    MissingModifier(String),
}

impl FromStr for HotkeyCombo {
    type Err = ComboParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let spec = s.trim();
        if spec.is_empty() {
            return Err(ComboParseError::Empty);
        }

        let hotkey = spec
            .parse::<HotKey>()
            .map_err(|e| ComboParseError::Invalid {
                combo: spec.to_string(),
                reason: e.to_string(),
            })?;
        if hotkey.mods.is_empty() {
            return Err(ComboParseError::MissingModifier(spec.to_string()));
        }

        Ok(Self {
            spec: spec.to_string(),
            hotkey,
        })
    }
}
