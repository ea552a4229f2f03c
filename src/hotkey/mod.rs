//! Hotkey module for the global overlay shortcut
//!
//! Registers one system-wide key combination through the `global-hotkey`
//! crate and exposes its presses as an async sequence.

mod keys;
mod listener;

pub use keys::{HotkeyCombo, DEFAULT_COMBO};
pub use listener::{GlobalHotkeyBackend, HotkeyBackend, HotkeyService, Keydowns};

#[cfg(test)]
pub(crate) use listener::testing;
