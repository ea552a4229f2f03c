//! Configuration loading and management

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::hotkey::{HotkeyCombo, DEFAULT_COMBO};

/// Overrides the IPC socket location
pub const SOCKET_VAR: &str = "QUICK_SEARCH_SOCKET";
/// Overrides the overlay hotkey, e.g. `Ctrl+Shift+Space`
pub const HOTKEY_VAR: &str = "QUICK_SEARCH_HOTKEY";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for the front-end bridge
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    /// Global combination that shows the overlay
    pub hotkey: HotkeyCombo,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let home = lookup("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("quick-search");

        let socket_path = lookup(SOCKET_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("overlay.sock"));

        let hotkey_spec = lookup(HOTKEY_VAR).unwrap_or_else(|| DEFAULT_COMBO.to_string());
        let hotkey = hotkey_spec
            .parse::<HotkeyCombo>()
            .with_context(|| format!("invalid {} `{}`", HOTKEY_VAR, hotkey_spec))?;

        Ok(Self {
            socket_path,
            data_dir,
            hotkey,
        })
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}
