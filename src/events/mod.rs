//! Events module for overlay visibility changes
//!
//! Provides the event types the front-end subscribes to. The UI layer
//! listens for `show-overlay` to focus its input field.

use serde::{Deserialize, Serialize};

/// Events emitted by the visibility controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OverlayEvent {
    /// Overlay was shown (or re-raised while already visible)
    ShowOverlay,

    /// Overlay went from visible to hidden
    OverlayHidden,
}

impl OverlayEvent {
    /// Visibility implied by this event
    pub fn visible(&self) -> bool {
        matches!(self, OverlayEvent::ShowOverlay)
    }
}

impl std::fmt::Display for OverlayEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayEvent::ShowOverlay => write!(f, "show-overlay"),
            OverlayEvent::OverlayHidden => write!(f, "overlay-hidden"),
        }
    }
}
