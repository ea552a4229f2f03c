//! Overlay visibility state machine
//!
//! Two states, Hidden and Visible. The hotkey always shows; Escape and
//! focus loss always hide. All mutation happens on the main thread.

use std::time::Instant;

use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::events::OverlayEvent;
use crate::window::{WindowError, WindowSurface};

/// Visibility of the overlay window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverlayState {
    /// Not on screen, waiting for the hotkey
    #[default]
    Hidden,
    /// On screen, centered and above other windows
    Visible,
}

impl OverlayState {
    pub fn is_visible(self) -> bool {
        self == OverlayState::Visible
    }
}

impl std::fmt::Display for OverlayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayState::Hidden => write!(f, "Hidden"),
            OverlayState::Visible => write!(f, "Visible"),
        }
    }
}

/// Drives the overlay window and tells the front-end about it
pub struct VisibilityController<W: WindowSurface> {
    state: OverlayState,
    surface: W,
    /// Time the overlay last became visible
    shown_at: Option<Instant>,
    event_tx: broadcast::Sender<OverlayEvent>,
}

impl<W: WindowSurface> VisibilityController<W> {
    /// Create a controller for a hidden window
    pub fn new(surface: W, event_tx: broadcast::Sender<OverlayEvent>) -> Self {
        Self {
            state: OverlayState::Hidden,
            surface,
            shown_at: None,
            event_tx,
        }
    }

    /// Get the current state
    pub fn state(&self) -> OverlayState {
        self.state
    }

    /// Show, center and raise the overlay.
    ///
    /// Repeating this while visible re-centers and re-raises the window.
    pub fn show(&mut self) -> Result<(), WindowError> {
        self.surface.show()?;
        if !self.state.is_visible() {
            self.transition_to(OverlayState::Visible);
        }

        // The window is on screen from here on, so listeners hear about it
        // even when placing it fails
        let placed = self
            .surface
            .center()
            .and_then(|()| self.surface.set_always_on_top(true));

        self.emit(OverlayEvent::ShowOverlay);
        placed
    }

    /// Hide the overlay. No-op when already hidden.
    pub fn hide(&mut self) -> Result<(), WindowError> {
        if !self.state.is_visible() {
            debug!("overlay already hidden");
            return Ok(());
        }

        self.surface.hide()?;
        self.transition_to(OverlayState::Hidden);
        self.emit(OverlayEvent::OverlayHidden);
        Ok(())
    }

    /// Global hotkey pressed
    pub fn on_hotkey(&mut self) -> Result<(), WindowError> {
        self.show()
    }

    /// Escape pressed inside the overlay
    pub fn on_escape(&mut self) -> Result<(), WindowError> {
        self.hide()
    }

    /// Overlay lost keyboard focus
    pub fn on_blur(&mut self) -> Result<(), WindowError> {
        self.hide()
    }

    fn transition_to(&mut self, new_state: OverlayState) {
        let visible_ms = self
            .shown_at
            .take()
            .map(|t| t.elapsed().as_millis() as u64)
            .unwrap_or(0);

        info!(
            from = %self.state,
            to = %new_state,
            visible_ms,
            "overlay transition"
        );

        self.state = new_state;
        if new_state.is_visible() {
            self.shown_at = Some(Instant::now());
        }
    }

    fn emit(&self, event: OverlayEvent) {
        debug!(%event, "emitting overlay event");
        let _ = self.event_tx.send(event);
    }

    #[cfg(test)]
    pub(crate) fn surface_mut(&mut self) -> &mut W {
        &mut self.surface
    }
}
