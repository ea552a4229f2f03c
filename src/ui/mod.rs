//! Main-thread side of the overlay
//!
//! Everything that touches the window runs here, on the thread that owns
//! the winit event loop. Background tasks reach it only through relays.

mod app;
mod event_loop;

pub use app::OverlayApp;
pub use event_loop::{build_event_loop, run, ProxyWaker};

/// Requests handed to the main thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiCommand {
    /// Global hotkey pressed
    Hotkey,
    /// Front-end asked for the overlay
    Show,
    /// Front-end dismissed the overlay
    Hide,
}
