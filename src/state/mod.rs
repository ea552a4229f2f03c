//! State machine module for overlay visibility
//!
//! Provides an explicit state machine with two states:
//! - Hidden: default state, window off screen
//! - Visible: window shown, centered and always on top

mod machine;

pub use machine::{OverlayState, VisibilityController};
