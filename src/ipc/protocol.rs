//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};

use crate::events::OverlayEvent;

/// Largest accepted message body
pub const MAX_MESSAGE_LEN: usize = 1024 * 1024;

/// Requests from the front-end to the daemon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Request current overlay status
    GetStatus,

    /// Show the overlay, same as the hotkey
    RequestShow,

    /// Hide the overlay (Escape or click-away in the front-end)
    RequestHide,

    /// Ping to check connectivity
    Ping,

    /// Subscribe to overlay event notifications
    Subscribe,
}

/// Responses from the daemon to the front-end
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Current overlay status
    Status(OverlayStatus),

    /// Show/hide request handed to the window thread
    Accepted,

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification from daemon to subscribed clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Overlay event occurred
    Overlay { event: OverlayEvent },
}

/// Full overlay status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayStatus {
    /// Daemon version
    pub version: String,

    /// Whether the overlay is on screen
    pub visible: bool,

    /// Whether the global hotkey is registered
    pub hotkey_registered: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl Default for OverlayStatus {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            visible: false,
            hotkey_registered: false,
            uptime_secs: 0,
        }
    }
}
