//! Window surface the overlay is drawn into
//!
//! The visibility controller only needs four calls from the windowing
//! layer. Calls are synchronous and must be made on the main thread.

mod winit_surface;

pub use winit_surface::WinitSurface;

/// Window-manager operations the controller issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOp {
    Show,
    Hide,
    Center,
    SetAlwaysOnTop(bool),
}

impl std::fmt::Display for WindowOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowOp::Show => write!(f, "show"),
            WindowOp::Hide => write!(f, "hide"),
            WindowOp::Center => write!(f, "center"),
            WindowOp::SetAlwaysOnTop(on) => write!(f, "set_always_on_top({})", on),
        }
    }
}

/// Errors reported by the window surface
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("window operation `{op}` failed: {reason}")]
    OperationFailed { op: WindowOp, reason: String },

    #[error("no window surface available")]
    NoSurface,
}

impl WindowError {
    /// Whether the overlay can no longer work at all
    pub fn is_fatal(&self) -> bool {
        matches!(self, WindowError::NoSurface)
    }
}

/// Window-manager control surface
pub trait WindowSurface {
    fn show(&mut self) -> Result<(), WindowError>;
    fn hide(&mut self) -> Result<(), WindowError>;
    fn center(&mut self) -> Result<(), WindowError>;
    fn set_always_on_top(&mut self, on_top: bool) -> Result<(), WindowError>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = WindowError::OperationFailed {
            op: WindowOp::SetAlwaysOnTop(true),
            reason: "denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "window operation `set_always_on_top(true)` failed: denied"
        );
        assert!(!err.is_fatal());
        assert!(WindowError::NoSurface.is_fatal());
    }
}
