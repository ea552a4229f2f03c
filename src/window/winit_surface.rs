//! winit-backed overlay window

use winit::dpi::{LogicalSize, PhysicalPosition};
use winit::event_loop::EventLoop;
use winit::window::{Window, WindowBuilder, WindowLevel};

use super::{WindowError, WindowOp, WindowSurface};

const TITLE: &str = "Quick Search";
const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 72.0;

/// The overlay window, created hidden
pub struct WinitSurface {
    window: Window,
}

impl WinitSurface {
    /// Create the overlay window on the event loop's thread
    pub fn build<T>(event_loop: &EventLoop<T>) -> Result<Self, WindowError> {
        let window = WindowBuilder::new()
            .with_title(TITLE)
            .with_inner_size(LogicalSize::new(WIDTH, HEIGHT))
            .with_decorations(false)
            .with_resizable(false)
            .with_visible(false)
            .build(event_loop)
            .map_err(|_| WindowError::NoSurface)?;

        Ok(Self { window })
    }
}

impl WindowSurface for WinitSurface {
    fn show(&mut self) -> Result<(), WindowError> {
        self.window.set_visible(true);
        self.window.focus_window();
        Ok(())
    }

    fn hide(&mut self) -> Result<(), WindowError> {
        self.window.set_visible(false);
        Ok(())
    }

    fn center(&mut self) -> Result<(), WindowError> {
        let monitor = self
            .window
            .current_monitor()
            .or_else(|| self.window.primary_monitor())
            .ok_or_else(|| WindowError::OperationFailed {
                op: WindowOp::Center,
                reason: "no monitor attached".to_string(),
            })?;

        let origin = monitor.position();
        let area = monitor.size();
        let size = self.window.outer_size();

        let x = origin.x + (area.width as i32 - size.width as i32) / 2;
        let y = origin.y + (area.height as i32 - size.height as i32) / 2;
        self.window.set_outer_position(PhysicalPosition::new(x, y));
        Ok(())
    }

    fn set_always_on_top(&mut self, on_top: bool) -> Result<(), WindowError> {
        let level = if on_top {
            WindowLevel::AlwaysOnTop
        } else {
            WindowLevel::Normal
        };
        self.window.set_window_level(level);
        Ok(())
    }
}
