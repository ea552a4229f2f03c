//! winit event loop glue
//!
//! Runs on the main thread. The global hotkey is unregistered from the
//! loop's exit hook so registration and teardown share a thread.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use winit::event::{ElementState, Event, KeyEvent, WindowEvent};
use winit::event_loop::{EventLoop, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, NamedKey};

use crate::hotkey::{HotkeyBackend, HotkeyService};
use crate::relay::Wake;
use crate::window::WindowSurface;

use super::app::{Flow, OverlayApp};

/// User events posted into the event loop from other threads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiWake {
    /// A relay has something pending
    Pending,
    /// Process is shutting down
    Shutdown,
}

/// Wakes the main thread through the event loop proxy
pub struct ProxyWaker {
    proxy: Mutex<EventLoopProxy<UiWake>>,
}

impl ProxyWaker {
    pub fn new(proxy: EventLoopProxy<UiWake>) -> Self {
        Self {
            proxy: Mutex::new(proxy),
        }
    }

    /// Ask the event loop to exit
    pub fn request_shutdown(&self) {
        self.post(UiWake::Shutdown);
    }

    fn post(&self, wake: UiWake) {
        let proxy = lock_recovering(&self.proxy);
        if proxy.send_event(wake).is_err() {
            debug!(?wake, "event loop already closed");
        }
    }
}

/// Lock a mutex, taking the value back from a poisoned lock.
///
/// A panic elsewhere must not swallow wakes; the proxy holds no state a
/// panic could have left half-written.
fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("event loop proxy lock poisoned, recovering");
        poisoned.into_inner()
    })
}

impl Wake for ProxyWaker {
    fn wake(&self) {
        self.post(UiWake::Pending);
    }
}

/// Create the main-thread event loop
pub fn build_event_loop() -> Result<EventLoop<UiWake>> {
    EventLoopBuilder::<UiWake>::with_user_event()
        .build()
        .context("failed to create event loop")
}

/// Run the event loop until shutdown
pub fn run<W, B>(
    event_loop: EventLoop<UiWake>,
    mut app: OverlayApp<W>,
    mut hotkeys: HotkeyService<B>,
) -> Result<()>
where
    W: WindowSurface,
    B: HotkeyBackend,
{
    info!("entering event loop");

    event_loop
        .run(move |event, elwt| {
            let flow = match event {
                Event::UserEvent(UiWake::Pending) => app.drain(),
                Event::UserEvent(UiWake::Shutdown) => Flow::Exit,
                Event::WindowEvent { event, .. } => match event {
                    WindowEvent::Focused(false) => app.on_blur(),
                    WindowEvent::KeyboardInput {
                        event:
                            KeyEvent {
                                logical_key: Key::Named(NamedKey::Escape),
                                state: ElementState::Pressed,
                                ..
                            },
                        ..
                    } => app.on_escape(),
                    // Closing the overlay only hides it
                    WindowEvent::CloseRequested => app.on_escape(),
                    _ => Flow::Continue,
                },
                Event::LoopExiting => {
                    info!(state = %app.state(), "event loop exiting");
                    hotkeys.stop();
                    app.close();
                    Flow::Continue
                }
                _ => Flow::Continue,
            };

            if flow == Flow::Exit {
                elwt.exit();
            }
        })
        .context("event loop failed")?;

    info!("event loop exited");
    Ok(())
}
