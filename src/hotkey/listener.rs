//! Global hotkey listener
//!
//! `HotkeyService` owns the registration lifecycle. The OS-facing side sits
//! behind `HotkeyBackend` so the service can be driven by a fake in tests.
//! Registration and teardown must happen on the main thread, the one running
//! the window event loop.

use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

use super::keys::HotkeyCombo;

/// Buffered key-downs between the OS callback and the consumer task
const NOTIFICATION_CAPACITY: usize = 8;

/// A single press of the registered combination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keydown;

/// Errors that can occur in the hotkey listener
#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("hotkey service is already running")]
    AlreadyRunning,

    #[error("global hotkey unavailable: {0}")]
    Unavailable(String),
}

/// OS-level registration of a single global key combination
pub trait HotkeyBackend {
    /// Claim `combo` and deliver key-downs into `events`.
    ///
    /// The callback path must never block; drop presses instead.
    fn register(
        &mut self,
        combo: &HotkeyCombo,
        events: mpsc::Sender<Keydown>,
    ) -> Result<(), HotkeyError>;

    /// Release the binding and drop the events sender.
    fn unregister(&mut self) -> Result<(), HotkeyError>;
}

/// Lazy, infinite sequence of key-downs for as long as the service runs
#[derive(Debug)]
pub struct Keydowns {
    rx: mpsc::Receiver<Keydown>,
    stopped: watch::Receiver<bool>,
}

impl Keydowns {
    /// Wait for the next press. Returns `None` once the hotkey is unregistered,
    /// even if presses are still buffered.
    pub async fn next(&mut self) -> Option<Keydown> {
        tokio::select! {
            biased;
            _ = wait_stopped(&mut self.stopped) => {
                self.rx.close();
                None
            }
            keydown = self.rx.recv() => keydown,
        }
    }
}

/// Resolves once the owning service stops or goes away
async fn wait_stopped(stopped: &mut watch::Receiver<bool>) {
    loop {
        let is_stopped = *stopped.borrow_and_update();
        if is_stopped || stopped.changed().await.is_err() {
            return;
        }
    }
}

/// Owns the global hotkey registration for the lifetime of the app
pub struct HotkeyService<B: HotkeyBackend> {
    backend: B,
    combo: HotkeyCombo,
    running: bool,
    stop_tx: Option<watch::Sender<bool>>,
}

impl<B: HotkeyBackend> HotkeyService<B> {
    /// Create a new, unregistered hotkey service
    pub fn new(backend: B, combo: HotkeyCombo) -> Self {
        Self {
            backend,
            combo,
            running: false,
            stop_tx: None,
        }
    }

    /// Register the hotkey and hand back its key-down sequence.
    ///
    /// The sequence can be taken once per registration. A failure leaves the
    /// service stopped; callers should carry on without the hotkey.
    pub fn start(&mut self) -> Result<Keydowns, HotkeyError> {
        if self.running {
            return Err(HotkeyError::AlreadyRunning);
        }

        let (tx, rx) = mpsc::channel(NOTIFICATION_CAPACITY);
        self.backend.register(&self.combo, tx)?;
        self.running = true;

        let (stop_tx, stopped) = watch::channel(false);
        self.stop_tx = Some(stop_tx);

        info!(combo = %self.combo, "global hotkey registered");
        Ok(Keydowns { rx, stopped })
    }

    /// Unregister the hotkey, ending the key-down sequence.
    ///
    /// Presses still buffered are discarded. Only the first call after
    /// `start` reaches the backend.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;

        if let Some(stop_tx) = self.stop_tx.take() {
            // No receiver means the sequence is already gone
            let _ = stop_tx.send(true);
        }

        match self.backend.unregister() {
            Ok(()) => info!(combo = %self.combo, "global hotkey unregistered"),
            Err(e) => warn!(?e, "failed to unregister global hotkey"),
        }
    }

    /// Check if the hotkey is currently registered
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl<B: HotkeyBackend> Drop for HotkeyService<B> {
    fn drop(&mut self) {
        if self.running {
            warn!(combo = %self.combo, "hotkey service dropped while registered");
            self.stop();
        }
    }
}

/// Backend on the `global-hotkey` crate
///
/// Key events arrive through the crate's process-wide event handler, which
/// is installed on register and cleared on unregister. Clearing it drops the
/// sender and closes the key-down sequence.
#[derive(Default)]
pub struct GlobalHotkeyBackend {
    manager: Option<GlobalHotKeyManager>,
    combo: Option<HotkeyCombo>,
}

impl GlobalHotkeyBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HotkeyBackend for GlobalHotkeyBackend {
    fn register(
        &mut self,
        combo: &HotkeyCombo,
        events: mpsc::Sender<Keydown>,
    ) -> Result<(), HotkeyError> {
        let manager =
            GlobalHotKeyManager::new().map_err(|e| HotkeyError::Unavailable(e.to_string()))?;

        let hotkey = combo.to_hotkey();
        let id = hotkey.id();

        GlobalHotKeyEvent::set_event_handler(Some(move |event: GlobalHotKeyEvent| {
            if event.id != id || event.state != HotKeyState::Pressed {
                return;
            }
            match events.try_send(Keydown) {
                Ok(()) => trace!("hotkey pressed"),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!("hotkey press dropped, consumer is behind");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!("hotkey press after consumer closed");
                }
            }
        }));

        if let Err(e) = manager.register(hotkey) {
            GlobalHotKeyEvent::set_event_handler(None::<fn(GlobalHotKeyEvent)>);
            return Err(HotkeyError::Unavailable(e.to_string()));
        }

        self.manager = Some(manager);
        self.combo = Some(combo.clone());
        Ok(())
    }

    fn unregister(&mut self) -> Result<(), HotkeyError> {
        // Clear the handler first so the sequence closes even if the OS call fails
        GlobalHotKeyEvent::set_event_handler(None::<fn(GlobalHotKeyEvent)>);

        let (Some(manager), Some(combo)) = (self.manager.take(), self.combo.take()) else {
            return Ok(());
        };
        manager
            .unregister(combo.to_hotkey())
            .map_err(|e| HotkeyError::Unavailable(e.to_string()))
    }
}
