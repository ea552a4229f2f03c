//! Dispatch of relayed commands and window input to the controller

use tracing::{debug, error, warn};

use crate::relay::RelayReceiver;
use crate::state::{OverlayState, VisibilityController};
use crate::window::{WindowError, WindowSurface};

use super::UiCommand;

/// What the event loop should do after handling an input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Main-thread owner of the visibility controller
pub struct OverlayApp<W: WindowSurface> {
    controller: VisibilityController<W>,
    hotkey_rx: RelayReceiver<UiCommand>,
    request_rx: RelayReceiver<UiCommand>,
}

impl<W: WindowSurface> OverlayApp<W> {
    pub fn new(
        controller: VisibilityController<W>,
        hotkey_rx: RelayReceiver<UiCommand>,
        request_rx: RelayReceiver<UiCommand>,
    ) -> Self {
        Self {
            controller,
            hotkey_rx,
            request_rx,
        }
    }

    pub fn state(&self) -> OverlayState {
        self.controller.state()
    }

    /// Handle everything pending on both relays
    pub fn drain(&mut self) -> Flow {
        while let Some(command) = self
            .hotkey_rx
            .try_recv()
            .or_else(|| self.request_rx.try_recv())
        {
            if self.dispatch(command) == Flow::Exit {
                return Flow::Exit;
            }
        }
        Flow::Continue
    }

    /// Apply one relayed command
    pub fn dispatch(&mut self, command: UiCommand) -> Flow {
        debug!(?command, "dispatching");
        let result = match command {
            UiCommand::Hotkey => self.controller.on_hotkey(),
            UiCommand::Show => self.controller.show(),
            UiCommand::Hide => self.controller.hide(),
        };
        Self::settle(result)
    }

    /// Escape pressed in the overlay
    pub fn on_escape(&mut self) -> Flow {
        Self::settle(self.controller.on_escape())
    }

    /// Overlay window lost focus
    pub fn on_blur(&mut self) -> Flow {
        Self::settle(self.controller.on_blur())
    }

    /// Stop accepting relayed commands
    pub fn close(&mut self) {
        self.hotkey_rx.close();
        self.request_rx.close();
    }

    fn settle(result: Result<(), WindowError>) -> Flow {
        match result {
            Ok(()) => Flow::Continue,
            Err(e) if e.is_fatal() => {
                error!(%e, "overlay window is gone");
                Flow::Exit
            }
            Err(e) => {
                warn!(%e, "window operation failed");
                Flow::Continue
            }
        }
    }

    #[cfg(test)]
    fn surface_mut(&mut self) -> &mut W {
        self.controller.surface_mut()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast;
    use tokio_test::{assert_pending, assert_ready, task};

    use super::*;
    use crate::events::OverlayEvent;
    use crate::hotkey::testing::FakeBackend;
    use crate::hotkey::{HotkeyCombo, HotkeyService};
    use crate::relay::testing::CountingWaker;
    use crate::relay::{self, forward_hotkeys, Offer, RelaySender};
    use crate::window::testing::RecordingSurface;
    use crate::window::WindowOp;

    struct Harness {
        app: OverlayApp<RecordingSurface>,
        hotkey_tx: RelaySender<UiCommand>,
        request_tx: RelaySender<UiCommand>,
        events: broadcast::Receiver<OverlayEvent>,
    }

    fn harness_with(surface: RecordingSurface) -> Harness {
        let waker = Arc::new(CountingWaker::default());
        let (hotkey_tx, hotkey_rx) = relay::channel(1, waker.clone());
        let (request_tx, request_rx) = relay::channel(16, waker);
        let (event_tx, events) = broadcast::channel(16);
        let controller = VisibilityController::new(surface, event_tx);

        Harness {
            app: OverlayApp::new(controller, hotkey_rx, request_rx),
            hotkey_tx,
            request_tx,
            events,
        }
    }

    fn harness() -> Harness {
        harness_with(RecordingSurface::default())
    }

    #[test]
    fn test_two_rapid_presses_run_one_show_cycle() {
        let mut h = harness();

        assert_eq!(h.hotkey_tx.offer(UiCommand::Hotkey), Offer::Queued);
        assert_eq!(h.hotkey_tx.offer(UiCommand::Hotkey), Offer::Coalesced);
        assert_eq!(h.app.drain(), Flow::Continue);

        assert_eq!(h.app.state(), OverlayState::Visible);
        assert_eq!(
            h.app.surface_mut().take(),
            [
                WindowOp::Show,
                WindowOp::Center,
                WindowOp::SetAlwaysOnTop(true)
            ]
        );
        assert_eq!(h.events.try_recv().unwrap(), OverlayEvent::ShowOverlay);
        assert!(h.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_front_end_requests_are_queued_in_order() {
        let mut h = harness();

        h.request_tx.send(UiCommand::Show).await.unwrap();
        h.request_tx.send(UiCommand::Hide).await.unwrap();
        h.request_tx.send(UiCommand::Show).await.unwrap();
        h.app.drain();

        assert_eq!(h.app.state(), OverlayState::Visible);
        assert_eq!(h.app.surface_mut().take().len(), 7);
    }

    #[test]
    fn test_escape_and_blur_hide() {
        let mut h = harness();
        h.app.dispatch(UiCommand::Hotkey);
        h.app.surface_mut().take();

        assert_eq!(h.app.on_escape(), Flow::Continue);
        assert_eq!(h.app.state(), OverlayState::Hidden);
        assert_eq!(h.app.surface_mut().take(), [WindowOp::Hide]);

        h.app.dispatch(UiCommand::Show);
        h.app.on_blur();
        assert_eq!(h.app.state(), OverlayState::Hidden);
    }

    #[test]
    fn test_window_failure_does_not_stop_loop() {
        let mut h = harness_with(RecordingSurface::failing_on(WindowOp::Center));
        assert_eq!(h.app.dispatch(UiCommand::Hotkey), Flow::Continue);
    }

    #[test]
    fn test_missing_surface_stops_loop() {
        assert_eq!(
            OverlayApp::<RecordingSurface>::settle(Err(WindowError::NoSurface)),
            Flow::Exit
        );
    }

    #[test]
    fn test_closed_app_rejects_relayed_commands() {
        let mut h = harness();
        h.app.close();
        assert_eq!(h.hotkey_tx.offer(UiCommand::Hotkey), Offer::Closed);
    }

    #[tokio::test]
    async fn test_manual_control_without_hotkey() {
        let mut service = HotkeyService::new(FakeBackend::denying(), HotkeyCombo::default());
        assert!(service.start().is_err());

        let mut h = harness();
        h.request_tx.send(UiCommand::Show).await.unwrap();
        h.app.drain();
        assert_eq!(h.app.state(), OverlayState::Visible);

        h.request_tx.send(UiCommand::Hide).await.unwrap();
        h.app.drain();
        assert_eq!(h.app.state(), OverlayState::Hidden);
    }

    #[test]
    fn test_hotkey_to_window_end_to_end() {
        let backend = FakeBackend::default();
        let mut service = HotkeyService::new(backend.clone(), HotkeyCombo::default());
        let keydowns = service.start().unwrap();
        let mut h = harness();

        let mut forwarder = task::spawn(forward_hotkeys(keydowns, h.hotkey_tx.clone()));
        assert!(backend.press());
        assert_pending!(forwarder.poll());
        service.stop();
        assert_ready!(forwarder.poll());

        h.app.drain();
        assert_eq!(h.app.state(), OverlayState::Visible);
        assert!(!backend.press());
    }
}
