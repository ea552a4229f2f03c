//! Hand-off from background tasks into the main-thread event loop
//!
//! A relay is a bounded channel paired with a wake hook. Senders live on
//! tokio tasks; the receiver is drained with `try_recv` on the main thread
//! after the hook wakes the event loop.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::hotkey::Keydowns;
use crate::ui::UiCommand;

/// Wakes the thread that owns a relay receiver
pub trait Wake: Send + Sync + 'static {
    fn wake(&self);
}

/// Outcome of a non-blocking offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Message queued and the receiver woken
    Queued,
    /// Relay full; the pending message stands in for this one
    Coalesced,
    /// Receiver gone
    Closed,
}

/// Receiver side was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("relay receiver closed")]
pub struct RelayClosed;

/// Sending half of a relay
pub struct RelaySender<T> {
    tx: mpsc::Sender<T>,
    waker: Arc<dyn Wake>,
}

impl<T> Clone for RelaySender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            waker: Arc::clone(&self.waker),
        }
    }
}

impl<T> RelaySender<T> {
    /// Offer a message without waiting. A full relay drops it.
    pub fn offer(&self, msg: T) -> Offer {
        match self.tx.try_send(msg) {
            Ok(()) => {
                self.waker.wake();
                Offer::Queued
            }
            Err(mpsc::error::TrySendError::Full(_)) => Offer::Coalesced,
            Err(mpsc::error::TrySendError::Closed(_)) => Offer::Closed,
        }
    }

    /// Send a message, waiting for room
    pub async fn send(&self, msg: T) -> Result<(), RelayClosed> {
        self.tx.send(msg).await.map_err(|_| RelayClosed)?;
        self.waker.wake();
        Ok(())
    }
}

/// Receiving half of a relay
pub struct RelayReceiver<T> {
    rx: mpsc::Receiver<T>,
}

impl<T> RelayReceiver<T> {
    /// Take the pending message, if any
    pub fn try_recv(&mut self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Stop accepting messages; pending ones can still be drained
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// Create a relay holding at most `capacity` pending messages
pub fn channel<T>(capacity: usize, waker: Arc<dyn Wake>) -> (RelaySender<T>, RelayReceiver<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (RelaySender { tx, waker }, RelayReceiver { rx })
}

/// Consume hotkey presses and relay them as show requests.
///
/// Runs until the hotkey is unregistered or the event loop is gone.
pub async fn forward_hotkeys(mut keydowns: Keydowns, relay: RelaySender<UiCommand>) {
    info!("hotkey relay started");

    while keydowns.next().await.is_some() {
        match relay.offer(UiCommand::Hotkey) {
            Offer::Queued => trace!("show request relayed"),
            Offer::Coalesced => debug!("show request already pending, press coalesced"),
            Offer::Closed => {
                debug!("event loop gone, dropping hotkey relay");
                break;
            }
        }
    }

    info!("hotkey relay stopped");
}
