//! quick-search-overlay: global hotkey daemon for the quick search window
//!
//! Provides:
//! - Global hotkey (CmdOrCtrl+G by default) that shows the overlay
//! - Two-state visibility controller driving the overlay window
//! - IPC bridge for the front-end (show-overlay events, show/hide requests)
//!
//! The main thread runs the window event loop. Background work runs on a
//! tokio runtime and reaches the window only through relays.

mod config;
mod events;
mod hotkey;
mod ipc;
mod lifecycle;
mod relay;
mod state;
mod ui;
mod window;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::events::OverlayEvent;
use crate::hotkey::{GlobalHotkeyBackend, HotkeyService};
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::relay::Wake;
use crate::state::VisibilityController;
use crate::ui::{OverlayApp, ProxyWaker};
use crate::window::WinitSurface;

/// Hotkey presses waiting for the window thread; extra presses coalesce
const HOTKEY_RELAY_CAPACITY: usize = 1;
/// Front-end requests waiting for the window thread
const REQUEST_RELAY_CAPACITY: usize = 16;

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "quick-search-overlay starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.socket_path, hotkey = %config.hotkey, "configuration loaded");

    // The main thread belongs to the event loop, so tokio gets its own workers
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .thread_name("overlay-worker")
        .build()
        .context("failed to build tokio runtime")?;

    let event_loop = ui::build_event_loop()?;
    let waker = Arc::new(ProxyWaker::new(event_loop.create_proxy()));
    let wake: Arc<dyn Wake> = waker.clone();

    // Channels between components
    // Hotkey relay -> window thread
    let (hotkey_tx, hotkey_rx) = relay::channel(HOTKEY_RELAY_CAPACITY, Arc::clone(&wake));
    // IPC server -> window thread
    let (request_tx, request_rx) = relay::channel(REQUEST_RELAY_CAPACITY, wake);
    // Visibility controller -> IPC server
    let (event_tx, _event_rx) = broadcast::channel::<OverlayEvent>(16);

    let surface = WinitSurface::build(&event_loop)?;
    let controller = VisibilityController::new(surface, event_tx.clone());
    let app = OverlayApp::new(controller, hotkey_rx, request_rx);

    // Register the hotkey on the main thread
    let mut hotkeys = HotkeyService::new(GlobalHotkeyBackend::new(), config.hotkey.clone());
    match hotkeys.start() {
        Ok(keydowns) => {
            runtime.spawn(relay::forward_hotkeys(keydowns, hotkey_tx));
        }
        Err(e) => {
            error!(%e, "failed to register global hotkey");
            warn!("continuing without global hotkey - overlay still opens via IPC");
        }
    }

    // Front-end bridge
    let server = {
        let _guard = runtime.enter();
        Arc::new(Server::bind(&config.socket_path, request_tx, event_tx.clone())?)
    };
    runtime.block_on(server.set_hotkey_registered(hotkeys.is_running()));

    let server_for_run = Arc::clone(&server);
    runtime.spawn(async move {
        if let Err(e) = server_for_run.run().await {
            error!(?e, "IPC server error");
        }
    });

    // Keep the server's view of visibility in sync with the controller
    let server_for_events = Arc::clone(&server);
    let mut ipc_event_rx = event_tx.subscribe();
    runtime.spawn(async move {
        loop {
            match ipc_event_rx.recv().await {
                Ok(event) => server_for_events.set_visible(event.visible()).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "overlay event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Signals end the event loop; teardown happens on the main thread
    let waker_for_signals = Arc::clone(&waker);
    runtime.spawn(async move {
        if let Err(e) = ShutdownSignal::new().wait().await {
            error!(?e, "failed to install signal handlers");
            return;
        }
        info!("shutdown signal received");
        waker_for_signals.request_shutdown();
    });

    info!("daemon initialized, entering main loop");
    let result = ui::run(event_loop, app, hotkeys);

    // Cleanup
    info!("shutting down...");
    runtime.block_on(server.shutdown());
    runtime.shutdown_timeout(Duration::from_secs(1));

    info!("quick-search-overlay stopped");
    result
}
