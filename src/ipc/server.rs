//! Unix domain socket server for the front-end bridge
//!
//! Provides request-response communication and push notifications of
//! overlay events to subscribed clients.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::events::OverlayEvent;
use crate::relay::RelaySender;
use crate::ui::UiCommand;

use super::protocol::{Notification, OverlayStatus, Request, Response, MAX_MESSAGE_LEN};

/// IPC Server handling front-end connections
pub struct Server {
    socket_path: PathBuf,
    listener: UnixListener,
    shared: Shared,
    shutdown_tx: broadcast::Sender<()>,
}

/// State handed to every client handler
#[derive(Clone)]
struct Shared {
    state: Arc<RwLock<ServerState>>,
    /// Show/hide requests for the window thread
    requests: RelaySender<UiCommand>,
    /// Overlay events to push to subscribed clients
    events: broadcast::Sender<OverlayEvent>,
}

struct ServerState {
    status: OverlayStatus,
    start_time: Instant,
}

type SharedWriter = Arc<Mutex<OwnedWriteHalf>>;

impl Server {
    /// Bind the socket. Must be called inside a tokio runtime.
    pub fn bind(
        socket_path: &Path,
        requests: RelaySender<UiCommand>,
        events: broadcast::Sender<OverlayEvent>,
    ) -> Result<Self> {
        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))
                .context("failed to restrict socket permissions")?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        let state = Arc::new(RwLock::new(ServerState {
            status: OverlayStatus::default(),
            start_time: Instant::now(),
        }));

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener,
            shared: Shared {
                state,
                requests,
                events,
            },
            shutdown_tx,
        })
    }

    /// Record overlay visibility as reported by the window thread
    pub async fn set_visible(&self, visible: bool) {
        let mut state = self.shared.state.write().await;
        if state.status.visible != visible {
            debug!(visible, "IPC server: visibility updated");
        }
        state.status.visible = visible;
    }

    /// Record whether the global hotkey could be registered
    pub async fn set_hotkey_registered(&self, registered: bool) {
        self.shared.state.write().await.status.hotkey_registered = registered;
    }

    /// Run the server, accepting connections until shutdown
    pub async fn run(&self) -> Result<()> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            let accepted = tokio::select! {
                accepted = self.listener.accept() => accepted,
                _ = shutdown_rx.recv() => return Ok(()),
            };

            match accepted {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let shared = self.shared.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = Self::handle_client(stream, shared) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Handle a single client connection
    async fn handle_client(stream: UnixStream, shared: Shared) -> Result<()> {
        let (mut reader, writer) = stream.into_split();
        let writer: SharedWriter = Arc::new(Mutex::new(writer));
        let mut pusher = None;

        let result = loop {
            let msg_buf = match read_message(&mut reader).await {
                Ok(Some(buf)) => buf,
                Ok(None) => {
                    debug!("client disconnected");
                    break Ok(());
                }
                Err(e) => break Err(e),
            };

            // Subscribed before answering so nothing fired in between is lost
            let mut subscription = None;
            let response = match serde_json::from_slice::<Request>(&msg_buf) {
                Ok(request) => {
                    debug!(?request, "received request");
                    if request == Request::Subscribe && pusher.is_none() {
                        subscription = Some(shared.events.subscribe());
                    }
                    Self::process_request(request, &shared).await
                }
                Err(e) => {
                    warn!(%e, "malformed request");
                    Response::error("bad_request", e.to_string())
                }
            };

            {
                let mut writer = writer.lock().await;
                if let Err(e) = send_message(&mut *writer, &response).await {
                    break Err(e);
                }
            }

            // Notifications only start once the client has its response
            if let Some(events) = subscription {
                pusher = Some(tokio::spawn(push_events(events, Arc::clone(&writer))));
                debug!("client subscribed to notifications");
            }
        };

        if let Some(pusher) = pusher {
            pusher.abort();
        }
        result
    }

    /// Process a request and return a response
    async fn process_request(request: Request, shared: &Shared) -> Response {
        match request {
            Request::Ping => Response::Pong,

            Request::GetStatus => {
                let mut state = shared.state.write().await;
                state.status.uptime_secs = state.start_time.elapsed().as_secs();
                Response::Status(state.status.clone())
            }

            Request::RequestShow => Self::forward(UiCommand::Show, shared).await,

            Request::RequestHide => Self::forward(UiCommand::Hide, shared).await,

            Request::Subscribe => Response::Subscribed,
        }
    }

    async fn forward(command: UiCommand, shared: &Shared) -> Response {
        match shared.requests.send(command).await {
            Ok(()) => {
                info!(?command, "front-end request accepted");
                Response::Accepted
            }
            Err(e) => Response::error("unavailable", e.to_string()),
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Forward overlay events to one subscribed client
async fn push_events(mut events: broadcast::Receiver<OverlayEvent>, writer: SharedWriter) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(n)) => {
                // Visibility is idempotent; the next event carries the current state
                warn!(skipped = n, "subscriber lagged");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return,
        };

        let note = Notification::Overlay { event };
        let mut writer = writer.lock().await;
        if let Err(e) = send_message(&mut *writer, &note).await {
            debug!(?e, "push failed, dropping subscriber");
            return;
        }
    }
}

/// Read one length-prefixed message. `None` on clean disconnect.
async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_MESSAGE_LEN {
        anyhow::bail!("message too large ({} bytes)", len);
    }

    let mut msg_buf = vec![0u8; len];
    reader
        .read_exact(&mut msg_buf)
        .await
        .context("truncated message")?;
    Ok(Some(msg_buf))
}

/// Send a length-prefixed JSON message
async fn send_message<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: serde::Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;
    writer.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::relay::testing::CountingWaker;
    use crate::relay::{self, RelayReceiver};

    struct TestServer {
        server: Arc<Server>,
        requests: RelayReceiver<UiCommand>,
        events: broadcast::Sender<OverlayEvent>,
        path: PathBuf,
    }

    fn socket_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("qs-{}-{}.sock", std::process::id(), name))
    }

    fn start(name: &str) -> TestServer {
        let path = socket_path(name);
        let (tx, requests) = relay::channel(16, Arc::new(CountingWaker::default()));
        let (events, _) = broadcast::channel(16);
        let server = Arc::new(Server::bind(&path, tx, events.clone()).unwrap());

        let runner = Arc::clone(&server);
        tokio::spawn(async move { runner.run().await });

        TestServer {
            server,
            requests,
            events,
            path,
        }
    }

    async fn call(stream: &mut UnixStream, request: &Request) -> Response {
        send_message(stream, request).await.unwrap();
        let body = read_message(stream).await.unwrap().unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_ping() {
        let t = start("ping");
        let mut stream = UnixStream::connect(&t.path).await.unwrap();

        assert_eq!(call(&mut stream, &Request::Ping).await, Response::Pong);
        t.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_show_and_hide_reach_window_thread() {
        let mut t = start("show-hide");
        let mut stream = UnixStream::connect(&t.path).await.unwrap();

        assert_eq!(call(&mut stream, &Request::RequestShow).await, Response::Accepted);
        assert_eq!(call(&mut stream, &Request::RequestHide).await, Response::Accepted);

        assert_eq!(t.requests.try_recv(), Some(UiCommand::Show));
        assert_eq!(t.requests.try_recv(), Some(UiCommand::Hide));
        t.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_request_after_window_thread_closed() {
        let mut t = start("closed");
        t.requests.close();
        let mut stream = UnixStream::connect(&t.path).await.unwrap();

        let response = call(&mut stream, &Request::RequestShow).await;
        assert!(matches!(response, Response::Error { code, .. } if code == "unavailable"));
        t.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_status_reflects_visibility() {
        let t = start("status");
        t.server.set_visible(true).await;
        t.server.set_hotkey_registered(true).await;
        let mut stream = UnixStream::connect(&t.path).await.unwrap();

        match call(&mut stream, &Request::GetStatus).await {
            Response::Status(status) => {
                assert!(status.visible);
                assert!(status.hotkey_registered);
            }
            other => panic!("unexpected response: {:?}", other),
        }
        t.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_malformed_request_keeps_connection() {
        let t = start("malformed");
        let mut stream = UnixStream::connect(&t.path).await.unwrap();

        send_message(&mut stream, &serde_json::json!({"type": "launch_rockets"}))
            .await
            .unwrap();
        let body = read_message(&mut stream).await.unwrap().unwrap();
        let response: Response = serde_json::from_slice(&body).unwrap();
        assert!(matches!(response, Response::Error { code, .. } if code == "bad_request"));

        assert_eq!(call(&mut stream, &Request::Ping).await, Response::Pong);
        t.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_subscriber_receives_show_overlay() {
        let t = start("subscribe");
        let mut stream = UnixStream::connect(&t.path).await.unwrap();

        assert_eq!(call(&mut stream, &Request::Subscribe).await, Response::Subscribed);
        t.events.send(OverlayEvent::ShowOverlay).unwrap();

        let body = tokio::time::timeout(Duration::from_secs(5), read_message(&mut stream))
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let note: Notification = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            note,
            Notification::Overlay {
                event: OverlayEvent::ShowOverlay
            }
        );
        t.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_subscribed_arrives_before_first_notification() {
        let t = start("subscribe-order");
        let mut stream = UnixStream::connect(&t.path).await.unwrap();
        send_message(&mut stream, &Request::Subscribe).await.unwrap();

        // Fire as soon as the handler holds a receiver
        tokio::time::timeout(Duration::from_secs(5), async {
            while t.events.send(OverlayEvent::ShowOverlay).is_err() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        let first = read_message(&mut stream).await.unwrap().unwrap();
        let response: Response = serde_json::from_slice(&first).unwrap();
        assert_eq!(response, Response::Subscribed);

        let second = tokio::time::timeout(Duration::from_secs(5), read_message(&mut stream))
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let note: Notification = serde_json::from_slice(&second).unwrap();
        assert_eq!(
            note,
            Notification::Overlay {
                event: OverlayEvent::ShowOverlay
            }
        );
        t.server.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_removes_socket() {
        let t = start("shutdown");
        assert!(t.path.exists());
        t.server.shutdown().await;
        assert!(!t.path.exists());
    }
}
