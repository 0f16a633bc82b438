//! HTTP server for receiving push callbacks.

use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::sync::Arc;

use chrono::Utc;
use futures::Stream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::http::{Method, StatusCode};
use warp::path::FullPath;
use warp::reply::WithStatus;
use warp::Filter;

use crate::body::{read_body, BodyError};
use crate::error::{Result, ServerError};
use crate::handler::{CallbackHandler, CallbackPayload};

/// Body of every successful acknowledgment.
const ACK: &str = "OK";

/// HTTP callback server for receiving pushed notifications.
///
/// The `CallbackServer` binds to a local port and accepts requests with any
/// method on any path. Each body is read under a size limit, handed to the
/// [`CallbackHandler`], and acknowledged with `200 OK` once the handler
/// returns. Oversized bodies are answered with `413` and never reach the
/// handler.
///
/// `start` and `stop` are both idempotent. Dropping a running server signals
/// it to shut down without waiting for the drain.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tokio::sync::mpsc;
/// use callback_server::{CallbackServer, ChannelHandler};
///
/// #[tokio::main]
/// async fn main() {
///     let (tx, mut rx) = mpsc::unbounded_channel();
///     let mut server = CallbackServer::new(
///         "127.0.0.1".parse().unwrap(),
///         64 * 1024,
///         Arc::new(ChannelHandler::new(tx)),
///     );
///
///     let addr = server.start(0).await.expect("Failed to start callback server");
///     println!("Server listening at: {addr}");
///
///     while let Some(payload) = rx.recv().await {
///         println!("Received {} bytes", payload.body.len());
///     }
/// }
/// ```
pub struct CallbackServer {
    /// Local address the listening socket binds to
    bind_address: IpAddr,
    /// Maximum accepted body size in bytes
    max_body_bytes: u64,
    /// Receives every accepted payload
    handler: Arc<dyn CallbackHandler>,
    /// Present while the server is bound
    running: Option<RunningServer>,
}

struct RunningServer {
    /// Port passed to `start`, which may be `0`
    requested_port: u16,
    /// Address actually bound
    local_addr: SocketAddr,
    /// Shutdown signal sender; dropping it also stops the server
    shutdown_tx: oneshot::Sender<()>,
    /// Server task handle
    server_handle: JoinHandle<()>,
}

impl CallbackServer {
    /// Create a stopped server. Nothing is bound until [`start`](Self::start).
    pub fn new(
        bind_address: IpAddr,
        max_body_bytes: u64,
        handler: Arc<dyn CallbackHandler>,
    ) -> Self {
        Self {
            bind_address,
            max_body_bytes,
            handler,
            running: None,
        }
    }

    /// Bind the listening socket and start accepting callbacks.
    ///
    /// Returns once the socket is bound. Port `0` binds an ephemeral port;
    /// the returned address carries the port actually used.
    ///
    /// Calling `start` again with the same port (or with the ephemeral port
    /// the server ended up on) is a no-op. Calling it with any other port
    /// while running fails with [`ServerError::AlreadyRunning`].
    pub async fn start(&mut self, port: u16) -> Result<SocketAddr> {
        if let Some(running) = &self.running {
            if port == running.requested_port || port == running.local_addr.port() {
                return Ok(running.local_addr);
            }
            return Err(ServerError::AlreadyRunning {
                port: running.local_addr.port(),
            });
        }

        let addr = SocketAddr::new(self.bind_address, port);
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let routes = Self::routes(self.handler.clone(), self.max_body_bytes);

        let (local_addr, server) = warp::serve(routes)
            .try_bind_with_graceful_shutdown(addr, async move {
                // Either an explicit signal or a dropped sender ends the server
                let _ = shutdown_rx.await;
            })
            .map_err(|source| ServerError::Bind { addr, source })?;

        let server_handle = tokio::spawn(server);

        tracing::info!(%local_addr, "Callback server listening");

        self.running = Some(RunningServer {
            requested_port: port,
            local_addr,
            shutdown_tx,
            server_handle,
        });

        Ok(local_addr)
    }

    /// Stop accepting callbacks and release the port.
    ///
    /// In-flight requests, including the handler work they trigger, finish
    /// before this returns. Does nothing if the server is not running.
    pub async fn stop(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };

        let _ = running.shutdown_tx.send(());

        if let Err(e) = running.server_handle.await {
            tracing::error!(addr = %running.local_addr, "Callback server task failed: {}", e);
        }

        tracing::info!(addr = %running.local_addr, "Callback server stopped");
    }

    /// Whether the server currently holds its port.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Address the server is bound to, if running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    /// Port the server is bound to, if running.
    pub fn port(&self) -> Option<u16> {
        self.local_addr().map(|addr| addr.port())
    }

    /// Build the single catch-all route.
    fn routes(
        handler: Arc<dyn CallbackHandler>,
        max_body_bytes: u64,
    ) -> impl Filter<Extract = (WithStatus<&'static str>,), Error = warp::Rejection>
           + Clone
           + Send
           + Sync
           + 'static {
        warp::method()
            .and(warp::path::full())
            .and(warp::header::optional::<u64>("content-length"))
            .and(warp::body::stream())
            .then(
                move |method: Method, path: FullPath, content_length: Option<u64>, body| {
                    let handler = handler.clone();
                    async move {
                        accept(handler, method, path, content_length, body, max_body_bytes).await
                    }
                },
            )
    }
}

/// Read, forward and acknowledge one request.
async fn accept<S, B>(
    handler: Arc<dyn CallbackHandler>,
    method: Method,
    path: FullPath,
    content_length: Option<u64>,
    body: S,
    max_body_bytes: u64,
) -> WithStatus<&'static str>
where
    S: Stream<Item = std::result::Result<B, warp::Error>>,
    B: bytes::Buf,
{
    if let Some(declared) = content_length {
        if declared > max_body_bytes {
            tracing::warn!(
                path = path.as_str(),
                declared,
                limit = max_body_bytes,
                "Rejected oversized push payload"
            );
            return too_large();
        }
    }

    let body = match read_body(body, max_body_bytes).await {
        Ok(body) => body,
        Err(BodyError::TooLarge { limit }) => {
            tracing::warn!(path = path.as_str(), limit, "Rejected oversized push payload");
            return too_large();
        }
        Err(e) => {
            tracing::warn!(path = path.as_str(), "Dropped push callback: {}", e);
            return warp::reply::with_status("Bad Request", StatusCode::BAD_REQUEST);
        }
    };

    tracing::debug!(
        %method,
        path = path.as_str(),
        bytes = body.len(),
        "Accepted push callback"
    );

    handler
        .handle(CallbackPayload {
            method: method.to_string(),
            path: path.as_str().to_string(),
            body,
            received_at: Utc::now(),
        })
        .await;

    warp::reply::with_status(ACK, StatusCode::OK)
}

fn too_large() -> WithStatus<&'static str> {
    warp::reply::with_status("Payload Too Large", StatusCode::PAYLOAD_TOO_LARGE)
}

/// Detect the local IP address to advertise in notify URLs.
///
/// This uses a UDP socket connection to determine the local IP address
/// that would be used for outbound connections. No data is actually sent.
pub fn detect_local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("8.8.8.8:80").ok()?;
    let local_addr = socket.local_addr().ok()?;
    Some(local_addr.ip())
}
