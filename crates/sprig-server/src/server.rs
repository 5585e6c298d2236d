//! Development server implementation.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use sprig_static::INDEX_FILE;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

use crate::rebuild::stop_requested;
use crate::websocket::{
    inject_reload_script, reload_client_script, ReloadHub, ReloadMessage, RELOAD_SCRIPT_PATH,
    RELOAD_WS_PATH,
};

/// How long open connections get to finish after shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(3);

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Directory to serve
    pub output_dir: PathBuf,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Inject the reload script and accept reload sockets
    pub live_reload: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            port: 8000,
            host: "127.0.0.1".to_string(),
            live_reload: true,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind to {0}: {1}")]
    BindError(String, String),

    #[error("File watch error: {0}")]
    WatchError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServeError(String),
}

/// Shared server state.
struct ServerState {
    config: DevServerConfig,
    hub: ReloadHub,
    shutdown: watch::Receiver<bool>,
}

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
    hub: ReloadHub,
}

impl DevServer {
    /// Create a new development server broadcasting from `hub`.
    pub fn new(config: DevServerConfig, hub: ReloadHub) -> Self {
        Self { config, hub }
    }

    /// Bind the listening socket and start serving in the background.
    ///
    /// Binding happens before this returns, so a busy port is reported here.
    pub async fn bind(self) -> Result<ServerHandle, ServerError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let listener = tokio::net::TcpListener::bind(addr.as_str())
            .await
            .map_err(|e| ServerError::BindError(addr.clone(), e.to_string()))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let state = Arc::new(ServerState {
            config: self.config,
            hub: self.hub,
            shutdown: shutdown_rx.clone(),
        });
        let app = router(state);

        let mut signal = shutdown_rx;
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop_requested(&mut signal).await })
                .await
        });

        tracing::debug!("Listening on {}", local_addr);

        Ok(ServerHandle {
            local_addr,
            shutdown: shutdown_tx,
            task,
        })
    }
}

/// A running server.
///
/// Owned by whoever started it; [`ServerHandle::shutdown`] releases the
/// listening socket before returning.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    /// Address the server is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and wait for the server task to end.
    ///
    /// Open connections get a short grace period before the task is
    /// aborted.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        let _ = self.shutdown.send(true);
        let mut task = self.task;

        match tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(ServerError::ServeError(e.to_string())),
            Ok(Err(e)) => Err(ServerError::ServeError(e.to_string())),
            Err(_) => {
                tracing::warn!(
                    "Connections still open after {:?}, closing server on {}",
                    SHUTDOWN_GRACE,
                    self.local_addr
                );
                task.abort();
                let _ = task.await;
                Ok(())
            }
        }
    }
}

fn router(state: Arc<ServerState>) -> Router {
    let serve_dir = ServeDir::new(&state.config.output_dir);

    let mut router = Router::new()
        .route("/", get(index_handler))
        .route(&format!("/{INDEX_FILE}"), get(index_handler));

    if state.config.live_reload {
        router = router
            .route(RELOAD_WS_PATH, get(ws_handler))
            .route(RELOAD_SCRIPT_PATH, get(reload_script_handler));
    }

    router.fallback_service(serve_dir).with_state(state)
}

/// Handler for the generated markup.
async fn index_handler(State(state): State<Arc<ServerState>>) -> Response {
    let path = state.config.output_dir.join(INDEX_FILE);

    match tokio::fs::read_to_string(&path).await {
        Ok(markup) if state.config.live_reload => Html(inject_reload_script(&markup)).into_response(),
        Ok(markup) => Html(markup).into_response(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            (StatusCode::NOT_FOUND, "Not found").into_response()
        }
        Err(e) => {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read page").into_response()
        }
    }
}

/// Handler for the reload WebSocket endpoint.
async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Forward reload messages to one client until it or the server goes away.
async fn handle_ws(mut socket: WebSocket, state: Arc<ServerState>) {
    let mut rx = state.hub.subscribe();
    let mut shutdown = state.shutdown.clone();

    if send_message(&mut socket, &ReloadMessage::Connected)
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            _ = stop_requested(&mut shutdown) => break,
            msg = rx.recv() => match msg {
                Ok(msg) => {
                    if send_message(&mut socket, &msg).await.is_err() {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    let _ = socket.send(Message::Close(None)).await;
}

async fn send_message(socket: &mut WebSocket, msg: &ReloadMessage) -> Result<(), axum::Error> {
    let json = serde_json::to_string(msg).map_err(axum::Error::new)?;
    socket.send(Message::Text(json.into())).await
}

/// Handler for the reload client script.
async fn reload_script_handler() -> impl IntoResponse {
    (
        [("content-type", "application/javascript")],
        reload_client_script(),
    )
}
