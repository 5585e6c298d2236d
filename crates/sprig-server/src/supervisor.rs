//! Session supervision and restarts.
//!
//! A session is one server, one watcher and one rebuild loop. When a
//! `Restart` binding fires, the supervisor stops the whole session, reloads
//! the configuration and starts a fresh one on the same port.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use sprig_static::{SiteBuilder, SiteConfig};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::rebuild::{LoopExit, RebuildLoop, DEFAULT_DEBOUNCE};
use crate::server::{DevServer, DevServerConfig, ServerError, ServerHandle};
use crate::watcher::{FileWatcher, WatchAction, WatchBinding, WatchBindings};
use crate::websocket::ReloadHub;

/// Everything needed to start a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Site sources and output directory
    pub site: SiteConfig,

    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Push reload messages to browsers
    pub live_reload: bool,

    /// Open a browser once the first session is serving
    pub open: bool,

    /// Directory watched recursively
    pub watch_root: PathBuf,

    /// Pattern bindings, in evaluation order
    pub bindings: Vec<WatchBinding>,

    /// Debounce window for change batches
    pub debounce: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let server = DevServerConfig::default();
        Self {
            site: SiteConfig::default(),
            host: server.host,
            port: server.port,
            live_reload: server.live_reload,
            open: false,
            watch_root: PathBuf::from("."),
            bindings: default_bindings(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

impl SessionConfig {
    fn server_config(&self) -> DevServerConfig {
        DevServerConfig {
            output_dir: self.site.output_dir.clone(),
            port: self.port,
            host: self.host.clone(),
            live_reload: self.live_reload,
        }
    }
}

/// Document, stylesheet and script changes all rebuild the whole site.
pub fn default_bindings() -> Vec<WatchBinding> {
    vec![
        WatchBinding::new("**/*.{yaml,yml}", WatchAction::Rebuild),
        WatchBinding::new("**/*.css", WatchAction::Rebuild),
        WatchBinding::new("**/*.js", WatchAction::Rebuild),
    ]
}

/// One running server + watcher + rebuild loop.
struct Session {
    server: ServerHandle,
    watcher: FileWatcher,
    loop_shutdown: watch::Sender<bool>,
    loop_task: Option<JoinHandle<LoopExit>>,
}

impl Session {
    /// Build once, then bind, watch and start the loop.
    async fn start(config: &SessionConfig) -> Result<Self, ServerError> {
        let bindings = WatchBindings::new(&config.bindings)
            .map_err(|e| ServerError::ConfigError(e.to_string()))?;

        let hub = ReloadHub::new();
        let builder = Arc::new(SiteBuilder::new(config.site.clone()));
        let rebuild = RebuildLoop::new(builder, hub.clone()).with_debounce(config.debounce);

        if !rebuild.build_once(WatchAction::Rebuild).await {
            tracing::warn!("Initial build failed; serving previous output until the next change");
        }

        let server = DevServer::new(config.server_config(), hub).bind().await?;

        let (watcher, events) = match FileWatcher::new(
            &config.watch_root,
            bindings,
            &[config.site.output_dir.clone()],
        ) {
            Ok(pair) => pair,
            Err(e) => {
                if let Err(stop_err) = server.shutdown().await {
                    tracing::warn!("Failed to stop server: {}", stop_err);
                }
                return Err(e);
            }
        };

        let (loop_shutdown, shutdown_rx) = watch::channel(false);
        let loop_task = tokio::spawn(rebuild.run(events, shutdown_rx));

        Ok(Self {
            server,
            watcher,
            loop_shutdown,
            loop_task: Some(loop_task),
        })
    }

    /// Wait for the rebuild loop to end on its own.
    async fn wait(&mut self) -> LoopExit {
        let Some(task) = self.loop_task.as_mut() else {
            return std::future::pending().await;
        };

        let exit = task.await;
        self.loop_task = None;

        exit.unwrap_or_else(|e| {
            tracing::error!("Rebuild loop failed: {}", e);
            LoopExit::WatcherClosed
        })
    }

    /// Stop watching, let an in-flight build finish, release the socket.
    async fn stop(self) {
        let Session {
            server,
            watcher,
            loop_shutdown,
            loop_task,
        } = self;

        drop(watcher);
        let _ = loop_shutdown.send(true);
        if let Some(task) = loop_task {
            let _ = task.await;
        }

        if let Err(e) = server.shutdown().await {
            tracing::warn!("Server did not stop cleanly: {}", e);
        }
    }
}

/// Owns the current session and replaces it on restart.
pub struct Supervisor<L> {
    config: SessionConfig,
    reload_config: L,
}

impl<L> Supervisor<L>
where
    L: FnMut() -> Result<SessionConfig, ServerError>,
{
    /// Create a supervisor starting from `config`. `reload_config` is called
    /// on every restart.
    pub fn new(config: SessionConfig, reload_config: L) -> Self {
        Self {
            config,
            reload_config,
        }
    }

    /// Run sessions until `shutdown` resolves.
    ///
    /// Bind and watch setup failures are fatal, including on restart.
    pub async fn run<S>(mut self, shutdown: S) -> Result<(), ServerError>
    where
        S: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut first = true;

        loop {
            let mut session = Session::start(&self.config).await?;
            let url = format!("http://{}", session.server.local_addr());
            tracing::info!("Serving {} at {}", self.config.site.output_dir.display(), url);

            if first && self.config.open {
                let _ = open::that(&url);
            }
            first = false;

            let exit = tokio::select! {
                _ = &mut shutdown => None,
                exit = session.wait() => Some(exit),
            };

            match exit {
                None | Some(LoopExit::Shutdown) => {
                    tracing::info!("Shutting down...");
                    session.stop().await;
                    return Ok(());
                }
                Some(LoopExit::Restart { path }) => {
                    tracing::info!("{} changed, restarting", path.display());
                    session.stop().await;

                    match (self.reload_config)() {
                        Ok(config) => self.config = config,
                        Err(e) => {
                            tracing::error!("Keeping previous configuration: {}", e);
                        }
                    }
                }
                Some(LoopExit::WatcherClosed) => {
                    session.stop().await;
                    return Err(ServerError::WatchError(
                        "file watcher stopped unexpectedly".to_string(),
                    ));
                }
            }
        }
    }
}
