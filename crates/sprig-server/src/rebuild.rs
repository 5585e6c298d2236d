//! Serialized rebuilds driven by change events.
//!
//! [`RebuildLoop`] is the only caller of the site builder while a session is
//! running. It consumes [`ChangeEvent`]s from the watcher one batch at a
//! time: after the first event of a batch it waits for the debounce window,
//! drains everything queued and runs one build for the strongest action in
//! the batch. Events arriving during a build stay in the channel and form
//! the next batch, so the last build always starts after the last event.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use sprig_static::{BuildError, BuildOutput, PublishedAsset, SiteBuilder};
use tokio::sync::{mpsc, watch};

use crate::watcher::{ChangeEvent, WatchAction};
use crate::websocket::{ReloadHub, ReloadMessage};

/// Default debounce window.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// Build operations the loop can run.
pub trait Rebuild: Send + Sync + 'static {
    /// Full rebuild of the output directory.
    fn rebuild(&self) -> Result<BuildOutput, BuildError>;

    /// Republish stylesheet and script only.
    fn publish_assets(&self) -> Result<Vec<PublishedAsset>, BuildError>;
}

impl Rebuild for SiteBuilder {
    fn rebuild(&self) -> Result<BuildOutput, BuildError> {
        self.build()
    }

    fn publish_assets(&self) -> Result<Vec<PublishedAsset>, BuildError> {
        SiteBuilder::publish_assets(self)
    }
}

/// Loop state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Building,
}

/// Why the loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopExit {
    /// A `Restart` binding matched
    Restart { path: PathBuf },

    /// Shutdown was requested
    Shutdown,

    /// The event channel closed
    WatcherClosed,
}

/// Events merged into one build.
#[derive(Debug)]
struct Batch {
    action: WatchAction,
    path: PathBuf,
    events: usize,
}

impl Batch {
    fn new(event: ChangeEvent) -> Self {
        Self {
            action: event.action,
            path: event.path,
            events: 1,
        }
    }

    fn merge(&mut self, event: ChangeEvent) {
        if event.action >= self.action {
            self.action = event.action;
            self.path = event.path;
        }
        self.events += 1;
    }
}

/// Consumes change events and runs builds one at a time.
pub struct RebuildLoop<B> {
    builder: Arc<B>,
    hub: ReloadHub,
    debounce: Duration,
    state: watch::Sender<LoopState>,
}

impl<B: Rebuild> RebuildLoop<B> {
    /// Create a loop around `builder`, notifying `hub` after builds.
    pub fn new(builder: Arc<B>, hub: ReloadHub) -> Self {
        let (state, _) = watch::channel(LoopState::Idle);
        Self {
            builder,
            hub,
            debounce: DEFAULT_DEBOUNCE,
            state,
        }
    }

    /// Set the debounce window. Zero disables waiting; queued events are
    /// still merged.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Observe the loop state.
    pub fn state(&self) -> watch::Receiver<LoopState> {
        self.state.subscribe()
    }

    /// Run one build outside the event stream, e.g. before serving starts.
    ///
    /// Returns whether the build succeeded.
    pub async fn build_once(&self, action: WatchAction) -> bool {
        self.execute(action).await
    }

    /// Process events until shutdown, a restart or the channel closing.
    ///
    /// A build in flight when shutdown is requested runs to completion.
    pub async fn run(
        self,
        mut events: mpsc::Receiver<ChangeEvent>,
        mut shutdown: watch::Receiver<bool>,
    ) -> LoopExit {
        loop {
            let first = tokio::select! {
                biased;
                _ = stop_requested(&mut shutdown) => return LoopExit::Shutdown,
                event = events.recv() => match event {
                    Some(event) => event,
                    None => return LoopExit::WatcherClosed,
                },
            };

            let batch = self.collect_batch(first, &mut events).await;

            tracing::debug!(
                "Batch of {} change(s), action {:?}",
                batch.events,
                batch.action
            );

            if batch.action == WatchAction::Restart {
                return LoopExit::Restart { path: batch.path };
            }

            log_trigger(&batch.path);
            self.execute(batch.action).await;
        }
    }

    async fn collect_batch(
        &self,
        first: ChangeEvent,
        events: &mut mpsc::Receiver<ChangeEvent>,
    ) -> Batch {
        let mut batch = Batch::new(first);

        if !self.debounce.is_zero() {
            tokio::time::sleep(self.debounce).await;
        }

        while let Ok(event) = events.try_recv() {
            batch.merge(event);
        }

        batch
    }

    async fn execute(&self, action: WatchAction) -> bool {
        self.state.send_replace(LoopState::Building);

        let builder = Arc::clone(&self.builder);
        let result = tokio::task::spawn_blocking(move || -> Result<(), BuildError> {
            match action {
                WatchAction::PublishAssets => {
                    let assets = builder.publish_assets()?;
                    tracing::info!("Published {} assets", assets.len());
                }
                WatchAction::Rebuild | WatchAction::Restart => {
                    let output = builder.rebuild()?;
                    tracing::info!(
                        "Built {} in {}ms",
                        output.output_dir.display(),
                        output.duration_ms
                    );
                }
            }
            Ok(())
        })
        .await;

        self.state.send_replace(LoopState::Idle);

        match result {
            Ok(Ok(())) => {
                self.hub.send(ReloadMessage::Reload);
                true
            }
            Ok(Err(e)) => {
                tracing::error!("Build failed: {}", e);
                self.hub.send(ReloadMessage::BuildFailed {
                    message: e.to_string(),
                });
                false
            }
            Err(e) => {
                tracing::error!("Build task failed: {}", e);
                false
            }
        }
    }
}

fn log_trigger(path: &Path) {
    tracing::info!("Change detected: {}", path.display());
}

/// Resolves once `shutdown` is true or its sender is gone.
pub(crate) async fn stop_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
