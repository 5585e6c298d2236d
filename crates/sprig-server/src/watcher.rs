//! File watching and change classification.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use tokio::sync::mpsc as async_mpsc;

use crate::server::ServerError;

/// Capacity of the change event channel. A full channel blocks the
/// classifier thread rather than dropping events.
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// What a matching change should cause.
///
/// Variants are ordered by strength; merging a batch keeps the strongest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchAction {
    /// Republish stylesheet and script only
    PublishAssets,

    /// Full rebuild
    Rebuild,

    /// Tear down the session and start a new one
    Restart,
}

/// A glob pattern bound to an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchBinding {
    /// Glob relative to the watch root, e.g. `**/*.yaml`
    pub pattern: String,

    /// Action fired on a match
    pub action: WatchAction,
}

impl WatchBinding {
    pub fn new(pattern: impl Into<String>, action: WatchAction) -> Self {
        Self {
            pattern: pattern.into(),
            action,
        }
    }
}

/// Compiled bindings, evaluated in registration order.
#[derive(Clone)]
pub struct WatchBindings {
    set: GlobSet,
    bindings: Vec<WatchBinding>,
}

impl fmt::Debug for WatchBindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBindings")
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

impl WatchBindings {
    /// Compile the given bindings.
    pub fn new(bindings: &[WatchBinding]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        for binding in bindings {
            builder.add(Glob::new(&binding.pattern)?);
        }

        Ok(Self {
            set: builder.build()?,
            bindings: bindings.to_vec(),
        })
    }

    /// Actions of every binding matching `rel_path`, in registration order.
    ///
    /// `rel_path` is relative to the watch root with `/` separators.
    pub fn actions_for(&self, rel_path: &str) -> Vec<WatchAction> {
        let mut matched = self.set.matches(rel_path);
        matched.sort_unstable();
        matched
            .into_iter()
            .map(|i| self.bindings[i].action)
            .collect()
    }
}

/// A change to a watched file, already mapped to an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Absolute path of the changed file
    pub path: PathBuf,

    /// Action of the matching binding
    pub action: WatchAction,
}

/// File watcher for detecting changes.
///
/// Dropping the watcher stops event delivery and closes the event channel.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Watch `root` recursively.
    ///
    /// Each file event is matched against `bindings`; every match produces
    /// one [`ChangeEvent`]. Paths under any of `excluded` are ignored.
    /// Returns the watcher and a channel to receive events.
    pub fn new(
        root: &Path,
        bindings: WatchBindings,
        excluded: &[PathBuf],
    ) -> Result<(Self, async_mpsc::Receiver<ChangeEvent>), ServerError> {
        let root = root
            .canonicalize()
            .map_err(|e| ServerError::WatchError(format!("{}: {}", root.display(), e)))?;
        let excluded: Vec<PathBuf> = excluded
            .iter()
            .map(|path| resolve_excluded(&root, path))
            .collect();

        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let mut watcher =
            notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
                Ok(event) => {
                    let _ = sync_tx.send(event);
                }
                Err(e) => tracing::warn!("File watch error: {}", e),
            })
            .map_err(|e| ServerError::WatchError(e.to_string()))?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| ServerError::WatchError(format!("{}: {}", root.display(), e)))?;

        tracing::debug!("Watching {}", root.display());

        std::thread::spawn(move || {
            while let Ok(event) = sync_rx.recv() {
                for change in classify_event(&root, &excluded, &bindings, &event) {
                    tracing::debug!(
                        "Change in {} -> {:?}",
                        change.path.display(),
                        change.action
                    );
                    if async_tx.blocking_send(change).is_err() {
                        return;
                    }
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Map a notify event to change events.
fn classify_event(
    root: &Path,
    excluded: &[PathBuf],
    bindings: &WatchBindings,
    event: &notify::Event,
) -> Vec<ChangeEvent> {
    if !matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        return Vec::new();
    }

    let mut changes = Vec::new();

    for path in &event.paths {
        if excluded.iter().any(|dir| path.starts_with(dir)) {
            continue;
        }

        let Some(rel) = relative_path(root, path) else {
            continue;
        };

        changes.extend(bindings.actions_for(&rel).into_iter().map(|action| ChangeEvent {
            path: path.clone(),
            action,
        }));
    }

    changes
}

/// `path` relative to `root` with `/` separators.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

fn resolve_excluded(root: &Path, path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
