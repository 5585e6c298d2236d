//! Development server with watch, rebuild and live reload for sprig sites.
//!
//! File changes flow from [`FileWatcher`] through a channel into a single
//! [`RebuildLoop`], which serializes builds and notifies browsers through
//! the [`ReloadHub`]. The [`Supervisor`] owns the whole session and replaces
//! it when the configuration changes.

pub mod rebuild;
pub mod server;
pub mod supervisor;
pub mod watcher;
pub mod websocket;

pub use rebuild::{LoopExit, LoopState, Rebuild, RebuildLoop};
pub use server::{DevServer, DevServerConfig, ServerError, ServerHandle};
pub use supervisor::{default_bindings, SessionConfig, Supervisor};
pub use watcher::{ChangeEvent, FileWatcher, WatchAction, WatchBinding, WatchBindings};
pub use websocket::{ReloadHub, ReloadMessage};
