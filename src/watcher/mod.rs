//! Watcher module for the gamelog directory.
//!
//! Provides discovery of recent gamelogs and a subscription to newly
//! created ones.

mod discovery;
mod error;
mod gamelog_watcher;

pub use discovery::{
    parse_log_filename, recent_logs, DefaultLogRoot, FixedLogRoot, LogRootResolver, LOG_EXTENSION,
    LOG_NAME_FORMAT,
};
pub use error::WatcherError;
pub use gamelog_watcher::{GamelogWatcher, WatchEvent};
