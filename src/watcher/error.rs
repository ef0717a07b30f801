//! Watcher error types.

use std::path::PathBuf;

/// Errors that can occur while discovering or watching gamelogs.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// The gamelog directory does not exist.
    #[error("Gamelog directory not found: {0}")]
    RootNotFound(PathBuf),

    /// No gamelog directory could be resolved for this platform.
    #[error("Could not resolve the gamelog directory")]
    NoLogRoot,

    /// Notify watcher error.
    #[error("File watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
