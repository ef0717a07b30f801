//! Session reader error types.

use std::path::PathBuf;

/// Errors that can occur while opening or reading a gamelog.
#[derive(thiserror::Error, Debug)]
pub enum ReaderError {
    /// The header has no `Listener:` line, so the file belongs to no character.
    #[error("Not a character log: {0}")]
    NotCharacterLog(PathBuf),

    /// Two characters logged in during the same second and share one file.
    #[error("Log file collision between {character} and {other}: {path}")]
    HeaderCollision {
        path: PathBuf,
        character: String,
        other: String,
    },

    /// Log file was deleted.
    #[error("Log file deleted: {0}")]
    FileDeleted(PathBuf),

    /// Permission denied accessing file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// File shrank below the read cursor.
    #[error("Log file truncated below read position: {0}")]
    Truncated(PathBuf),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ReaderError {
    /// Classify an I/O error raised while opening `path`.
    pub(crate) fn from_open(path: &std::path::Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileDeleted(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io(err),
        }
    }
}
