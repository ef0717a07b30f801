//! Character directory error types.

use crate::reader::ReaderError;

/// Errors returned by [`CharacterDirectory`](super::CharacterDirectory) operations.
#[derive(thiserror::Error, Debug)]
pub enum DirectoryError {
    /// The requested selection has no registry entry.
    #[error("Selection {index} out of range ({len} characters)")]
    SelectionOutOfRange { index: usize, len: usize },

    /// No registry entry for this character.
    #[error("Unknown character: {0}")]
    UnknownCharacter(String),

    /// Opening a gamelog failed.
    #[error(transparent)]
    Reader(#[from] ReaderError),
}

impl DirectoryError {
    /// Whether the user must be told about this error.
    ///
    /// Collisions can only be resolved by restarting a client, so they are
    /// surfaced; everything else is routine.
    #[must_use]
    pub fn needs_attention(&self) -> bool {
        matches!(self, Self::Reader(ReaderError::HeaderCollision { .. }))
    }
}
