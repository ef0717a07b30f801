//! Character registry with selection and read dispatch.

use std::path::Path;

use crate::extract::{EventTotals, Extractor};
use crate::reader::{LiveReader, PlaybackReader, ReaderError};

use super::error::DirectoryError;
use super::observer::SelectionObserver;

/// A tracked character and its current gamelog.
#[derive(Debug)]
pub struct CharacterEntry {
    index: usize,
    character: String,
    reader: LiveReader,
}

impl CharacterEntry {
    /// Stable display position of this character.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub fn character(&self) -> &str {
        &self.character
    }

    /// Path of the gamelog currently followed for this character.
    #[must_use]
    pub fn log_path(&self) -> &Path {
        self.reader.path()
    }
}

/// Outcome of registering a gamelog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// A new character was appended at this index.
    Added(usize),
    /// The character at this index now follows the new log.
    Replaced(usize),
    /// The log is already followed by the entry at this index.
    AlreadyTracked(usize),
    /// The file is not a character log.
    Ignored,
}

/// Tracks one live reader per character and dispatches reads.
///
/// Entries are only ever appended; a new log for a known character
/// replaces that entry's reader in place, so indices stay stable.
#[derive(Default)]
pub struct CharacterDirectory {
    entries: Vec<CharacterEntry>,
    selected: Option<usize>,
    playback: Option<PlaybackReader>,
    extractor: Extractor,
    observer: Option<Box<dyn SelectionObserver>>,
}

impl CharacterDirectory {
    /// Create an empty directory with the built-in extraction rules.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty directory with a custom extractor.
    #[must_use]
    pub fn with_extractor(extractor: Extractor) -> Self {
        Self {
            extractor,
            ..Self::default()
        }
    }

    /// Install the observer notified on selection changes.
    pub fn set_observer(&mut self, observer: impl SelectionObserver + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Open `path` as a character log and add or replace its entry.
    ///
    /// The first registered character becomes the selection.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Reader` if the log collided or could not be
    /// read. Non-character logs are not errors; they yield
    /// `Registration::Ignored`.
    pub async fn register(&mut self, path: &Path) -> Result<Registration, DirectoryError> {
        if let Some(entry) = self.entries.iter().find(|entry| entry.reader.path() == path) {
            return Ok(Registration::AlreadyTracked(entry.index));
        }

        let reader = match LiveReader::open(path).await {
            Ok(reader) => reader,
            Err(ReaderError::NotCharacterLog(_)) => {
                tracing::debug!(path = %path.display(), "Ignoring non-character log");
                return Ok(Registration::Ignored);
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|entry| entry.character == reader.character())
        {
            tracing::info!(
                character = %entry.character,
                old = %entry.reader.path().display(),
                new = %reader.path().display(),
                "Switched character to new gamelog"
            );
            entry.reader = reader;
            return Ok(Registration::Replaced(entry.index));
        }

        let index = self.entries.len();
        tracing::info!(
            character = %reader.character(),
            index,
            path = %reader.path().display(),
            "Tracking new character"
        );
        self.entries.push(CharacterEntry {
            index,
            character: reader.character().to_string(),
            reader,
        });
        if self.selected.is_none() {
            self.selected = Some(index);
        }
        Ok(Registration::Added(index))
    }

    /// Make the character at `index` the output source.
    ///
    /// Skips the new reader's backlog so old events don't show up as a
    /// spike, then notifies the observer. While a playback is active the
    /// selection is only recorded; the observer hears about it once
    /// [`stop_playback`](Self::stop_playback) resumes live mode.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::SelectionOutOfRange` if there is no such entry.
    pub async fn select(&mut self, index: usize) -> Result<(), DirectoryError> {
        let len = self.entries.len();
        let Some(entry) = self.entries.get_mut(index) else {
            return Err(DirectoryError::SelectionOutOfRange { index, len });
        };

        self.selected = Some(index);
        if let Err(e) = entry.reader.catchup().await {
            tracing::warn!(character = %entry.character, error = %e, "Failed to catch up gamelog");
        }
        tracing::info!(character = %entry.character, index, "Selected character");

        if self.playback.is_some() {
            return Ok(());
        }
        if let Some(observer) = self.observer.as_mut() {
            observer.selection_changed(&entry.character);
        }
        Ok(())
    }

    /// Select a character by name.
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::UnknownCharacter` if no entry has this name.
    pub async fn select_by_name(&mut self, character: &str) -> Result<(), DirectoryError> {
        let index = self
            .find(character)
            .ok_or_else(|| DirectoryError::UnknownCharacter(character.to_string()))?;
        self.select(index).await
    }

    /// Replay `path` instead of following live logs until [`stop_playback`](Self::stop_playback).
    ///
    /// # Errors
    ///
    /// Returns `DirectoryError::Reader` if the file is not a readable
    /// character log.
    pub async fn start_playback(&mut self, path: &Path, speed: f64) -> Result<(), DirectoryError> {
        let playback = PlaybackReader::open_with_speed(path, speed).await?;
        if let Some(observer) = self.observer.as_mut() {
            observer.selection_changed(playback.character());
        }
        self.playback = Some(playback);
        Ok(())
    }

    /// Return to live mode. Returns whether a playback was active.
    pub async fn stop_playback(&mut self) -> bool {
        if self.playback.take().is_none() {
            return false;
        }
        tracing::info!("Stopped gamelog playback");
        if let Some(index) = self.selected {
            if let Err(e) = self.select(index).await {
                tracing::debug!(error = %e, "No live character to resume");
            }
        }
        true
    }

    /// Totals for everything new since the previous read.
    ///
    /// Serves the playback reader if one is active, otherwise the selected
    /// character. Never fails: with nothing to read, or on a read error,
    /// the all-zero totals are returned.
    pub async fn read(&mut self) -> EventTotals {
        let text = if let Some(playback) = self.playback.as_mut() {
            playback.read().await
        } else {
            let Some(index) = self.selected else {
                return EventTotals::zero();
            };
            let Some(entry) = self.entries.get_mut(index) else {
                tracing::debug!(index, "Selection has no character");
                return EventTotals::zero();
            };
            entry.reader.read().await
        };

        match text {
            Ok(text) => self.extractor.extract(&text),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read gamelog");
                EventTotals::zero()
            }
        }
    }

    /// Index of a character by name.
    #[must_use]
    pub fn find(&self, character: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|entry| entry.character == character)
            .map(|entry| entry.index)
    }

    /// Characters in display order.
    pub fn characters(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries
            .iter()
            .map(|entry| (entry.index, entry.character.as_str()))
    }

    #[must_use]
    pub fn entry(&self, index: usize) -> Option<&CharacterEntry> {
        self.entries.get(index)
    }

    /// Index of the selected character.
    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn selected_character(&self) -> Option<&str> {
        self.selected
            .and_then(|index| self.entries.get(index))
            .map(CharacterEntry::character)
    }

    #[must_use]
    pub fn playback(&self) -> Option<&PlaybackReader> {
        self.playback.as_ref()
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CharacterDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CharacterDirectory")
            .field("entries", &self.entries)
            .field("selected", &self.selected)
            .field("playback", &self.playback)
            .finish_non_exhaustive()
    }
}
