//! Live gamelog tailer.
//!
//! Reads only text appended since the last read, making it suitable
//! for following a log the game client is still writing.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, BufReader};

use super::error::ReaderError;
use super::header::{read_header, LogHeader};

/// Forward-only cursor over one open character log.
#[derive(Debug)]
pub struct LiveReader {
    /// Path to the gamelog.
    path: PathBuf,
    /// Parsed header.
    header: LogHeader,
    /// Open handle, kept for the lifetime of the reader.
    file: File,
    /// Byte offset of the next unread line.
    offset: u64,
}

impl LiveReader {
    /// Open a character log and position the cursor at its end.
    ///
    /// Content already in the file is skipped; only text appended after
    /// opening is returned by [`read`](Self::read).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file has no listener line (`NotCharacterLog`)
    /// - Two sessions collided in the file (`HeaderCollision`)
    /// - The file cannot be opened or read
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, ReaderError> {
        let path = path.into();
        let file = File::open(&path)
            .await
            .map_err(|e| ReaderError::from_open(&path, e))?;

        let mut reader = BufReader::new(file);
        let header = read_header(&mut reader, &path).await?.header;

        if let Some(other) = &header.collision {
            return Err(ReaderError::HeaderCollision {
                character: header.character.clone(),
                other: other.clone(),
                path,
            });
        }

        let file = reader.into_inner();
        let offset = file.metadata().await?.len();

        tracing::debug!(
            path = %path.display(),
            character = %header.character,
            offset,
            "Opened live gamelog"
        );

        Ok(Self {
            path,
            header,
            file,
            offset,
        })
    }

    /// Character this log belongs to.
    #[must_use]
    pub fn character(&self) -> &str {
        &self.header.character
    }

    #[must_use]
    pub fn header(&self) -> &LogHeader {
        &self.header
    }

    /// Get the path being tailed.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the current byte offset.
    #[must_use]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read every complete line appended since the last call.
    ///
    /// A trailing line without a terminator is left for the next call.
    /// Returns an empty string when nothing new is available.
    ///
    /// # Errors
    ///
    /// Returns `ReaderError::Truncated` if the file shrank below the cursor,
    /// or an I/O error. The cursor is unchanged on error.
    pub async fn read(&mut self) -> Result<String, ReaderError> {
        let len = self.file.metadata().await?.len();

        if len < self.offset {
            tracing::warn!(
                path = %self.path.display(),
                offset = self.offset,
                new_len = len,
                "Gamelog truncated below read position"
            );
            return Err(ReaderError::Truncated(self.path.clone()));
        }

        if len == self.offset {
            return Ok(String::new());
        }

        let available = len - self.offset;
        self.file.seek(SeekFrom::Start(self.offset)).await?;

        let mut buf = Vec::with_capacity(usize::try_from(available).unwrap_or(0));
        (&mut self.file)
            .take(available)
            .read_to_end(&mut buf)
            .await?;

        let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
            return Ok(String::new());
        };
        buf.truncate(last_newline + 1);
        self.offset += buf.len() as u64;

        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Skip everything currently in the file without returning it.
    ///
    /// Returns the number of bytes skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata cannot be read.
    pub async fn catchup(&mut self) -> Result<u64, ReaderError> {
        let len = self.file.metadata().await?.len();
        let skipped = len.saturating_sub(self.offset);
        self.offset = self.offset.max(len);
        if skipped > 0 {
            tracing::debug!(
                path = %self.path.display(),
                skipped,
                "Caught up gamelog"
            );
        }
        Ok(skipped)
    }
}
