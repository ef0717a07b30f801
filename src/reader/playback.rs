//! Time-scaled replay of a finished gamelog.
//!
//! Lines are released once the wall clock, measured from the moment the
//! reader was opened, catches up with their bracketed timestamp.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use tokio::fs::File;
use tokio::io::BufReader;

use super::error::ReaderError;
use super::header::{line_timestamp, read_header, read_line_lossy, LogHeader};

/// Replays a gamelog at real-time pace, optionally sped up.
#[derive(Debug)]
pub struct PlaybackReader {
    path: PathBuf,
    header: LogHeader,
    reader: BufReader<File>,
    /// Next line not yet released.
    pending: Option<String>,
    /// Log time corresponding to `started`.
    anchor: Option<NaiveDateTime>,
    started: Instant,
    speed: f64,
    eof: bool,
}

impl PlaybackReader {
    /// Open a gamelog for replay at real-time speed.
    ///
    /// # Errors
    ///
    /// See [`open_with_speed`](Self::open_with_speed).
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, ReaderError> {
        Self::open_with_speed(path, 1.0).await
    }

    /// Open a gamelog for replay, scaling log time by `speed`.
    ///
    /// A `speed` of 2.0 replays one minute of log in thirty seconds.
    /// Non-positive or non-finite values fall back to 1.0. Collided
    /// headers are tolerated since the file is replayed as a whole.
    ///
    /// # Errors
    ///
    /// Returns `ReaderError::NotCharacterLog` if the header has no listener,
    /// or an I/O error if the file cannot be opened.
    pub async fn open_with_speed(path: impl Into<PathBuf>, speed: f64) -> Result<Self, ReaderError> {
        let path = path.into();
        let file = File::open(&path)
            .await
            .map_err(|e| ReaderError::from_open(&path, e))?;

        let mut reader = BufReader::new(file);
        let read = read_header(&mut reader, &path).await?;
        let header = read.header;

        if let Some(other) = &header.collision {
            tracing::warn!(
                path = %path.display(),
                character = %header.character,
                other = %other,
                "Replaying collided gamelog"
            );
        }

        let pending = match read.first_line {
            Some(line) => Some(line),
            None => read_line_lossy(&mut reader).await?,
        };
        let anchor = pending
            .as_deref()
            .and_then(line_timestamp)
            .or(header.session_started);

        let speed = if speed.is_finite() && speed > 0.0 {
            speed
        } else {
            tracing::warn!(speed, "Invalid playback speed, using 1.0");
            1.0
        };

        tracing::info!(
            path = %path.display(),
            character = %header.character,
            anchor = ?anchor,
            speed,
            "Started gamelog playback"
        );

        Ok(Self {
            path,
            header,
            reader,
            pending,
            anchor,
            started: Instant::now(),
            speed,
            eof: false,
        })
    }

    #[must_use]
    pub fn character(&self) -> &str {
        &self.header.character
    }

    #[must_use]
    pub fn header(&self) -> &LogHeader {
        &self.header
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Whether every line of the file has been released.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.eof && self.pending.is_none()
    }

    /// Release all lines due by now.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub async fn read(&mut self) -> Result<String, ReaderError> {
        self.read_elapsed(self.started.elapsed()).await
    }

    /// Release all lines due `elapsed` wall time after playback started.
    ///
    /// Lines without a timestamp travel with the line before them. The
    /// first line stamped later than the horizon is held for a later call.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be read.
    pub async fn read_elapsed(&mut self, elapsed: Duration) -> Result<String, ReaderError> {
        let horizon = self.horizon(elapsed);
        let mut delta = String::new();

        loop {
            let line = match self.pending.take() {
                Some(line) => line,
                None => match read_line_lossy(&mut self.reader).await? {
                    Some(line) => line,
                    None => {
                        self.eof = true;
                        break;
                    }
                },
            };

            if let (Some(horizon), Some(stamp)) = (horizon, line_timestamp(&line)) {
                if stamp > horizon {
                    self.pending = Some(line);
                    break;
                }
            }
            delta.push_str(&line);
        }

        Ok(delta)
    }

    /// Log time due after `elapsed`; `None` releases everything.
    fn horizon(&self, elapsed: Duration) -> Option<NaiveDateTime> {
        let anchor = self.anchor?;
        let scaled = Duration::try_from_secs_f64(elapsed.as_secs_f64() * self.speed).ok()?;
        let scaled = chrono::Duration::from_std(scaled).ok()?;
        anchor.checked_add_signed(scaled)
    }
}
