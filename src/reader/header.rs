//! Gamelog header schema.
//!
//! A gamelog starts with a fixed, positional header:
//!
//! ```text
//! ------------------------------------------------------------
//!   Gamelog
//!   Listener: Some Pilot
//!   Session Started: 2024.03.01 18:00:00
//! ------------------------------------------------------------
//! ```
//!
//! The line after it is either the first event or, when two characters
//! logged in during the same second, another separator followed by a
//! second header.

use std::path::Path;

use chrono::NaiveDateTime;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use super::error::ReaderError;

/// Separator line framing the header.
pub const SEPARATOR: &str = "------------------------------------------------------------";

/// Timestamp format shared by the header and event lines.
pub const TIMESTAMP_FORMAT: &str = "%Y.%m.%d %H:%M:%S";

/// Role of each positional header line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderRole {
    Separator,
    Label,
    Listener,
    SessionStarted,
    /// First event line, or a separator announcing a collision.
    FirstEventOrSeparator,
}

/// Header lines in file order.
pub const HEADER_SCHEMA: [HeaderRole; 6] = [
    HeaderRole::Separator,
    HeaderRole::Label,
    HeaderRole::Listener,
    HeaderRole::SessionStarted,
    HeaderRole::Separator,
    HeaderRole::FirstEventOrSeparator,
];

/// Lines of the second header that follow a collision separator.
const COLLISION_TAIL: [HeaderRole; 4] = [
    HeaderRole::Label,
    HeaderRole::Listener,
    HeaderRole::SessionStarted,
    HeaderRole::Separator,
];

/// Parsed gamelog header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogHeader {
    /// Character the log belongs to.
    pub character: String,
    /// Session start time, if the line parsed.
    pub session_started: Option<NaiveDateTime>,
    /// Second listener when two sessions share this file.
    pub collision: Option<String>,
}

/// Result of consuming a header from a stream.
#[derive(Debug)]
pub(crate) struct HeaderRead {
    pub header: LogHeader,
    /// The line following the header when it is an event line.
    pub first_line: Option<String>,
}

/// Extract the character name from a `Listener:` line.
#[must_use]
pub fn parse_listener(line: &str) -> Option<String> {
    let (_, name) = line.split_once("Listener: ")?;
    let name = name.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Extract the start time from a `Session Started:` line.
#[must_use]
pub fn parse_session_started(line: &str) -> Option<NaiveDateTime> {
    let (_, stamp) = line.split_once("Session Started: ")?;
    NaiveDateTime::parse_from_str(stamp.trim(), TIMESTAMP_FORMAT).ok()
}

/// Whether `line` is the header separator.
#[must_use]
pub fn is_separator(line: &str) -> bool {
    line.trim_end_matches(['\r', '\n']) == SEPARATOR
}

/// Parse the leading `[ YYYY.MM.DD HH:MM:SS ]` of an event line.
#[must_use]
pub fn line_timestamp(line: &str) -> Option<NaiveDateTime> {
    let rest = line.trim_start().strip_prefix('[')?;
    let (stamp, _) = rest.split_once(']')?;
    NaiveDateTime::parse_from_str(stamp.trim(), TIMESTAMP_FORMAT).ok()
}

/// Read one line, decoding invalid UTF-8 lossily.
///
/// Returns `None` at end of file. The line keeps its terminator.
pub(crate) async fn read_line_lossy<R>(reader: &mut R) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

/// Consume the header from `reader`.
///
/// # Errors
///
/// Returns `ReaderError::NotCharacterLog` if the listener line is missing
/// and `ReaderError::Io` on read failures. A collision is reported through
/// [`LogHeader::collision`]; callers decide whether it is fatal.
pub(crate) async fn read_header<R>(reader: &mut R, path: &Path) -> Result<HeaderRead, ReaderError>
where
    R: AsyncBufRead + Unpin,
{
    let mut character = None;
    let mut session_started = None;
    let mut trailing = None;

    for role in HEADER_SCHEMA {
        let Some(line) = read_line_lossy(reader).await? else {
            break;
        };
        match role {
            HeaderRole::Listener => character = parse_listener(&line),
            HeaderRole::SessionStarted => session_started = parse_session_started(&line),
            HeaderRole::FirstEventOrSeparator => trailing = Some(line),
            HeaderRole::Separator | HeaderRole::Label => {}
        }
        if role == HeaderRole::Listener && character.is_none() {
            return Err(ReaderError::NotCharacterLog(path.to_path_buf()));
        }
    }

    let Some(character) = character else {
        return Err(ReaderError::NotCharacterLog(path.to_path_buf()));
    };

    let mut collision = None;
    let first_line = match trailing {
        Some(line) if is_separator(&line) => {
            for role in COLLISION_TAIL {
                let Some(line) = read_line_lossy(reader).await? else {
                    break;
                };
                if role == HeaderRole::Listener {
                    collision = parse_listener(&line);
                }
            }
            collision.get_or_insert_with(|| "unknown".to_string());
            None
        }
        Some(line) if !line.trim().is_empty() => Some(line),
        _ => None,
    };

    Ok(HeaderRead {
        header: LogHeader {
            character,
            session_started,
            collision,
        },
        first_line,
    })
}
