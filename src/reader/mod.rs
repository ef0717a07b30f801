//! Session readers over individual gamelog files.
//!
//! [`LiveReader`] tails a log the client is writing; [`PlaybackReader`]
//! replays a finished log gated by its embedded timestamps.

mod error;
mod header;
mod live;
mod playback;

pub use error::ReaderError;
pub use header::{
    is_separator, line_timestamp, parse_listener, parse_session_started, HeaderRole, LogHeader,
    HEADER_SCHEMA, SEPARATOR, TIMESTAMP_FORMAT,
};
pub use live::LiveReader;
pub use playback::PlaybackReader;
