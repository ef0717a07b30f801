//! Character directory.
//!
//! Attributes gamelogs to characters, keeps one live reader per
//! character and serves totals for the selected one.

mod error;
mod observer;
mod registry;

pub use error::DirectoryError;
pub use observer::SelectionObserver;
pub use registry::{CharacterDirectory, CharacterEntry, Registration};
