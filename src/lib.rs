//! Livedps - live DPS and logistics tracking from EVE Online gamelogs.

pub mod config;
pub mod directory;
pub mod display;
pub mod extract;
pub mod reader;
pub mod tracker;
pub mod watcher;
