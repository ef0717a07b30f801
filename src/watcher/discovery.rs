//! Gamelog discovery utilities.
//!
//! Locates the gamelog directory and the recent per-session logs in it.
//! Gamelogs are named after their UTC creation time, e.g.
//! `20240301_180000.txt`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{Duration, NaiveDateTime};

use super::error::WatcherError;

/// Timestamp layout of a gamelog filename stem.
pub const LOG_NAME_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Extension every gamelog carries.
pub const LOG_EXTENSION: &str = "txt";

/// Capability that locates the gamelog directory.
pub trait LogRootResolver {
    /// Return the directory to watch, if one can be determined.
    fn resolve(&self) -> Option<PathBuf>;
}

/// Resolves `<Documents>/EVE/logs/Gamelogs` for the current user.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLogRoot;

impl LogRootResolver for DefaultLogRoot {
    fn resolve(&self) -> Option<PathBuf> {
        let documents =
            dirs::document_dir().or_else(|| dirs::home_dir().map(|h| h.join("Documents")))?;
        Some(documents.join("EVE").join("logs").join("Gamelogs"))
    }
}

/// A fixed, configured gamelog directory.
#[derive(Debug, Clone)]
pub struct FixedLogRoot(pub PathBuf);

impl LogRootResolver for FixedLogRoot {
    fn resolve(&self) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

/// Parse the creation time encoded in a gamelog filename.
///
/// Only the strict `YYYYMMDD_HHMMSS.txt` form is accepted.
///
/// # Examples
///
/// ```
/// use livedps::watcher::parse_log_filename;
///
/// assert!(parse_log_filename("20240301_180000.txt").is_some());
/// assert!(parse_log_filename("20240301_180000_90000001.txt").is_none());
/// assert!(parse_log_filename("Local_20240301_180000.txt").is_none());
/// ```
#[must_use]
pub fn parse_log_filename(filename: &str) -> Option<NaiveDateTime> {
    let stem = filename.strip_suffix(LOG_EXTENSION)?.strip_suffix('.')?;
    let well_formed = stem.len() == 15
        && stem
            .bytes()
            .enumerate()
            .all(|(i, b)| if i == 8 { b == b'_' } else { b.is_ascii_digit() });
    if !well_formed {
        return None;
    }
    NaiveDateTime::parse_from_str(stem, LOG_NAME_FORMAT).ok()
}

/// List gamelogs created within `window` before `now`, oldest first.
///
/// Files whose names don't match the gamelog pattern are skipped.
/// Ordering uses filesystem modification time.
///
/// # Errors
///
/// Returns `WatcherError::RootNotFound` if `root` does not exist, or an
/// I/O error if it cannot be read.
pub fn recent_logs(
    root: &Path,
    now: NaiveDateTime,
    window: Duration,
) -> Result<Vec<PathBuf>, WatcherError> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(WatcherError::RootNotFound(root.to_path_buf()));
        }
        Err(e) => return Err(WatcherError::Io(e)),
    };

    let cutoff = now.checked_sub_signed(window);

    let mut logs: Vec<(PathBuf, SystemTime)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let created = entry.file_name().to_str().and_then(parse_log_filename)?;
            if cutoff.is_some_and(|cutoff| created < cutoff) {
                return None;
            }
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((entry.path(), modified))
        })
        .collect();

    logs.sort_by_key(|(_, modified)| *modified);

    tracing::debug!(root = %root.display(), count = logs.len(), "Discovered recent gamelogs");

    Ok(logs.into_iter().map(|(path, _)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration as StdDuration;
    use tempfile::TempDir;

    fn at(stamp: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(stamp, LOG_NAME_FORMAT).unwrap()
    }

    #[test]
    fn test_parse_log_filename_valid() {
        assert_eq!(
            parse_log_filename("20240301_180000.txt"),
            Some(at("20240301_180000"))
        );
    }

    #[test]
    fn test_parse_log_filename_invalid() {
        assert_eq!(parse_log_filename("20240301_180000.log"), None);
        assert_eq!(parse_log_filename("20240301-180000.txt"), None);
        assert_eq!(parse_log_filename("2024031_180000.txt"), None);
        assert_eq!(parse_log_filename("20241301_180000.txt"), None);
        assert_eq!(parse_log_filename("Fleet_20240301_180000.txt"), None);
        assert_eq!(parse_log_filename(""), None);
    }

    #[test]
    fn test_fixed_log_root() {
        let root = FixedLogRoot(PathBuf::from("/logs"));
        assert_eq!(root.resolve(), Some(PathBuf::from("/logs")));
    }

    #[test]
    fn test_default_log_root_shape() {
        if let Some(path) = DefaultLogRoot.resolve() {
            assert!(path.ends_with("EVE/logs/Gamelogs"));
        }
    }

    #[test]
    fn test_recent_logs_missing_root() {
        let result = recent_logs(
            Path::new("/nonexistent/gamelogs-12345"),
            at("20240301_180000"),
            Duration::hours(24),
        );
        assert!(matches!(result, Err(WatcherError::RootNotFound(_))));
    }

    #[test]
    fn test_recent_logs_filters_window_and_names() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("20240301_120000.txt")).unwrap();
        File::create(dir.path().join("20240228_120000.txt")).unwrap();
        File::create(dir.path().join("notes.txt")).unwrap();
        std::fs::create_dir(dir.path().join("20240301_130000.txt")).unwrap();

        let logs = recent_logs(dir.path(), at("20240301_180000"), Duration::hours(24)).unwrap();
        assert_eq!(logs, vec![dir.path().join("20240301_120000.txt")]);
    }

    #[test]
    fn test_recent_logs_ordered_by_mtime() {
        let dir = TempDir::new().unwrap();
        // Name order and write order disagree on purpose
        let written_first = dir.path().join("20240301_110000.txt");
        let written_second = dir.path().join("20240301_100000.txt");

        File::create(&written_first).unwrap();
        std::thread::sleep(StdDuration::from_millis(20));
        File::create(&written_second).unwrap();

        let logs = recent_logs(dir.path(), at("20240301_180000"), Duration::hours(24)).unwrap();
        assert_eq!(logs, vec![written_first, written_second]);
    }
}
