//! Configuration types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LivedpsConfig {
    /// Gamelog directory; the platform default is used when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Polling cadence in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How far back the startup scan looks, in hours.
    #[serde(default = "default_scan_window_hours")]
    pub scan_window_hours: u64,
    /// Debounce applied to directory notifications, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Playback time scale.
    #[serde(default = "default_playback_speed")]
    pub playback_speed: f64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_scan_window_hours() -> u64 {
    24
}

fn default_debounce_ms() -> u64 {
    100
}

fn default_playback_speed() -> f64 {
    1.0
}

impl LivedpsConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn scan_window(&self) -> chrono::Duration {
        let hours = i64::try_from(self.scan_window_hours).unwrap_or(i64::MAX);
        chrono::Duration::try_hours(hours).unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for LivedpsConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            poll_interval_ms: default_poll_interval_ms(),
            scan_window_hours: default_scan_window_hours(),
            debounce_ms: default_debounce_ms(),
            playback_speed: default_playback_speed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LivedpsConfig::default();
        assert_eq!(config.log_dir, None);
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.scan_window(), chrono::Duration::hours(24));
        assert_eq!(config.debounce(), Duration::from_millis(100));
        assert!((config.playback_speed - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deserialize_partial() {
        let toml = r#"
            log_dir = "/srv/eve/Gamelogs"
            poll_interval_ms = 500
        "#;
        let config: LivedpsConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.log_dir, Some(PathBuf::from("/srv/eve/Gamelogs")));
        assert_eq!(config.poll_interval_ms, 500);
        assert_eq!(config.scan_window_hours, 24);
    }

    #[test]
    fn test_deserialize_empty_is_default() {
        let config: LivedpsConfig = toml::from_str("").unwrap();
        assert_eq!(config, LivedpsConfig::default());
    }

    #[test]
    fn test_zero_interval_clamped() {
        let config = LivedpsConfig {
            poll_interval_ms: 0,
            ..LivedpsConfig::default()
        };
        assert_eq!(config.poll_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_huge_window_saturates() {
        let config = LivedpsConfig {
            scan_window_hours: u64::MAX,
            ..LivedpsConfig::default()
        };
        assert_eq!(config.scan_window(), chrono::Duration::MAX);
    }
}
