//! Runtime wiring for live tracking.
//!
//! Owns the character directory and the directory watcher, and handles
//! file creations, caller commands and polling ticks on one task so the
//! registry is never mutated while a read is in flight.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::LivedpsConfig;
use crate::directory::{CharacterDirectory, DirectoryError, Registration};
use crate::extract::EventTotals;
use crate::watcher::{recent_logs, GamelogWatcher, LogRootResolver, WatchEvent, WatcherError};

/// Something the caller of [`Tracker::run`] should know about.
#[derive(Debug)]
pub enum TrackerEvent {
    /// Totals for one polling tick.
    Totals(EventTotals),
    /// A gamelog was attributed to a character.
    Registered {
        path: PathBuf,
        character: String,
        registration: Registration,
    },
    /// A condition the user has to be warned about.
    Alert(DirectoryError),
    /// The playback reader released its last line.
    PlaybackFinished,
    /// A [`TrackerCommand`] could not be carried out.
    Rejected {
        command: TrackerCommand,
        error: DirectoryError,
    },
}

/// Request for a running [`Tracker`], sent through a [`TrackerHandle`].
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerCommand {
    /// Report on the character at this index.
    Select(usize),
    /// Report on the character with this name.
    SelectByName(String),
    /// Replay a gamelog at the given speed instead of following live logs.
    StartPlayback(PathBuf, f64),
    /// Return to live mode.
    StopPlayback,
}

impl TrackerCommand {
    /// Parse one line of interactive input.
    ///
    /// `stop` ends a playback, `play <path>` starts one at `playback_speed`,
    /// a number selects by index and anything else selects by name.
    #[must_use]
    pub fn parse(input: &str, playback_speed: f64) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if input == "stop" {
            return Some(Self::StopPlayback);
        }
        if input == "play" {
            return None;
        }
        if let Some(path) = input.strip_prefix("play ") {
            return Some(Self::StartPlayback(
                PathBuf::from(path.trim()),
                playback_speed,
            ));
        }
        Some(match input.parse::<usize>() {
            Ok(index) => Self::Select(index),
            Err(_) => Self::SelectByName(input.to_string()),
        })
    }
}

/// Cloneable sender of commands to a [`Tracker`].
#[derive(Debug, Clone)]
pub struct TrackerHandle {
    tx: mpsc::UnboundedSender<TrackerCommand>,
}

impl TrackerHandle {
    /// Queue a command. Returns `false` once the tracker is gone.
    pub fn send(&self, command: TrackerCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn select(&self, index: usize) -> bool {
        self.send(TrackerCommand::Select(index))
    }

    pub fn select_by_name(&self, character: impl Into<String>) -> bool {
        self.send(TrackerCommand::SelectByName(character.into()))
    }

    pub fn start_playback(&self, path: impl Into<PathBuf>, speed: f64) -> bool {
        self.send(TrackerCommand::StartPlayback(path.into(), speed))
    }

    pub fn stop_playback(&self) -> bool {
        self.send(TrackerCommand::StopPlayback)
    }
}

/// What happened while starting up.
#[derive(Debug, Default)]
pub struct StartupReport {
    /// Gamelog directory in use.
    pub root: Option<PathBuf>,
    /// Why tracking is degraded, if it is.
    ///
    /// With [`WatcherError::RootNotFound`] or [`WatcherError::NoLogRoot`]
    /// nothing is tracked; any other error only disables discovery of logs
    /// created after startup.
    pub root_error: Option<WatcherError>,
    /// Characters known after the startup scan.
    pub characters: usize,
    /// Logs that could not be attributed and need the user's attention.
    pub alerts: Vec<DirectoryError>,
}

impl StartupReport {
    /// Whether the tracker runs without a gamelog directory or without
    /// live discovery.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.root_error.is_some()
    }
}

/// Live tracking session.
#[derive(Debug)]
pub struct Tracker {
    directory: CharacterDirectory,
    watcher: Option<GamelogWatcher>,
    events: Option<mpsc::UnboundedReceiver<WatchEvent>>,
    commands: mpsc::UnboundedReceiver<TrackerCommand>,
    command_tx: mpsc::UnboundedSender<TrackerCommand>,
    poll_interval: Duration,
    playback_reported: bool,
}

impl Tracker {
    /// Create a tracker that watches nothing.
    #[must_use]
    pub fn new(directory: CharacterDirectory, poll_interval: Duration) -> Self {
        let (command_tx, commands) = mpsc::unbounded_channel();
        Self {
            directory,
            watcher: None,
            events: None,
            commands,
            command_tx,
            poll_interval,
            playback_reported: false,
        }
    }

    /// Resolve the gamelog directory, start watching it and register the
    /// recent logs already in it.
    ///
    /// A missing directory is reported in the returned [`StartupReport`];
    /// the tracker still runs, serving zero totals. If the directory exists
    /// but cannot be watched, the recent logs are still registered.
    pub async fn start(
        config: &LivedpsConfig,
        resolver: &dyn LogRootResolver,
        directory: CharacterDirectory,
    ) -> (Self, StartupReport) {
        let Some(root) = resolver.resolve() else {
            tracing::warn!("No gamelog directory for this platform, tracking disabled");
            let report = StartupReport {
                root_error: Some(WatcherError::NoLogRoot),
                ..StartupReport::default()
            };
            return (Self::new(directory, config.poll_interval()), report);
        };

        // Watch before scanning so files created during the scan are not missed
        let watch = GamelogWatcher::new(root.clone(), config.debounce());
        Self::start_with_watch(config, root, watch, directory).await
    }

    async fn start_with_watch(
        config: &LivedpsConfig,
        root: PathBuf,
        watch: Result<(GamelogWatcher, mpsc::UnboundedReceiver<WatchEvent>), WatcherError>,
        directory: CharacterDirectory,
    ) -> (Self, StartupReport) {
        let mut tracker = Self::new(directory, config.poll_interval());
        let mut report = StartupReport {
            root: Some(root.clone()),
            ..StartupReport::default()
        };

        match watch {
            Ok((watcher, events)) => {
                tracker.watcher = Some(watcher);
                tracker.events = Some(events);
            }
            Err(e @ WatcherError::RootNotFound(_)) => {
                tracing::warn!(
                    path = %root.display(),
                    error = %e,
                    "Gamelog directory unavailable, tracking disabled"
                );
                report.root_error = Some(e);
                return (tracker, report);
            }
            Err(e) => {
                tracing::warn!(
                    path = %root.display(),
                    error = %e,
                    "Cannot watch gamelog directory, new logs will not be picked up"
                );
                report.root_error = Some(e);
            }
        }

        let now = chrono::Utc::now().naive_utc();
        match recent_logs(&root, now, config.scan_window()) {
            Ok(paths) => {
                for path in paths {
                    if let Err(e) = tracker.directory.register(&path).await {
                        report.alerts.extend(Self::triage(&path, e));
                    }
                }
            }
            Err(e) => {
                tracing::warn!(path = %root.display(), error = %e, "Startup scan failed");
                report.root_error.get_or_insert(e);
            }
        }

        report.characters = tracker.directory.len();
        tracing::info!(characters = report.characters, "Startup scan complete");
        (tracker, report)
    }

    /// Log a registration failure; returns it if the user must see it.
    fn triage(path: &Path, error: DirectoryError) -> Option<DirectoryError> {
        if error.needs_attention() {
            tracing::error!(path = %path.display(), error = %error, "Gamelog needs attention");
            Some(error)
        } else {
            tracing::debug!(path = %path.display(), error = %error, "Skipping gamelog");
            None
        }
    }

    #[must_use]
    pub fn directory(&self) -> &CharacterDirectory {
        &self.directory
    }

    pub fn directory_mut(&mut self) -> &mut CharacterDirectory {
        &mut self.directory
    }

    /// Handle for sending commands to this tracker, also while it runs.
    #[must_use]
    pub fn handle(&self) -> TrackerHandle {
        TrackerHandle {
            tx: self.command_tx.clone(),
        }
    }

    /// Whether the gamelog directory is being watched.
    #[must_use]
    pub fn is_watching(&self) -> bool {
        self.watcher.as_ref().is_some_and(GamelogWatcher::is_running)
    }

    /// Handle one event from the directory watcher.
    pub async fn handle_watch_event(
        &mut self,
        event: WatchEvent,
        sink: &mut impl FnMut(TrackerEvent),
    ) {
        match event {
            WatchEvent::FileCreated(path) => match self.directory.register(&path).await {
                Ok(
                    registration @ (Registration::Added(index) | Registration::Replaced(index)),
                ) => {
                    let character = self
                        .directory
                        .entry(index)
                        .map(|entry| entry.character().to_string())
                        .unwrap_or_default();
                    sink(TrackerEvent::Registered {
                        path,
                        character,
                        registration,
                    });
                }
                Ok(Registration::Ignored | Registration::AlreadyTracked(_)) => {}
                Err(e) => {
                    if let Some(alert) = Self::triage(&path, e) {
                        sink(TrackerEvent::Alert(alert));
                    }
                }
            },
            WatchEvent::Error(e) => {
                tracing::warn!(error = %e, "Gamelog watcher error");
            }
        }
    }

    /// Carry out one caller command.
    pub async fn handle_command(
        &mut self,
        command: TrackerCommand,
        sink: &mut impl FnMut(TrackerEvent),
    ) {
        let result = match &command {
            TrackerCommand::Select(index) => self.directory.select(*index).await,
            TrackerCommand::SelectByName(character) => {
                self.directory.select_by_name(character).await
            }
            TrackerCommand::StartPlayback(path, speed) => {
                self.directory.start_playback(path, *speed).await
            }
            TrackerCommand::StopPlayback => {
                self.directory.stop_playback().await;
                Ok(())
            }
        };
        if let Err(error) = result {
            tracing::warn!(command = ?command, error = %error, "Tracker command failed");
            sink(TrackerEvent::Rejected { command, error });
        }
    }

    /// Read totals for one polling tick.
    pub async fn poll(&mut self, sink: &mut impl FnMut(TrackerEvent)) {
        let totals = self.directory.read().await;
        sink(TrackerEvent::Totals(totals));

        let finished = self
            .directory
            .playback()
            .is_some_and(crate::reader::PlaybackReader::is_finished);
        if finished && !self.playback_reported {
            self.playback_reported = true;
            sink(TrackerEvent::PlaybackFinished);
        } else if !finished {
            self.playback_reported = false;
        }
    }

    /// Poll at the configured cadence and handle watch events and commands
    /// until `cancel` fires, then stop watching.
    pub async fn run(mut self, cancel: CancellationToken, mut sink: impl FnMut(TrackerEvent)) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => self.poll(&mut sink).await,
                Some(command) = self.commands.recv() => {
                    self.handle_command(command, &mut sink).await;
                }
                event = next_event(&mut self.events) => match event {
                    Some(event) => self.handle_watch_event(event, &mut sink).await,
                    None => {
                        tracing::warn!("Gamelog watcher stopped unexpectedly");
                        self.events = None;
                    }
                },
            }
        }

        self.stop();
    }

    /// Stop watching the gamelog directory. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(watcher) = self.watcher.as_mut() {
            watcher.stop();
        }
        self.events = None;
    }
}

/// Next watch event, or pending forever when there is no watcher.
async fn next_event(
    events: &mut Option<mpsc::UnboundedReceiver<WatchEvent>>,
) -> Option<WatchEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SEPARATOR;
    use crate::watcher::FixedLogRoot;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    const DAMAGE_IN_40: &str = "[ 2024.03.01 18:00:02 ] (combat) <color=0xffcc0000><b>40</b> <color=0x77ffffff><font size=10>from</font> <b><color=0xffffffff>Guristas Massacrer</b>\n";

    fn header(name: &str) -> String {
        format!("{SEPARATOR}\n  Gamelog\n  Listener: {name}\n  Session Started: 2024.03.01 18:00:00\n{SEPARATOR}\n")
    }

    fn recent_name(offset_secs: i64) -> String {
        let at = chrono::Utc::now().naive_utc() - chrono::Duration::seconds(offset_secs);
        format!("{}.txt", at.format("%Y%m%d_%H%M%S"))
    }

    fn append(path: &Path, text: &str) {
        let mut file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
        write!(file, "{text}").unwrap();
    }

    fn config() -> LivedpsConfig {
        LivedpsConfig {
            debounce_ms: 50,
            poll_interval_ms: 20,
            ..LivedpsConfig::default()
        }
    }

    #[tokio::test]
    async fn test_start_missing_root_is_degraded() {
        let resolver = FixedLogRoot(PathBuf::from("/nonexistent/gamelogs-999"));
        let (mut tracker, report) =
            Tracker::start(&config(), &resolver, CharacterDirectory::new()).await;
        assert!(report.is_degraded());
        assert!(!tracker.is_watching());

        let mut seen = Vec::new();
        tracker.poll(&mut |event| seen.push(event)).await;
        assert!(matches!(&seen[..], [TrackerEvent::Totals(t)] if t.is_zero()));
    }

    #[tokio::test]
    async fn test_start_scans_recent_logs() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(recent_name(120)), header("Ava")).unwrap();
        std::fs::write(dir.path().join(recent_name(60)), header("Bram")).unwrap();
        std::fs::write(dir.path().join("20000101_000000.txt"), header("Old")).unwrap();
        std::fs::write(
            dir.path().join(recent_name(30)),
            format!("{}{}", header("Cyd"), header("Dax")),
        )
        .unwrap();

        let resolver = FixedLogRoot(dir.path().to_path_buf());
        let (mut tracker, report) =
            Tracker::start(&config(), &resolver, CharacterDirectory::new()).await;

        if report.is_degraded() {
            // Watcher could not start on this system
            return;
        }
        assert_eq!(report.characters, 2);
        assert_eq!(report.alerts.len(), 1);
        assert!(tracker.directory().find("Old").is_none());
        tracker.stop();
        tracker.stop();
        assert!(!tracker.is_watching());
    }

    #[tokio::test]
    async fn test_created_file_event_registers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(recent_name(0));
        std::fs::write(&path, header("Ava")).unwrap();

        let mut tracker = Tracker::new(CharacterDirectory::new(), Duration::from_millis(20));
        let mut seen = Vec::new();
        tracker
            .handle_watch_event(WatchEvent::FileCreated(path.clone()), &mut |event| {
                seen.push(event);
            })
            .await;

        assert!(matches!(
            &seen[..],
            [TrackerEvent::Registered { character, registration: Registration::Added(0), .. }]
                if character == "Ava"
        ));

        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        write!(file, "{DAMAGE_IN_40}").unwrap();

        let mut totals = Vec::new();
        tracker.poll(&mut |event| totals.push(event)).await;
        assert!(matches!(&totals[..], [TrackerEvent::Totals(t)] if t.damage_in == 40));
    }

    #[tokio::test]
    async fn test_collision_event_alerts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(recent_name(0));
        std::fs::write(&path, format!("{}{}", header("Ava"), header("Bram"))).unwrap();

        let mut tracker = Tracker::new(CharacterDirectory::new(), Duration::from_millis(20));
        let mut seen = Vec::new();
        tracker
            .handle_watch_event(WatchEvent::FileCreated(path), &mut |event| seen.push(event))
            .await;
        assert!(matches!(&seen[..], [TrackerEvent::Alert(_)]));
        assert!(tracker.directory().is_empty());
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let tracker = Tracker::new(CharacterDirectory::new(), Duration::from_millis(10));
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();

        let handle = tokio::spawn(async move {
            tracker.run(cancel, |_event| {}).await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        stopper.cancel();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("tracker did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_playback_finished_reported_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("20240301_180000.txt");
        std::fs::write(&path, format!("{}{DAMAGE_IN_40}", header("Ava"))).unwrap();

        let mut directory = CharacterDirectory::new();
        directory.start_playback(&path, 1.0).await.unwrap();
        let mut tracker = Tracker::new(directory, Duration::from_millis(20));

        let mut seen = Vec::new();
        tracker.poll(&mut |event| seen.push(event)).await;
        tracker.poll(&mut |event| seen.push(event)).await;

        let finished = seen
            .iter()
            .filter(|e| matches!(e, TrackerEvent::PlaybackFinished))
            .count();
        assert_eq!(finished, 1);
        assert!(matches!(&seen[0], TrackerEvent::Totals(t) if t.damage_in == 40));
    }

    #[tokio::test]
    async fn test_unwatchable_root_still_scans() {
        let dir = TempDir::new().unwrap();
        let ava = dir.path().join(recent_name(120));
        std::fs::write(&ava, header("Ava")).unwrap();
        std::fs::write(dir.path().join(recent_name(60)), header("Bram")).unwrap();

        let watch = Err(WatcherError::Notify(notify::Error::generic(
            "inotify watch limit reached",
        )));
        let (mut tracker, report) = Tracker::start_with_watch(
            &config(),
            dir.path().to_path_buf(),
            watch,
            CharacterDirectory::new(),
        )
        .await;

        assert!(report.is_degraded());
        assert!(matches!(report.root_error, Some(WatcherError::Notify(_))));
        assert_eq!(report.characters, 2);
        assert!(!tracker.is_watching());

        append(&ava, DAMAGE_IN_40);
        let mut seen = Vec::new();
        tracker.poll(&mut |event| seen.push(event)).await;
        assert!(matches!(&seen[..], [TrackerEvent::Totals(t)] if t.damage_in == 40));
    }

    #[tokio::test]
    async fn test_missing_root_skips_scan() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("Gamelogs");
        let watch = Err(WatcherError::RootNotFound(missing.clone()));
        let (_tracker, report) =
            Tracker::start_with_watch(&config(), missing, watch, CharacterDirectory::new()).await;
        assert!(matches!(report.root_error, Some(WatcherError::RootNotFound(_))));
        assert_eq!(report.characters, 0);
    }

    #[tokio::test]
    async fn test_select_command_while_running() {
        let dir = TempDir::new().unwrap();
        let ava = dir.path().join(recent_name(60));
        let bram = dir.path().join(recent_name(30));
        std::fs::write(&ava, header("Ava")).unwrap();
        std::fs::write(&bram, header("Bram")).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let names = Arc::clone(&seen);
        let mut directory = CharacterDirectory::new();
        directory.set_observer(move |name: &str| names.lock().unwrap().push(name.to_string()));
        directory.register(&ava).await.unwrap();
        directory.register(&bram).await.unwrap();

        let tracker = Tracker::new(directory, Duration::from_millis(10));
        let handle = tracker.handle();
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();

        let fresh = DAMAGE_IN_40.replace("<b>40</b>", "<b>7</b>");
        let mut damage_in = 0;
        let mut rejected = Vec::new();

        let driver = async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            // Backlog written while Ava is selected
            append(&bram, DAMAGE_IN_40);
            append(&bram, DAMAGE_IN_40);
            assert!(handle.select_by_name("Bram"));
            tokio::time::sleep(Duration::from_millis(50)).await;
            append(&bram, &fresh);
            assert!(handle.select_by_name("Nobody"));
            tokio::time::sleep(Duration::from_millis(80)).await;
            stopper.cancel();
        };
        let run = tracker.run(cancel, |event| match event {
            TrackerEvent::Totals(t) => damage_in += t.damage_in,
            TrackerEvent::Rejected { command, .. } => rejected.push(command),
            _ => {}
        });
        tokio::join!(run, driver);

        assert_eq!(damage_in, 7);
        assert_eq!(
            rejected,
            vec![TrackerCommand::SelectByName("Nobody".to_string())]
        );
        assert_eq!(*seen.lock().unwrap(), vec!["Bram".to_string()]);
        assert!(!handle.stop_playback());
    }

    #[tokio::test]
    async fn test_playback_commands() {
        let dir = TempDir::new().unwrap();
        let replay = dir.path().join("20240301_180000.txt");
        std::fs::write(&replay, format!("{}{DAMAGE_IN_40}", header("Ava"))).unwrap();

        let mut tracker = Tracker::new(CharacterDirectory::new(), Duration::from_millis(20));
        let mut seen = Vec::new();
        tracker
            .handle_command(
                TrackerCommand::StartPlayback(dir.path().join("missing.txt"), 1.0),
                &mut |event| seen.push(event),
            )
            .await;
        assert!(matches!(&seen[..], [TrackerEvent::Rejected { .. }]));
        assert!(!tracker.directory().is_playing());

        tracker
            .handle_command(TrackerCommand::StartPlayback(replay, 1.0), &mut |event| {
                seen.push(event);
            })
            .await;
        assert!(tracker.directory().is_playing());

        tracker
            .handle_command(TrackerCommand::StopPlayback, &mut |event| seen.push(event))
            .await;
        assert!(!tracker.directory().is_playing());
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(TrackerCommand::parse("  ", 1.0), None);
        assert_eq!(TrackerCommand::parse("2\n", 1.0), Some(TrackerCommand::Select(2)));
        assert_eq!(
            TrackerCommand::parse("Ava Starfall", 1.0),
            Some(TrackerCommand::SelectByName("Ava Starfall".to_string()))
        );
        assert_eq!(
            TrackerCommand::parse("stop", 1.0),
            Some(TrackerCommand::StopPlayback)
        );
        assert_eq!(
            TrackerCommand::parse("play /logs/20240301_180000.txt", 4.0),
            Some(TrackerCommand::StartPlayback(
                PathBuf::from("/logs/20240301_180000.txt"),
                4.0
            ))
        );
        assert_eq!(TrackerCommand::parse("play ", 1.0), None);
    }
}
