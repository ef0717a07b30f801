//! Gamelog directory watcher with notify integration.
//!
//! Watches the gamelog directory for newly created files and emits events.

use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use notify_debouncer_full::{
    new_debouncer,
    notify::{self, RecursiveMode},
    DebounceEventResult,
};
use tokio::sync::mpsc;

use super::error::WatcherError;

/// How long the bridge thread waits for notify events before checking for stop.
const BRIDGE_POLL: Duration = Duration::from_millis(100);

/// Events emitted by the gamelog watcher.
#[derive(Debug)]
pub enum WatchEvent {
    /// A new file was created in the gamelog directory.
    FileCreated(PathBuf),
    /// An error occurred during watching.
    Error(WatcherError),
}

/// Cancellable subscription to file creations in a gamelog directory.
///
/// Uses notify-debouncer-full for file system events and bridges them to a
/// tokio mpsc channel, so they can be handled on the same task that polls
/// the readers.
pub struct GamelogWatcher {
    /// The directory being watched.
    watch_path: PathBuf,
    /// Handle to stop the watcher; `None` once stopped.
    stop_tx: Option<std_mpsc::Sender<()>>,
}

impl GamelogWatcher {
    /// Start watching `dir` (non-recursively).
    ///
    /// Returns the watcher and a receiver for watch events.
    ///
    /// # Errors
    ///
    /// Returns `WatcherError::RootNotFound` if `dir` is not a directory, or
    /// an error if the file watcher cannot be created.
    pub fn new(
        dir: PathBuf,
        debounce: Duration,
    ) -> Result<(Self, mpsc::UnboundedReceiver<WatchEvent>), WatcherError> {
        if !dir.is_dir() {
            return Err(WatcherError::RootNotFound(dir));
        }

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();
        let (notify_tx, notify_rx) = std_mpsc::channel();

        let mut debouncer = new_debouncer(debounce, None, move |result| {
            let _ = notify_tx.send(result);
        })?;

        debouncer.watch(&dir, RecursiveMode::NonRecursive)?;

        // Detached: the thread exits on its own within one BRIDGE_POLL of stop.
        thread::spawn(move || {
            loop {
                match stop_rx.try_recv() {
                    Ok(()) | Err(std_mpsc::TryRecvError::Disconnected) => break,
                    Err(std_mpsc::TryRecvError::Empty) => {}
                }

                match notify_rx.recv_timeout(BRIDGE_POLL) {
                    Ok(result) => {
                        if !Self::handle_debounce_result(result, &event_tx) {
                            break;
                        }
                    }
                    Err(std_mpsc::RecvTimeoutError::Timeout) => {}
                    Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
                }
            }

            // Keep debouncer alive until thread exits
            drop(debouncer);
        });

        tracing::info!(path = %dir.display(), "Watching gamelog directory");

        Ok((
            Self {
                watch_path: dir,
                stop_tx: Some(stop_tx),
            },
            event_rx,
        ))
    }

    /// Forward a debounce result; returns `false` once the receiver is gone.
    fn handle_debounce_result(
        result: DebounceEventResult,
        event_tx: &mpsc::UnboundedSender<WatchEvent>,
    ) -> bool {
        match result {
            Ok(events) => {
                for event in &events {
                    if !matches!(event.kind, notify::EventKind::Create(_)) {
                        continue;
                    }
                    for path in &event.paths {
                        if path.is_dir() {
                            continue;
                        }
                        if event_tx.send(WatchEvent::FileCreated(path.clone())).is_err() {
                            return false;
                        }
                    }
                }
            }
            Err(errors) => {
                for error in errors {
                    if event_tx
                        .send(WatchEvent::Error(WatcherError::Notify(error)))
                        .is_err()
                    {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Stop watching. Calling this more than once is a no-op.
    ///
    /// Does not wait for the bridge thread, so it is safe to call from an
    /// async task. The event channel closes once the thread has exited.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
            tracing::debug!(path = %self.watch_path.display(), "Stopped gamelog watcher");
        }
    }

    /// Whether the watcher is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some()
    }

    /// Get the directory being watched.
    #[must_use]
    pub fn watch_path(&self) -> &Path {
        &self.watch_path
    }
}

impl Drop for GamelogWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for GamelogWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GamelogWatcher")
            .field("watch_path", &self.watch_path)
            .field("running", &self.is_running())
            .finish()
    }
}
