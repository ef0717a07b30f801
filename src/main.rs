//! Livedps - live DPS and logistics tracking from EVE Online gamelogs.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};

use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use livedps::config::{ConfigLoader, LivedpsConfig};
use livedps::directory::CharacterDirectory;
use livedps::display;
use livedps::tracker::{Tracker, TrackerCommand, TrackerEvent, TrackerHandle};
use livedps::watcher::{
    recent_logs, DefaultLogRoot, FixedLogRoot, LogRootResolver, WatcherError,
};

#[derive(Parser)]
#[command(
    name = "livedps",
    about = "Live DPS and logistics totals from EVE Online gamelogs",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file to load instead of the default search paths.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gamelog directory to watch.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Polling interval in milliseconds.
    #[arg(long, global = true)]
    interval_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tail the gamelogs of every logged-in character.
    Watch {
        /// Character to report on instead of the first one found.
        #[arg(short, long)]
        character: Option<String>,
        /// Print one JSON object per tick.
        #[arg(long)]
        json: bool,
    },
    /// Replay a finished gamelog at its original pace.
    Playback {
        /// The gamelog to replay.
        file: PathBuf,
        /// Replay speed multiplier.
        #[arg(short, long)]
        speed: Option<f64>,
        /// Print one JSON object per tick.
        #[arg(long)]
        json: bool,
    },
    /// List the characters with a recent gamelog.
    Scan,
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<LivedpsConfig, livedps::config::ConfigError> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path.clone()),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;
    if let Some(dir) = &cli.log_dir {
        config.log_dir = Some(dir.clone());
    }
    if let Some(ms) = cli.interval_ms {
        config.poll_interval_ms = ms;
    }
    Ok(config)
}

fn resolver(config: &LivedpsConfig) -> Box<dyn LogRootResolver> {
    match &config.log_dir {
        Some(dir) => Box::new(FixedLogRoot(dir.clone())),
        None => Box::new(DefaultLogRoot),
    }
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            return;
        }
        tracing::info!("Shutting down");
        token.cancel();
    });
}

fn print_event(event: TrackerEvent, character: Option<&str>, json: bool) {
    match event {
        TrackerEvent::Totals(totals) if json => display::print_totals_json(&totals),
        TrackerEvent::Totals(totals) => display::print_totals(character, &totals),
        TrackerEvent::Registered {
            path,
            character,
            registration,
        } => {
            if !json {
                display::print_registered(&character, registration, &path);
            }
        }
        TrackerEvent::Alert(error) => display::print_alert(&error),
        TrackerEvent::PlaybackFinished => {
            if !json {
                display::print_warning("Playback finished");
            }
        }
        TrackerEvent::Rejected { error, .. } => display::print_warning(&error.to_string()),
    }
}

/// Forward interactive commands from stdin to the tracker until stdin closes.
fn forward_stdin(handle: TrackerHandle, playback_speed: f64) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let Some(command) = TrackerCommand::parse(&line, playback_speed) else {
                        continue;
                    };
                    if !handle.send(command) {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read stdin");
                    break;
                }
            }
        }
    });
}

async fn watch(config: &LivedpsConfig, character: Option<String>, json: bool) {
    let resolver = resolver(config);
    // Shared with the sink so every tick is labelled with the current source
    let reporting = Arc::new(Mutex::new(None::<String>));
    let mut directory = CharacterDirectory::new();
    let observed = Arc::clone(&reporting);
    directory.set_observer(move |name: &str| {
        tracing::info!(character = %name, "Reporting on character");
        if let Ok(mut current) = observed.lock() {
            *current = Some(name.to_string());
        }
    });

    let (mut tracker, report) = Tracker::start(config, resolver.as_ref(), directory).await;
    match &report.root_error {
        Some(error @ (WatcherError::RootNotFound(_) | WatcherError::NoLogRoot)) => {
            display::print_warning(&format!("Not tracking: {error}"));
        }
        Some(error) => {
            display::print_warning(&format!("New gamelogs will not be picked up: {error}"));
        }
        None => {}
    }
    for alert in &report.alerts {
        display::print_alert(alert);
    }

    if let Some(name) = character {
        if let Err(e) = tracker.directory_mut().select_by_name(&name).await {
            display::print_warning(&e.to_string());
        }
    }
    if !json {
        let directory = tracker.directory();
        display::print_characters(directory.characters(), directory.selected());
    }
    if let Ok(mut current) = reporting.lock() {
        *current = tracker.directory().selected_character().map(String::from);
    }

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());
    forward_stdin(tracker.handle(), config.playback_speed);

    tracker
        .run(cancel, move |event| {
            let Ok(mut current) = reporting.lock() else {
                return;
            };
            match &event {
                // The first registered character is selected without notification
                TrackerEvent::Registered { character, .. } if current.is_none() => {
                    *current = Some(character.clone());
                }
                _ => {}
            }
            print_event(event, current.as_deref(), json);
        })
        .await;
}

async fn playback(config: &LivedpsConfig, file: PathBuf, speed: f64, json: bool) -> ExitCode {
    let mut directory = CharacterDirectory::new();
    if let Err(e) = directory.start_playback(&file, speed).await {
        display::print_error(&format!("Cannot replay {}: {e}", file.display()));
        return ExitCode::FAILURE;
    }
    let character = directory
        .playback()
        .map(|reader| reader.character().to_string());
    tracing::info!(path = %file.display(), speed, "Starting playback");

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let done = cancel.clone();
    let tracker = Tracker::new(directory, config.poll_interval());
    tracker
        .run(cancel, move |event| {
            let finished = matches!(event, TrackerEvent::PlaybackFinished);
            print_event(event, character.as_deref(), json);
            if finished {
                done.cancel();
            }
        })
        .await;
    ExitCode::SUCCESS
}

async fn scan(config: &LivedpsConfig) -> ExitCode {
    let Some(root) = resolver(config).resolve() else {
        display::print_error("No gamelog directory for this platform, pass --log-dir");
        return ExitCode::FAILURE;
    };

    let now = chrono::Utc::now().naive_utc();
    let paths = match recent_logs(&root, now, config.scan_window()) {
        Ok(paths) => paths,
        Err(e) => {
            display::print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    let mut directory = CharacterDirectory::new();
    for path in paths {
        if let Err(e) = directory.register(&path).await {
            if e.needs_attention() {
                display::print_alert(&e);
            } else {
                tracing::debug!(path = %path.display(), error = %e, "Skipping gamelog");
            }
        }
    }

    if directory.is_empty() {
        display::print_warning(&format!("No recent gamelogs in {}", root.display()));
    } else {
        display::print_characters(directory.characters(), directory.selected());
    }
    ExitCode::SUCCESS
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            display::print_error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Watch { character, json } => {
            watch(&config, character, json).await;
            ExitCode::SUCCESS
        }
        Commands::Playback { file, speed, json } => {
            let speed = speed.unwrap_or(config.playback_speed);
            playback(&config, file, speed, json).await
        }
        Commands::Scan => scan(&config).await,
    }
}
