//! Colored CLI display utilities for tracker output.
//!
//! This module provides functions for printing colored, formatted output
//! to the terminal while tailing gamelogs.

use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use owo_colors::OwoColorize;

use crate::directory::{DirectoryError, Registration};
use crate::extract::EventTotals;
use crate::reader::ReaderError;

/// Get current timestamp in the same format as tracing.
fn timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Format totals as `out/in` pairs per category.
#[must_use]
pub fn format_totals(totals: &EventTotals) -> String {
    format!(
        "dps {}/{}  logi {}/{}  cap {}/{}  neut {}/{}",
        totals.damage_out,
        totals.damage_in,
        totals.logistics_out,
        totals.logistics_in,
        totals.cap_transferred_out,
        totals.cap_received_in,
        totals.cap_damage_done,
        totals.cap_damage_received
    )
}

/// Print one polling tick.
pub fn print_totals(character: Option<&str>, totals: &EventTotals) {
    let who = character.unwrap_or("-");
    if totals.is_zero() {
        println!(
            "{} {} {}",
            timestamp().dimmed(),
            format!("[{who}]").blue().bold(),
            format_totals(totals).dimmed()
        );
    } else {
        println!(
            "{} {} {}",
            timestamp().dimmed(),
            format!("[{who}]").blue().bold(),
            format_totals(totals)
        );
    }
    let _ = io::stdout().flush();
}

/// Print one polling tick as a JSON line.
pub fn print_totals_json(totals: &EventTotals) {
    match serde_json::to_string(totals) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!(error = %e, "Failed to serialize totals"),
    }
    let _ = io::stdout().flush();
}

/// Print a newly attributed gamelog.
pub fn print_registered(character: &str, registration: Registration, path: &Path) {
    let label = match registration {
        Registration::Added(_) => "[NEW]".green().bold().to_string(),
        Registration::Replaced(_) => "[SWITCH]".cyan().bold().to_string(),
        Registration::AlreadyTracked(_) | Registration::Ignored => return,
    };
    println!(
        "{} {} {} {}",
        timestamp().dimmed(),
        label,
        character.bold(),
        path.display().dimmed()
    );
    let _ = io::stdout().flush();
}

/// Print a condition the user has to act on.
pub fn print_alert(error: &DirectoryError) {
    let ts = timestamp();
    if let DirectoryError::Reader(ReaderError::HeaderCollision {
        path,
        character,
        other,
    }) = error
    {
        println!(
            "{} {} {} and {} logged in during the same second and share one gamelog",
            ts.dimmed(),
            "[COLLISION]".red().bold(),
            character.bold(),
            other.bold()
        );
        println!(
            "{} {} Restart the client you want to track, or delete {}",
            ts.dimmed(),
            "[COLLISION]".red().bold(),
            path.display()
        );
    } else {
        print_error(&error.to_string());
    }
    let _ = io::stdout().flush();
}

/// Print the tracked characters.
pub fn print_characters<'a>(
    characters: impl Iterator<Item = (usize, &'a str)>,
    selected: Option<usize>,
) {
    for (index, name) in characters {
        if Some(index) == selected {
            println!("{} {}", format!("*{index}").green().bold(), name.bold());
        } else {
            println!("{} {}", format!(" {index}").dimmed(), name);
        }
    }
    let _ = io::stdout().flush();
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), message);
    let _ = io::stdout().flush();
}

/// Print an error message.
pub fn print_error(message: &str) {
    println!("{} {}", "[ERROR]".red().bold(), message);
    let _ = io::stdout().flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_totals_zero() {
        assert_eq!(
            format_totals(&EventTotals::zero()),
            "dps 0/0  logi 0/0  cap 0/0  neut 0/0"
        );
    }

    #[test]
    fn test_format_totals_order() {
        let totals = EventTotals {
            damage_out: 1,
            damage_in: 2,
            logistics_out: 3,
            logistics_in: 4,
            cap_transferred_out: 5,
            cap_received_in: 6,
            cap_damage_done: 7,
            cap_damage_received: 8,
        };
        assert_eq!(
            format_totals(&totals),
            "dps 1/2  logi 3/4  cap 5/6  neut 7/8"
        );
    }
}
