//! Utility functions shared across the crate.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, TimeZone};

use crate::error::{Error, Result};

/// Get the user's config directory following XDG conventions.
///
/// Returns `$XDG_CONFIG_HOME` if set, otherwise `$HOME/.config`.
pub fn config_dir() -> Option<PathBuf> {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
}

/// Milliseconds since the Unix epoch (0 if the clock is before 1970).
pub fn unix_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis())
}

/// Today's local date rendered with a strftime pattern.
pub fn format_today(pattern: &str) -> Result<String> {
    format_date(&Local::now(), pattern)
}

/// Render `date` with a strftime pattern, rejecting invalid patterns.
pub fn format_date<Tz: TimeZone>(date: &DateTime<Tz>, pattern: &str) -> Result<String>
where
    Tz::Offset: std::fmt::Display,
{
    if !is_valid_date_format(pattern) {
        return Err(invalid_date_format(pattern));
    }

    let mut out = String::new();
    write!(out, "{}", date.format(pattern)).map_err(|_| invalid_date_format(pattern))?;
    Ok(out)
}

/// Whether chrono can parse every specifier in `pattern`.
pub fn is_valid_date_format(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

fn invalid_date_format(pattern: &str) -> Error {
    Error::ConfigInvalid {
        field: "report.date_format".to_string(),
        reason: format!("'{pattern}' is not a valid strftime pattern"),
    }
}
