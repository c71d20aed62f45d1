//! Log sink initialisation.
//!
//! Console logging goes through `env_logger` with an `info` default
//! (`RUST_LOG` respected). With file logging enabled, every record is
//! appended to the configured file as
//! `<timestamp> <source-name> <level> <message>`.

use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use log::LevelFilter;
use std::fs::OpenOptions;
use std::io::Write;

use crate::config::LogSettings;

pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %I:%M:%S,%3f %p";

/// Build the logger for the agent without installing it.
pub fn builder(settings: &LogSettings, debug: bool) -> Result<Builder> {
    let default_filter = if debug { "debug" } else { "info" };
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_filter));

    if settings.enabled {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&settings.log_file)
            .with_context(|| format!("open log file {}", settings.log_file.display()))?;
        builder
            .target(Target::Pipe(Box::new(file)))
            .filter_level(LevelFilter::Debug)
            .format(|buf, record| {
                writeln!(
                    buf,
                    "{} {} {} {}",
                    format_timestamp(chrono::Local::now()),
                    record.target(),
                    record.level(),
                    record.args()
                )
            });
    }
    Ok(builder)
}

/// Install the global logger. Call once, before the first record.
pub fn init(settings: &LogSettings, debug: bool) -> Result<()> {
    builder(settings, debug)?
        .try_init()
        .context("logger already initialised")
}

pub fn format_timestamp<Tz>(at: chrono::DateTime<Tz>) -> String
where
    Tz: chrono::TimeZone,
    Tz::Offset: std::fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    #[test]
    fn timestamp_uses_twelve_hour_clock_with_millis() {
        let at = chrono::Utc
            .with_ymd_and_hms(2024, 3, 9, 14, 5, 7)
            .unwrap()
            + chrono::Duration::milliseconds(42);
        assert_eq!(format_timestamp(at), "03/09/2024 02:05:07,042 PM");
    }

    #[test]
    fn file_logging_creates_the_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = LogSettings {
            enabled: true,
            log_file: dir.path().join("agods.log"),
        };
        builder(&settings, false).unwrap();
        assert!(settings.log_file.exists());
    }

    #[test]
    fn unwritable_log_file_is_reported() {
        let settings = LogSettings {
            enabled: true,
            log_file: PathBuf::from("/nonexistent/dir/agods.log"),
        };
        assert!(builder(&settings, false).is_err());
    }
}
