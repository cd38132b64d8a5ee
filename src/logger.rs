//! Session logger: a `log` backend that writes to one file in the OS data
//! directory.
//!
//! The file is **truncated at each launch**, so it only ever holds the most
//! recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\PixelSurface\pixelsurface.log`
//!   Linux:    `~/.local/share/PixelSurface/pixelsurface.log`
//!   macOS:    `~/Library/Application Support/PixelSurface/pixelsurface.log`
//!
//! Call [`init`] once from the host; afterwards the regular `log::info!` /
//! `log::warn!` / `log::debug!` macros end up in the file. Panics are mirrored
//! into the file through a panic hook.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{LevelFilter, Log, Metadata, Record};

static LOGGER: OnceLock<SessionLogger> = OnceLock::new();

struct SessionLogger {
    file: Mutex<File>,
    path: PathBuf,
    level: LevelFilter,
}

impl SessionLogger {
    /// Write one raw line. I/O errors are ignored so logging never takes the
    /// editor down.
    fn write_line(&self, line: &str) {
        if let Ok(mut file) = self.file.lock() {
            let _ = writeln!(file, "{}", line);
        }
    }
}

impl Log for SessionLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.write_line(&format_line(&timestamp(), record.level().as_str(), &record.args().to_string()));
        }
    }

    fn flush(&self) {
        if let Ok(mut file) = self.file.lock() {
            let _ = file.flush();
        }
    }
}

/// Path of the current session log, once [`init`] succeeded.
pub fn log_path() -> Option<&'static Path> {
    LOGGER.get().map(|logger| logger.path.as_path())
}

/// Install the session logger at the default location.
pub fn init(level: LevelFilter) -> Option<&'static Path> {
    init_at(log_file_path(), level)
}

/// Install the session logger writing to `path`.
///
/// * Creates (or truncates) the log file.
/// * Registers it as the global `log` backend.
/// * Installs a panic hook that writes the panic message to the log before
///   running the previous handler.
///
/// Returns `None` (and leaves logging untouched) when the file cannot be
/// opened or another logger is already installed.
pub fn init_at(path: PathBuf, level: LevelFilter) -> Option<&'static Path> {
    if let Some(existing) = log_path() {
        return Some(existing);
    }
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let file = match OpenOptions::new().create(true).write(true).truncate(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            // not fatal, the host simply runs without a log file
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            return None;
        }
    };

    let logger = LOGGER.get_or_init(|| SessionLogger {
        file: Mutex::new(file),
        path,
        level,
    });
    if log::set_logger(logger).is_err() {
        eprintln!("[logger] Another logger is already installed");
        return None;
    }
    log::set_max_level(level);

    logger.write_line(&format!("=== PixelSurface session started (unix {}) ===", unix_seconds()));
    logger.write_line(&format!("Log file: {}", logger.path.display()));
    logger.write_line("");

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Some(logger) = LOGGER.get() {
            logger.write_line(&format_line(&timestamp(), "PANIC", &info.to_string()));
        }
        prev(info);
    }));

    Some(logger.path.as_path())
}

fn log_file_path() -> PathBuf {
    data_dir().join("PixelSurface").join("pixelsurface.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

fn format_line(timestamp: &str, level: &str, msg: &str) -> String {
    format!("[{}] [{}] {}", timestamp, level, msg)
}

fn unix_seconds() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// `HH:MM:SS` within the current (UTC) day.
fn timestamp() -> String {
    clock_of(unix_seconds())
}

fn clock_of(secs: u64) -> String {
    let h = (secs % 86400) / 3600;
    let m = (secs % 3600) / 60;
    let s = secs % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_format() {
        assert_eq!(clock_of(3 * 3600 + 7 * 60 + 9), "03:07:09");
        assert_eq!(clock_of(86400 + 61), "00:01:01");
        assert_eq!(format_line("12:00:00", "INFO", "ready"), "[12:00:00] [INFO] ready");
    }

    #[test]
    fn default_location() {
        let path = log_file_path();
        assert!(path.ends_with("PixelSurface/pixelsurface.log"));
    }
}
