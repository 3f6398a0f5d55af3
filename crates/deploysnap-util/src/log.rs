//! Logging setup using tracing.
//!
//! The snapshot library only emits `tracing` events and never installs a
//! subscriber. Hosts call [`init`] once at startup to decide where those
//! events go; without it the library is silent.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable that overrides the configured level filter.
pub const LOG_ENV: &str = "DEPLOYSNAP_LOG";

/// Log level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parse a log level from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Whether to print logs to stderr.
    pub print: bool,
    /// Log level.
    pub level: LogLevel,
    /// Whether to include file/line info in logs.
    pub include_location: bool,
    /// Append logs to this file as well.
    pub file: Option<PathBuf>,
}

impl LogConfig {
    /// Directive used when `DEPLOYSNAP_LOG` is not set. Only our own crates
    /// are raised to the configured level; everything else stays at warn.
    pub fn filter_directive(&self) -> String {
        let level = self.level.as_str();
        format!(
            "warn,deploysnap={level},deploysnap_snapshot={level},deploysnap_util={level}"
        )
    }
}

/// Initialize logging with the given configuration.
///
/// Returns the log file actually opened, if any. A log file that cannot be
/// opened is reported on stderr and skipped; it never aborts startup. Calling
/// this twice leaves the first subscriber in place.
pub fn init(config: &LogConfig) -> Option<PathBuf> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directive()));

    let stderr_layer = config.print.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
    });

    let mut opened = None;
    let file_layer = match config.file.as_deref() {
        Some(path) => match open_log_file(path) {
            Ok(file) => {
                opened = Some(path.to_path_buf());
                Some(
                    fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false)
                        .with_target(true),
                )
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file {}: {e}", path.display());
                None
            }
        },
        None => None,
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    opened
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Get the default log file path.
///
/// Linux: `~/.local/state/deploysnap/logs/deploysnap.log`; elsewhere the
/// platform's local data directory.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .map(|p| p.join("deploysnap").join("logs").join("deploysnap.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::parse("debug"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::parse("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("invalid"), None);
    }

    #[test]
    fn test_log_level_as_str() {
        assert_eq!(LogLevel::Debug.as_str(), "debug");
        assert_eq!(LogLevel::Error.as_str(), "error");
    }

    #[test]
    fn test_default_log_config() {
        let config = LogConfig::default();
        assert!(!config.print);
        assert_eq!(config.level, LogLevel::Info);
        assert!(config.file.is_none());
    }

    #[test]
    fn test_filter_directive_targets_workspace_crates() {
        let config = LogConfig {
            level: LogLevel::Debug,
            ..Default::default()
        };
        let directive = config.filter_directive();
        assert!(directive.starts_with("warn,"));
        assert!(directive.contains("deploysnap_snapshot=debug"));
    }

    #[test]
    fn test_open_log_file_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/logs/deploysnap.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }
}
