//! # Logging
//!
//! `tracing` subscriber setup for the armtrap binary.
//!
//! Engine diagnostics (kernel calls, slot changes, clamps, restore failures)
//! are emitted by `armtrap-core` through the `tracing` macros; this module
//! decides where they go. Console output is written to stderr so it never
//! interleaves with command results on stdout.
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: filter directives (e.g. `RUST_LOG=armtrap_core=debug`)
//! - `ARMTRAP_LOG_FORMAT`: `pretty` (default) or `json`
//! - `ARMTRAP_LOG_FILE`: also write logs to this file, prefixed with the UTC date
//!
//! A level or format passed on the command line wins over the environment.
//!
//! ## Example
//!
//! ```rust,no_run
//! use armtrap_utils::{init_logging, LogConfig, LogLevel};
//!
//! let config = LogConfig::from_env().with_level(Some(LogLevel::Debug));
//! let _guard = init_logging(&config).expect("Failed to initialize logging");
//! tracing::info!("ready");
//! ```

use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::{self};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Environment variable selecting the output format.
pub const FORMAT_ENV: &str = "ARMTRAP_LOG_FORMAT";

/// Environment variable naming an additional log file.
pub const FILE_ENV: &str = "ARMTRAP_LOG_FILE";

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat
{
    /// Compact, human-readable lines
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(LoggingError::InvalidFormat(s.to_string())),
        }
    }
}

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel
{
    Error,
    /// Default: clamps and non-fatal failures are always visible
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level
{
    fn from(level: LogLevel) -> Self
    {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

impl FromStr for LogLevel
{
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        match s.to_lowercase().as_str() {
            "error" | "err" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" | "dbg" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            _ => Err(LoggingError::InvalidLevel(s.to_string())),
        }
    }
}

/// Resolved logging settings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig
{
    /// Explicit level; overrides `RUST_LOG` when set
    pub level: Option<LogLevel>,
    /// `RUST_LOG` directives, if any
    pub directives: Option<String>,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl LogConfig
{
    /// Read `RUST_LOG`, `ARMTRAP_LOG_FORMAT` and `ARMTRAP_LOG_FILE`.
    pub fn from_env() -> Self
    {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    ///
    /// An unparseable format falls back to pretty; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            level: None,
            directives: get("RUST_LOG"),
            format: get(FORMAT_ENV)
                .and_then(|value| value.parse().ok())
                .unwrap_or_default(),
            file: get(FILE_ENV).map(PathBuf::from),
        }
    }

    /// Override the level (e.g. from `--log-level`).
    #[must_use]
    pub fn with_level(mut self, level: Option<LogLevel>) -> Self
    {
        if level.is_some() {
            self.level = level;
        }
        self
    }

    /// Override the format (e.g. from `--log-format`).
    #[must_use]
    pub fn with_format(mut self, format: Option<LogFormat>) -> Self
    {
        if let Some(format) = format {
            self.format = format;
        }
        self
    }

    /// Filter directives in effect: explicit level, then `RUST_LOG`, then warn.
    pub fn filter_directives(&self) -> String
    {
        match (self.level, &self.directives) {
            (Some(level), _) => Level::from(level).to_string(),
            (None, Some(directives)) => directives.clone(),
            (None, None) => Level::from(LogLevel::default()).to_string(),
        }
    }

    /// Dated file the logs are written to, if file logging is on.
    ///
    /// `/tmp/armtrap.log` becomes `/tmp/2025-01-31-armtrap.log`.
    pub fn dated_file(&self) -> Option<PathBuf>
    {
        let file = self.file.as_ref()?;
        let name = file.file_name()?.to_string_lossy();
        let today = Utc::now().format("%Y-%m-%d");
        let dir = file.parent().filter(|dir| !dir.as_os_str().is_empty()).unwrap_or(Path::new("."));
        Some(dir.join(format!("{today}-{name}")))
    }
}

/// Keeps the background file writer alive; drop it last.
#[derive(Debug)]
pub struct LoggingGuard
{
    _file: Option<WorkerGuard>,
    /// Where file logs are going, if anywhere
    pub file: Option<PathBuf>,
}

/// Install the global subscriber.
///
/// ## Errors
///
/// - `InvalidFilter`: the directives don't parse
/// - `FileError`: the log directory can't be created
/// - `InitializationFailed`: a global subscriber is already set
pub fn init_logging(config: &LogConfig) -> Result<LoggingGuard, LoggingError>
{
    let directives = config.filter_directives();
    let filter = || EnvFilter::try_new(&directives).map_err(|err| LoggingError::InvalidFilter(err.to_string()));

    let console = match config.format {
        LogFormat::Pretty => fmt::layer()
            .compact()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_ansi(true)
            .with_writer(io::stderr)
            .with_filter(filter()?)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_timer(ChronoUtc::rfc_3339())
            .with_current_span(true)
            .with_writer(io::stderr)
            .with_filter(filter()?)
            .boxed(),
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = vec![console];
    let mut worker = None;
    let path = config.dated_file();

    if let Some(path) = &path {
        let dir = path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;
        let name = path.file_name().unwrap_or_default();
        // date is already in the name
        let appender = tracing_appender::rolling::never(dir, name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        worker = Some(guard);

        let file_layer = match config.format {
            LogFormat::Pretty => fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(false)
                .with_filter(filter()?)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_current_span(true)
                .with_filter(filter()?)
                .boxed(),
        };
        layers.push(file_layer);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .map_err(|err| LoggingError::InitializationFailed(err.to_string()))?;

    Ok(LoggingGuard {
        _file: worker,
        file: path,
    })
}

/// Logging initialization error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError
{
    #[error("Invalid log format: {0}. Use 'pretty' or 'json'")]
    InvalidFormat(String),

    #[error("Invalid log level: {0}. Use 'error', 'warn', 'info', 'debug', or 'trace'")]
    InvalidLevel(String),

    /// `RUST_LOG` or the level didn't parse as filter directives
    #[error("Invalid log filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to initialize logging: {0}")]
    InitializationFailed(String),

    #[error("File logging error: {0}")]
    FileError(#[from] io::Error),
}

#[cfg(test)]
mod tests
{
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String>
    {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_log_format_from_str()
    {
        assert_eq!(LogFormat::from_str("pretty").unwrap(), LogFormat::Pretty);
        assert_eq!(LogFormat::from_str("JSON").unwrap(), LogFormat::Json);
        assert!(matches!(LogFormat::from_str("xml"), Err(LoggingError::InvalidFormat(_))));
    }

    #[test]
    fn test_log_level_from_str()
    {
        assert_eq!(LogLevel::from_str("warning").unwrap(), LogLevel::Warn);
        assert_eq!(LogLevel::from_str("dbg").unwrap(), LogLevel::Debug);
        assert_eq!(Level::from(LogLevel::Trace), Level::TRACE);
        assert!(matches!(LogLevel::from_str("loud"), Err(LoggingError::InvalidLevel(_))));
    }

    #[test]
    fn test_config_defaults()
    {
        let config = LogConfig::from_lookup(lookup(&[]));
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.filter_directives(), "WARN");
        assert!(config.dated_file().is_none());
    }

    #[test]
    fn test_config_from_env()
    {
        let config = LogConfig::from_lookup(lookup(&[
            ("RUST_LOG", "armtrap_core=debug"),
            (FORMAT_ENV, "json"),
            (FILE_ENV, "/tmp/armtrap.log"),
        ]));
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter_directives(), "armtrap_core=debug");

        let dated = config.dated_file().unwrap();
        assert_eq!(dated.parent(), Some(Path::new("/tmp")));
        let name = dated.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.ends_with("-armtrap.log"));
        assert_eq!(name.len(), "YYYY-MM-DD-armtrap.log".len());
    }

    #[test]
    fn test_cli_overrides_env()
    {
        let config = LogConfig::from_lookup(lookup(&[("RUST_LOG", "trace"), (FORMAT_ENV, "json")]))
            .with_level(Some(LogLevel::Error))
            .with_format(Some(LogFormat::Pretty));
        assert_eq!(config.filter_directives(), "ERROR");
        assert_eq!(config.format, LogFormat::Pretty);

        // absent overrides keep the environment
        let config = LogConfig::from_lookup(lookup(&[("RUST_LOG", "info")])).with_level(None);
        assert_eq!(config.filter_directives(), "info");
    }

    #[test]
    fn test_blank_and_bad_values_are_ignored()
    {
        let config = LogConfig::from_lookup(lookup(&[("RUST_LOG", "  "), (FORMAT_ENV, "yaml"), (FILE_ENV, "")]));
        assert_eq!(config, LogConfig::default());
    }

    #[test]
    fn test_relative_log_file()
    {
        let config = LogConfig {
            file: Some(PathBuf::from("armtrap.log")),
            ..LogConfig::default()
        };
        let dated = config.dated_file().unwrap();
        assert_eq!(dated.parent(), Some(Path::new(".")));
    }
}
