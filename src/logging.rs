//! Tracing subscriber setup.
//!
//! Runs and tool dispatches emit `tracing` spans and events. This module
//! routes them to a daily-rotated file under the XDG data directory and
//! echoes warnings to stderr for the CLI. `RUST_LOG` replaces the file level
//! when set.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Name used for the log directory and file prefix.
pub const APP_NAME: &str = "acton-tools-agent";

/// The file writer lives as long as the process once installed.
static FILE_WRITER: OnceLock<LoggingGuard> = OnceLock::new();

/// The `[logging]` section.
///
/// ```rust
/// use acton_tools_agent::logging::{LogLevel, LoggingConfig};
///
/// let config: LoggingConfig = toml::from_str("level = \"debug\"").unwrap();
/// assert_eq!(config.level, LogLevel::Debug);
/// assert!(config.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write the rotating log file
    pub enabled: bool,
    /// File prefix; files are named `{app_name}.log.YYYY-MM-DD`
    pub app_name: String,
    /// Overrides `$XDG_DATA_HOME/acton-tools-agent/logs`
    pub log_dir: Option<PathBuf>,
    /// File level when `RUST_LOG` is unset
    pub level: LogLevel,
    /// Stderr level; `None` keeps stderr quiet
    pub stderr_level: Option<LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            app_name: APP_NAME.to_string(),
            log_dir: None,
            level: LogLevel::Info,
            stderr_level: Some(LogLevel::Warn),
        }
    }
}

impl LoggingConfig {
    /// Installs nothing at all. Used by tests and embedders that bring their
    /// own subscriber.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            stderr_level: None,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_log_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_stderr_level(mut self, level: Option<LogLevel>) -> Self {
        self.stderr_level = level;
        self
    }

    /// Where the log file goes.
    ///
    /// # Errors
    ///
    /// Fails when no `log_dir` is set and the platform has no data directory.
    pub fn resolve_log_dir(&self) -> Result<PathBuf, LoggingError> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_local_dir()
                .map(|data| data.join(APP_NAME).join("logs"))
                .ok_or(LoggingError {
                    kind: LoggingErrorKind::NoDataDir,
                }),
        }
    }

    fn file_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::default().add_directive(self.level.to_filter().into()))
    }
}

/// Severity threshold, spelled in lowercase in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// The matching subscriber filter.
    #[must_use]
    pub fn to_filter(self) -> LevelFilter {
        match self {
            Self::Trace => LevelFilter::TRACE,
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warn => LevelFilter::WARN,
            Self::Error => LevelFilter::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(LoggingError {
                kind: LoggingErrorKind::UnknownLevel {
                    level: s.to_string(),
                },
            }),
        }
    }
}

/// Keeps the non-blocking file writer flushing; dropping it stops file
/// output after a final flush.
pub struct LoggingGuard {
    _writer: WorkerGuard,
}

impl fmt::Debug for LoggingGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LoggingGuard")
    }
}

/// Why logging could not be set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingError {
    pub kind: LoggingErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoggingErrorKind {
    /// No `log_dir` and no platform data directory
    NoDataDir,
    /// The log directory could not be created
    CreateDirFailed { path: PathBuf, reason: String },
    /// Another global subscriber is already installed
    SubscriberInitFailed { reason: String },
    /// A level name that is not one of trace, debug, info, warn, error
    UnknownLevel { level: String },
}

impl LoggingError {
    /// Returns true if no log directory could be determined.
    #[must_use]
    pub fn is_no_data_dir(&self) -> bool {
        matches!(self.kind, LoggingErrorKind::NoDataDir)
    }
}

impl fmt::Display for LoggingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            LoggingErrorKind::NoDataDir => f.write_str(
                "no data directory for log files; set logging.log_dir or XDG_DATA_HOME",
            ),
            LoggingErrorKind::CreateDirFailed { path, reason } => write!(
                f,
                "cannot create log directory '{}': {reason}",
                path.display()
            ),
            LoggingErrorKind::SubscriberInitFailed { reason } => {
                write!(f, "tracing subscriber already installed: {reason}")
            }
            LoggingErrorKind::UnknownLevel { level } => write!(
                f,
                "unknown log level '{level}'; use trace, debug, info, warn or error"
            ),
        }
    }
}

impl std::error::Error for LoggingError {}

fn open_log_dir(path: &Path) -> Result<(), LoggingError> {
    std::fs::create_dir_all(path).map_err(|e| LoggingError {
        kind: LoggingErrorKind::CreateDirFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })
}

/// Installs the global subscriber described by `config`.
///
/// Returns the file writer guard when file logging is on. The caller must
/// hold it; [`init_and_store_logging`] does that for the process lifetime.
///
/// # Errors
///
/// Fails if the log directory cannot be created or a subscriber is already
/// installed.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<LoggingGuard>, LoggingError> {
    if !config.enabled && config.stderr_level.is_none() {
        return Ok(None);
    }

    let mut guard = None;
    let file_layer = if config.enabled {
        let dir = config.resolve_log_dir()?;
        open_log_dir(&dir)?;

        let appender = tracing_appender::rolling::daily(&dir, format!("{}.log", config.app_name));
        let (writer, worker) = tracing_appender::non_blocking(appender);
        guard = Some(LoggingGuard { _writer: worker });

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false)
                .with_filter(config.file_filter()),
        )
    } else {
        None
    };

    let stderr_layer = config.stderr_level.map(|level| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .without_time()
            .with_target(false)
            .with_filter(level.to_filter())
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| LoggingError {
            kind: LoggingErrorKind::SubscriberInitFailed {
                reason: e.to_string(),
            },
        })?;

    Ok(guard)
}

/// Installs the subscriber once and parks the file guard in a static.
///
/// Returns `Ok(false)` when a previous call already installed it or
/// `config` enables nothing.
///
/// # Errors
///
/// See [`init_logging`].
pub fn init_and_store_logging(config: &LoggingConfig) -> Result<bool, LoggingError> {
    if FILE_WRITER.get().is_some() {
        return Ok(false);
    }

    let installed = config.enabled || config.stderr_level.is_some();
    if let Some(guard) = init_logging(config)? {
        // Losing a race to another initializer only drops the spare guard.
        let _ = FILE_WRITER.set(guard);
    }
    Ok(installed)
}
