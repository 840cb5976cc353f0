//! Diagnostic logging.
//!
//! Output goes to stderr or, when a log file is configured, is appended to
//! that file. Each setting is taken from the first source that provides it:
//!
//! - level: `--log-level`, then `-v` (debug), then `NEWSROOM_LOG`, then
//!   `[general] log_level`, then `error`
//! - format: `--json-output`, then `NEWSROOM_LOG_FORMAT`, then
//!   `[general] log_format`, then human
//! - file: `NEWSROOM_LOG_FILE`, then `[general] log_file`, then stderr
//!
//! `RUST_LOG`, when set, replaces the level filter entirely.

use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::error::NewsroomError;
use crate::storage::config::GeneralConfig;

const LOG_LEVEL_ENV: &str = "NEWSROOM_LOG";
const LOG_FORMAT_ENV: &str = "NEWSROOM_LOG_FORMAT";
const LOG_FILE_ENV: &str = "NEWSROOM_LOG_FILE";

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Level and message, no timestamps or targets.
    #[default]
    Human,
    /// One JSON object per event, plus span close events.
    Json,
    /// Single terse line with target.
    Compact,
}

impl FromStr for LogFormat {
    type Err = NewsroomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            other => Err(NewsroomError::Config(format!(
                "Invalid log format \"{other}\". Valid formats: human, json, compact"
            ))),
        }
    }
}

/// Verbosity of the `newsroom` target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    #[default]
    Error,
}

impl LogLevel {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = NewsroomError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(NewsroomError::Config(format!(
                "Invalid log level \"{other}\". Valid levels: trace, debug, info, warn, error"
            ))),
        }
    }
}

/// Logging-related command line flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFlags<'a> {
    pub level: Option<&'a str>,
    pub json: bool,
    pub verbose: bool,
}

/// Logging variables read from the process environment. Blank values count as unset.
#[derive(Debug, Clone, Default)]
pub struct LogEnv {
    pub level: Option<String>,
    pub format: Option<String>,
    pub file: Option<PathBuf>,
}

impl LogEnv {
    #[must_use]
    pub fn from_env() -> Self {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            level: read(LOG_LEVEL_ENV),
            format: read(LOG_FORMAT_ENV),
            file: read(LOG_FILE_ENV).map(PathBuf::from),
        }
    }
}

/// Effective logging setup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl LogSettings {
    /// Merge flags, environment and config. Unparseable values are skipped
    /// in favour of the next source.
    #[must_use]
    pub fn resolve(flags: LogFlags<'_>, env: &LogEnv, config: Option<&GeneralConfig>) -> Self {
        let level = flags
            .level
            .and_then(|l| l.parse().ok())
            .or_else(|| flags.verbose.then_some(LogLevel::Debug))
            .or_else(|| env.level.as_deref().and_then(|l| l.parse().ok()))
            .or_else(|| config.and_then(|c| c.log_level.as_deref()?.parse().ok()))
            .unwrap_or_default();

        let format = if flags.json {
            LogFormat::Json
        } else {
            env.format
                .as_deref()
                .and_then(|f| f.parse().ok())
                .or_else(|| config.and_then(|c| c.log_format.as_deref()?.parse().ok()))
                .unwrap_or_default()
        };

        let file = env
            .file
            .clone()
            .or_else(|| config.and_then(|c| c.log_file.clone()));

        Self {
            level,
            format,
            file,
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("newsroom={}", self.level.as_str())))
    }
}

/// Install the global subscriber. A second call is a no-op.
///
/// A log file that cannot be opened falls back to stderr with a warning.
pub fn init(settings: &LogSettings) {
    let opened = settings
        .file
        .as_ref()
        .map(|path| OpenOptions::new().create(true).append(true).open(path));
    let (file, open_error) = match opened {
        Some(Ok(file)) => (Some(file), None),
        Some(Err(error)) => (None, Some(error)),
        None => (None, None),
    };
    let writer = writer_for(file);
    let filter = settings.filter();

    let installed = match settings.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_writer(writer)
            .with_span_events(FmtSpan::CLOSE)
            .try_init(),
        LogFormat::Compact => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .with_writer(writer)
            .with_target(true)
            .try_init(),
        LogFormat::Human => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_target(false)
            .without_time()
            .try_init(),
    };

    if installed.is_ok()
        && let (Some(path), Some(error)) = (&settings.file, open_error)
    {
        tracing::warn!(path = %path.display(), error = %error, "Cannot open log file, logging to stderr");
    }
}

fn writer_for(file: Option<File>) -> BoxMakeWriter {
    match file {
        Some(file) => BoxMakeWriter::new(std::sync::Mutex::new(file)),
        None => BoxMakeWriter::new(std::io::stderr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(level: Option<&str>, format: Option<&str>) -> LogEnv {
        LogEnv {
            level: level.map(str::to_string),
            format: format.map(str::to_string),
            file: None,
        }
    }

    fn general(level: Option<&str>, format: Option<&str>) -> GeneralConfig {
        GeneralConfig {
            log_level: level.map(str::to_string),
            log_format: format.map(str::to_string),
            ..GeneralConfig::default()
        }
    }

    #[test]
    fn flag_beats_env_beats_config() {
        let config = general(Some("info"), None);
        let flags = LogFlags {
            level: Some("trace"),
            ..LogFlags::default()
        };
        assert_eq!(
            LogSettings::resolve(flags, &env(Some("warn"), None), Some(&config)).level,
            LogLevel::Trace
        );
        assert_eq!(
            LogSettings::resolve(LogFlags::default(), &env(Some("warn"), None), Some(&config)).level,
            LogLevel::Warn
        );
        assert_eq!(
            LogSettings::resolve(LogFlags::default(), &LogEnv::default(), Some(&config)).level,
            LogLevel::Info
        );
        assert_eq!(
            LogSettings::resolve(LogFlags::default(), &LogEnv::default(), None),
            LogSettings::default()
        );
    }

    #[test]
    fn verbose_only_applies_without_explicit_level() {
        let verbose = LogFlags {
            verbose: true,
            ..LogFlags::default()
        };
        let quiet_env = env(Some("error"), None);
        assert_eq!(LogSettings::resolve(verbose, &quiet_env, None).level, LogLevel::Debug);

        let both = LogFlags {
            level: Some("warn"),
            verbose: true,
            ..LogFlags::default()
        };
        assert_eq!(LogSettings::resolve(both, &quiet_env, None).level, LogLevel::Warn);
    }

    #[test]
    fn unparseable_env_falls_through_to_config() {
        let config = general(Some("debug"), Some("compact"));
        let settings = LogSettings::resolve(LogFlags::default(), &env(Some("loud"), Some("fancy")), Some(&config));
        assert_eq!(settings.level, LogLevel::Debug);
        assert_eq!(settings.format, LogFormat::Compact);
    }

    #[test]
    fn json_flag_overrides_configured_format() {
        let config = general(None, Some("compact"));
        let flags = LogFlags {
            json: true,
            ..LogFlags::default()
        };
        assert_eq!(
            LogSettings::resolve(flags, &env(None, Some("human")), Some(&config)).format,
            LogFormat::Json
        );
    }

    #[test]
    fn env_log_file_beats_config() {
        let config = GeneralConfig {
            log_file: Some(PathBuf::from("/var/log/newsroom.log")),
            ..GeneralConfig::default()
        };
        let from_env = LogEnv {
            file: Some(PathBuf::from("/tmp/override.log")),
            ..LogEnv::default()
        };
        assert_eq!(
            LogSettings::resolve(LogFlags::default(), &from_env, Some(&config)).file,
            Some(PathBuf::from("/tmp/override.log"))
        );
        assert_eq!(
            LogSettings::resolve(LogFlags::default(), &LogEnv::default(), Some(&config)).file,
            Some(PathBuf::from("/var/log/newsroom.log"))
        );
    }

    #[test]
    fn level_and_format_names() {
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("critical".parse::<LogLevel>().is_err());
        assert_eq!(" JSON ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("fancy".parse::<LogFormat>().is_err());
    }
}
