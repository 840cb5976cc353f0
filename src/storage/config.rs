//! Configuration file loading and management.
//!
//! Loads configuration from:
//! - Linux: `~/.config/newsroom/config.toml`
//! - macOS: `~/Library/Application Support/dev.newsroom.newsroom/config.toml`
//! - Windows: `%APPDATA%/newsroom/newsroom/config/config.toml`
//!
//! ## Precedence
//!
//! Settings are resolved with the following precedence (highest first):
//! 1. CLI flags
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `NEWSROOM_CONFIG`: Override config file path
//! - `NEWSROOM_TIMEOUT`: Per-attempt timeout in seconds
//! - `NEWSROOM_DB`: Path of the local store database
//! - `NEWSROOM_AUTHOR_ID`: Author recorded on published articles
//!
//! Provider keys are never read from this file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::core::logging::{LogFormat, LogLevel};
use crate::core::provider::{GEMINI_BETA_BASE, GEMINI_STABLE_BASE, Provider};
use crate::core::resolver::DEFAULT_GEMINI_MODELS;
use crate::error::{NewsroomError, Result};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "NEWSROOM_CONFIG";
/// Environment variable for the per-attempt timeout in seconds.
pub const ENV_TIMEOUT: &str = "NEWSROOM_TIMEOUT";
/// Environment variable for the local store database path.
pub const ENV_DB: &str = "NEWSROOM_DB";
/// Environment variable for the fallback article author.
pub const ENV_AUTHOR_ID: &str = "NEWSROOM_AUTHOR_ID";

/// Bounds for `general.timeout_seconds`.
const TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=300;

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Values supplied on the command line that override everything else.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub timeout_seconds: Option<u64>,
    pub db_path: Option<PathBuf>,
    pub author_id: Option<String>,
}

/// Fully resolved configuration after merging CLI, env vars, and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Merged file configuration, with resolved values written back.
    pub config: Config,
    /// Per-attempt timeout.
    pub timeout: Duration,
    /// Local store database path.
    pub db_path: PathBuf,
    /// Fallback article author.
    pub author_id: Option<String>,
    /// Source of each setting for debugging.
    pub sources: ConfigSources,
}

/// Tracks the source of each configuration value.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    pub timeout: ConfigSource,
    pub db_path: ConfigSource,
    pub author_id: ConfigSource,
}

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

impl ResolvedConfig {
    /// Resolve final configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but is invalid, or if a
    /// resolved value is out of bounds.
    pub fn resolve(overrides: &CliOverrides) -> Result<Self> {
        let config = Self::load_config()?;
        Self::resolve_with(config, overrides)
    }

    /// Resolve against an already loaded config.
    ///
    /// # Errors
    ///
    /// Returns an error if a resolved value is out of bounds.
    pub fn resolve_with(mut config: Config, overrides: &CliOverrides) -> Result<Self> {
        config.validate()?;

        let mut sources = ConfigSources::default();
        let timeout_seconds = Self::resolve_timeout(overrides, &config, &mut sources.timeout);
        if !TIMEOUT_RANGE.contains(&timeout_seconds) {
            return Err(NewsroomError::Config(
                "Timeout must be between 1 and 300 seconds".to_string(),
            ));
        }
        config.general.timeout_seconds = timeout_seconds;

        let db_path = Self::resolve_db_path(overrides, &config, &mut sources.db_path);
        let author_id = Self::resolve_author_id(overrides, &config, &mut sources.author_id);

        Ok(Self {
            config,
            timeout: Duration::from_secs(timeout_seconds),
            db_path,
            author_id,
            sources,
        })
    }

    /// Load config file, respecting the `NEWSROOM_CONFIG` override.
    fn load_config() -> Result<Config> {
        match non_empty_env(ENV_CONFIG) {
            Some(path) => Config::load_from(Path::new(&path)),
            None => Config::load(),
        }
    }

    fn resolve_timeout(overrides: &CliOverrides, config: &Config, source: &mut ConfigSource) -> u64 {
        if let Some(timeout) = overrides.timeout_seconds {
            *source = ConfigSource::Cli;
            return timeout;
        }

        if let Some(timeout) = non_empty_env(ENV_TIMEOUT).and_then(|v| v.parse::<u64>().ok()) {
            *source = ConfigSource::Env;
            return timeout;
        }

        *source = ConfigSource::ConfigFile;
        config.general.timeout_seconds
    }

    fn resolve_db_path(overrides: &CliOverrides, config: &Config, source: &mut ConfigSource) -> PathBuf {
        if let Some(path) = &overrides.db_path {
            *source = ConfigSource::Cli;
            return path.clone();
        }

        if let Some(path) = non_empty_env(ENV_DB) {
            *source = ConfigSource::Env;
            return PathBuf::from(path);
        }

        if let Some(path) = &config.store.path {
            *source = ConfigSource::ConfigFile;
            return path.clone();
        }

        *source = ConfigSource::Default;
        AppPaths::new().store_db_file()
    }

    fn resolve_author_id(
        overrides: &CliOverrides,
        config: &Config,
        source: &mut ConfigSource,
    ) -> Option<String> {
        if let Some(author) = overrides.author_id.as_deref().filter(|a| !a.trim().is_empty()) {
            *source = ConfigSource::Cli;
            return Some(author.to_string());
        }

        if let Some(author) = non_empty_env(ENV_AUTHOR_ID) {
            *source = ConfigSource::Env;
            return Some(author);
        }

        *source = if config.store.author_id.is_some() {
            ConfigSource::ConfigFile
        } else {
            ConfigSource::Default
        };
        config.store.author_id.clone()
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// =============================================================================
// File Configuration
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub gemini: GeminiConfig,
    pub security: SecurityConfig,
    pub server: ServerConfig,
    pub scheduler: SchedulerConfig,
    pub store: StoreConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Per-attempt timeout for provider requests in seconds.
    pub timeout_seconds: u64,
    /// Default log level (error, warn, info, debug, trace).
    pub log_level: Option<String>,
    /// Default log format (human, json, compact).
    pub log_format: Option<String>,
    /// Append logs to this file instead of stderr.
    pub log_file: Option<PathBuf>,
}

/// Gemini routing candidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Base URLs tried for every (key, model) pair, in order.
    pub base_urls: Vec<String>,
    /// Default model candidates, in order.
    pub models: Vec<String>,
    /// Model used for the agent image stage.
    pub image_model: String,
    /// Model used for search-augmented research.
    pub research_model: Option<String>,
}

/// Outbound allow-list additions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Hosts allowed in addition to the built-in provider hosts.
    pub extra_allowed_hosts: Vec<String>,
}

/// Inbound HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Longest accepted interval between scheduler passes: one week.
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Agent scheduler loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Minutes between scheduler passes in `watch`.
    pub interval_minutes: u64,
    /// Minutes after which an unreleased claim is considered stale.
    pub claim_ttl_minutes: i64,
}

/// Local data store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub path: Option<PathBuf>,
    pub author_id: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            log_level: None,
            log_format: None,
            log_file: None,
        }
    }
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_urls: vec![GEMINI_STABLE_BASE.to_string(), GEMINI_BETA_BASE.to_string()],
            models: DEFAULT_GEMINI_MODELS.iter().map(|m| (*m).to_string()).collect(),
            image_model: "gemini-2.5-flash-image".to_string(),
            research_model: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 15,
            claim_ttl_minutes: 30,
        }
    }
}

impl Config {
    /// Load configuration from the default config file path.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error only if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error only if the file exists but is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| NewsroomError::Config(format!("Invalid config file: {e}")))
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| NewsroomError::Config(format!("Failed to serialize config: {e}")))?;

        fs::write(path, content)?;
        tracing::debug!(?path, "Config file saved");
        Ok(())
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        AppPaths::new().config_file()
    }

    /// Validate configuration values.
    ///
    /// Checks that:
    /// - Timeout is within 1-300 seconds
    /// - Gemini base URLs parse and point at an allow-listed host
    /// - Scheduler interval is within `1..=MAX_INTERVAL_MINUTES` and claim TTL is positive
    /// - Log level and log format, if set, are known
    pub fn validate(&self) -> Result<()> {
        if !TIMEOUT_RANGE.contains(&self.general.timeout_seconds) {
            return Err(NewsroomError::Config(
                "Timeout must be between 1 and 300 seconds".to_string(),
            ));
        }

        if let Some(level) = &self.general.log_level {
            level.parse::<LogLevel>()?;
        }
        if let Some(format) = &self.general.log_format {
            format.parse::<LogFormat>()?;
        }

        let guard = crate::core::guard::EndpointGuard::new()
            .with_extra_hosts(&self.security.extra_allowed_hosts);
        for base in &self.gemini.base_urls {
            if !guard.is_authorized_endpoint(base, Provider::Gemini) {
                return Err(NewsroomError::Config(format!(
                    "Gemini base URL \"{base}\" is not an allowed endpoint"
                )));
            }
        }

        if self.gemini.models.iter().any(|m| m.trim().is_empty()) {
            return Err(NewsroomError::Config(
                "Gemini model names must not be empty".to_string(),
            ));
        }

        if !(1..=MAX_INTERVAL_MINUTES).contains(&self.scheduler.interval_minutes) {
            return Err(NewsroomError::Config(format!(
                "Scheduler interval must be between 1 and {MAX_INTERVAL_MINUTES} minutes"
            )));
        }

        if self.scheduler.claim_ttl_minutes <= 0 {
            return Err(NewsroomError::Config(
                "Claim TTL must be at least 1 minute".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    #[allow(unsafe_code)]
    fn with_env_vars(vars: &[(&str, Option<&str>)], f: impl FnOnce()) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let prior: Vec<_> = vars
            .iter()
            .map(|(k, _)| (*k, std::env::var(k).ok()))
            .collect();
        for (key, value) in vars {
            match value {
                Some(v) => unsafe { std::env::set_var(key, v) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
        f();
        for (key, value) in prior {
            match value {
                Some(v) => unsafe { std::env::set_var(key, v) },
                None => unsafe { std::env::remove_var(key) },
            }
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.general.timeout_seconds, 30);
        assert_eq!(config.gemini.base_urls.len(), 2);
        assert_eq!(config.scheduler.claim_ttl_minutes, 30);
        config.validate().unwrap();
    }

    #[test]
    fn load_missing_file_returns_default() {
        let config = Config::load_from(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.general.timeout_seconds, 30);
    }

    #[test]
    fn load_valid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[general]
timeout_seconds = 45

[gemini]
models = ["gemini-2.5-pro"]
research_model = "gemini-2.5-flash"

[security]
extra_allowed_hosts = ["llm.internal.example"]

[server]
port = 9000

[store]
author_id = "editor-1"
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.general.timeout_seconds, 45);
        assert_eq!(config.gemini.models, vec!["gemini-2.5-pro".to_string()]);
        assert_eq!(config.gemini.base_urls.len(), 2, "unset keys keep defaults");
        assert_eq!(config.security.extra_allowed_hosts.len(), 1);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.store.author_id.as_deref(), Some("editor-1"));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn roundtrip_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");

        let mut config = Config::default();
        config.general.timeout_seconds = 120;
        config.scheduler.interval_minutes = 5;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.general.timeout_seconds, 120);
        assert_eq!(loaded.scheduler.interval_minutes, 5);
    }

    #[test]
    fn validate_timeout_bounds() {
        let mut config = Config::default();
        config.general.timeout_seconds = 0;
        assert!(config.validate().is_err());
        config.general.timeout_seconds = 301;
        assert!(config.validate().is_err());
        config.general.timeout_seconds = 300;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unlisted_gemini_base() {
        let mut config = Config::default();
        config.gemini.base_urls = vec!["http://127.0.0.1:9999/v1".to_string()];
        assert!(config.validate().is_err());

        config.security.extra_allowed_hosts = vec!["127.0.0.1".to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unknown_log_level() {
        let mut config = Config::default();
        config.general.log_level = Some("loud".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_bounds_scheduler_interval() {
        let mut config = Config::default();
        config.scheduler.interval_minutes = MAX_INTERVAL_MINUTES;
        assert!(config.validate().is_ok());
        for minutes in [0, MAX_INTERVAL_MINUTES + 1, u64::MAX] {
            config.scheduler.interval_minutes = minutes;
            assert!(config.validate().is_err(), "{minutes}");
        }
    }

    #[test]
    fn validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.general.log_format = Some("xml".to_string());
        assert!(config.validate().is_err());
        config.general.log_format = Some("compact".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn log_settings_parse_from_toml() {
        let config: Config = toml::from_str(
            "[general]\nlog_level = \"info\"\nlog_format = \"json\"\nlog_file = \"/tmp/newsroom.log\"\n",
        )
        .unwrap();
        assert_eq!(config.general.log_format.as_deref(), Some("json"));
        assert_eq!(config.general.log_file, Some(PathBuf::from("/tmp/newsroom.log")));
    }

    #[test]
    fn cli_beats_env_beats_file() {
        with_env_vars(
            &[(ENV_TIMEOUT, Some("60")), (ENV_AUTHOR_ID, Some("env-author"))],
            || {
                let overrides = CliOverrides {
                    timeout_seconds: Some(10),
                    ..CliOverrides::default()
                };
                let resolved = ResolvedConfig::resolve_with(Config::default(), &overrides).unwrap();
                assert_eq!(resolved.timeout, Duration::from_secs(10));
                assert_eq!(resolved.sources.timeout, ConfigSource::Cli);
                assert_eq!(resolved.author_id.as_deref(), Some("env-author"));
                assert_eq!(resolved.sources.author_id, ConfigSource::Env);

                let resolved =
                    ResolvedConfig::resolve_with(Config::default(), &CliOverrides::default()).unwrap();
                assert_eq!(resolved.timeout, Duration::from_secs(60));
                assert_eq!(resolved.sources.timeout, ConfigSource::Env);
            },
        );
    }

    #[test]
    fn file_values_apply_without_env() {
        with_env_vars(
            &[(ENV_TIMEOUT, None), (ENV_DB, None), (ENV_AUTHOR_ID, None)],
            || {
                let mut config = Config::default();
                config.store.path = Some(PathBuf::from("/srv/newsroom.sqlite"));
                config.store.author_id = Some("file-author".to_string());
                let resolved = ResolvedConfig::resolve_with(config, &CliOverrides::default()).unwrap();
                assert_eq!(resolved.db_path, PathBuf::from("/srv/newsroom.sqlite"));
                assert_eq!(resolved.sources.db_path, ConfigSource::ConfigFile);
                assert_eq!(resolved.author_id.as_deref(), Some("file-author"));
                assert_eq!(resolved.sources.timeout, ConfigSource::ConfigFile);
            },
        );
    }

    #[test]
    fn out_of_range_cli_timeout_is_rejected() {
        let overrides = CliOverrides {
            timeout_seconds: Some(0),
            ..CliOverrides::default()
        };
        assert!(ResolvedConfig::resolve_with(Config::default(), &overrides).is_err());
    }

    #[test]
    fn config_env_override_is_honored() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[general]\ntimeout_seconds = 77").unwrap();
        let path = file.path().to_string_lossy().to_string();
        with_env_vars(&[(ENV_CONFIG, Some(path.as_str())), (ENV_TIMEOUT, None)], || {
            let resolved = ResolvedConfig::resolve(&CliOverrides::default()).unwrap();
            assert_eq!(resolved.timeout, Duration::from_secs(77));
        });
    }

    #[test]
    fn config_source_display() {
        assert_eq!(ConfigSource::Cli.to_string(), "CLI flag");
        assert_eq!(ConfigSource::Default.to_string(), "default");
    }
}
