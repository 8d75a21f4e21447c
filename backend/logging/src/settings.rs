//! File-sink settings and the YAML-loadable logger configuration.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{LogError, Result};
use crate::level::Severity;

/// Default size limit of one log file (1 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Default number of files kept in the log directory.
pub const DEFAULT_MAX_FILE_COUNT: usize = 5;

/// Default base name; files on disk are `logfile.txt.0`, `logfile.txt.1`, ...
pub const DEFAULT_FILE_NAME: &str = "logfile.txt";

/// `MM-dd HH:mm:ss.SSS` in chrono strftime syntax.
pub const DEFAULT_TIME_FORMAT: &str = "%m-%d %H:%M:%S%.3f";

/// Suffix of the advisory lock marker kept beside the active file.
pub const LOCK_SUFFIX: &str = ".lck";

/// Env var that overrides the configured threshold.
pub const LEVEL_ENV_VAR: &str = "LOGFORGE_LEVEL";

/// Where and how log lines are persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerSettings {
    /// Directory holding the rotated files. Created on first use.
    pub logs_dir: PathBuf,

    /// Byte limit of one file before rotation. Zero means unbounded.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// How many files (active one included) may exist at once.
    #[serde(default = "default_max_file_count")]
    pub max_file_count: usize,

    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// chrono strftime pattern for the line timestamp.
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

fn default_max_file_size() -> u64 {
    DEFAULT_MAX_FILE_SIZE
}

fn default_max_file_count() -> usize {
    DEFAULT_MAX_FILE_COUNT
}

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}

fn default_time_format() -> String {
    DEFAULT_TIME_FORMAT.to_string()
}

impl LoggerSettings {
    pub fn new(logs_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_file_count: DEFAULT_MAX_FILE_COUNT,
            file_name: default_file_name(),
            time_format: default_time_format(),
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_max_file_count(mut self, count: usize) -> Self {
        self.max_file_count = count;
        self
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = name.into();
        self
    }

    pub fn with_time_format(mut self, format: impl Into<String>) -> Self {
        self.time_format = format.into();
        self
    }

    /// Check every field, failing on the first one that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.logs_dir.as_os_str().is_empty() {
            return Err(LogError::Config("logsDir must not be empty".to_string()));
        }
        if self.max_file_count == 0 {
            return Err(LogError::Config("maxFileCount must be >= 1".to_string()));
        }
        if self.file_name.trim().is_empty() {
            return Err(LogError::Config("fileName must not be empty".to_string()));
        }
        if self.file_name.contains(['/', '\\']) {
            return Err(LogError::Config(format!(
                "fileName '{}' must not contain a path separator",
                self.file_name
            )));
        }
        if StrftimeItems::new(&self.time_format).any(|item| matches!(item, Item::Error)) {
            return Err(LogError::Config(format!(
                "invalid timeFormat '{}'",
                self.time_format
            )));
        }
        Ok(())
    }

    /// Path of the file with rotation suffix `index` (0 is the newest).
    pub fn file_path(&self, index: usize) -> PathBuf {
        self.logs_dir.join(format!("{}.{index}", self.file_name))
    }

    pub fn lock_path(&self) -> PathBuf {
        self.logs_dir.join(format!("{}{LOCK_SUFFIX}", self.file_name))
    }

    /// Render `at` with the configured pattern. Only call on validated settings.
    pub fn format_timestamp<Tz>(&self, at: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        at.format(&self.time_format).to_string()
    }
}

/// Top-level configuration a host can keep in a YAML file.
///
/// ```yaml
/// level: info
/// console: true
/// file:
///   logsDir: /var/log/myapp
///   maxFileSize: 262144
///   maxFileCount: 3
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerConfig {
    #[serde(default)]
    pub level: Severity,

    #[serde(default = "default_console")]
    pub console: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<LoggerSettings>,
}

fn default_console() -> bool {
    true
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level: Severity::default(),
            console: true,
            file: None,
        }
    }
}

impl LoggerConfig {
    /// Override fields from the process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_env_with(&std::env::vars().collect())
    }

    /// Same as [`apply_env`](Self::apply_env) with an explicit variable map.
    pub fn apply_env_with(mut self, env: &HashMap<String, String>) -> Result<Self> {
        if let Some(raw) = env.get(LEVEL_ENV_VAR).filter(|v| !v.trim().is_empty()) {
            self.level = raw.parse()?;
            debug!(level = %self.level, "Log level taken from {LEVEL_ENV_VAR}");
        }
        Ok(self)
    }
}

/// Load a [`LoggerConfig`] from YAML.
///
/// A missing file is not an error: defaults are returned (console only).
pub fn load_config(path: &Path) -> Result<LoggerConfig> {
    if !path.exists() {
        debug!(path = %path.display(), "Logger config does not exist; using defaults");
        return Ok(LoggerConfig::default());
    }

    let raw = std::fs::read_to_string(path).map_err(|e| LogError::io("read", path, e))?;
    let config: LoggerConfig = serde_yaml::from_str(&raw).map_err(|e| {
        LogError::Config(format!("failed to parse {}: {e}", path.display()))
    })?;
    if let Some(file) = &config.file {
        file.validate()?;
    }

    info!(path = %path.display(), "Loaded logger config");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn defaults_match_documented_values() {
        let s = LoggerSettings::new("/tmp/logs");
        assert_eq!(s.max_file_size, 1024 * 1024);
        assert_eq!(s.max_file_count, 5);
        assert_eq!(s.file_name, "logfile.txt");
        assert_eq!(s.time_format, "%m-%d %H:%M:%S%.3f");
        s.validate().unwrap();
    }

    #[test]
    fn rejects_unusable_settings() {
        let base = LoggerSettings::new("/tmp/logs");
        assert!(LoggerSettings::new("").validate().is_err());
        assert!(base.clone().with_max_file_count(0).validate().is_err());
        assert!(base.clone().with_file_name("  ").validate().is_err());
        assert!(base.clone().with_file_name("a/b.txt").validate().is_err());
        assert!(base.clone().with_time_format("%Q").validate().is_err());
        assert!(base.with_max_file_size(0).validate().is_ok());
    }

    #[test]
    fn paths_use_numeric_suffixes() {
        let s = LoggerSettings::new("/logs").with_file_name("x.txt");
        assert_eq!(s.file_path(0), PathBuf::from("/logs/x.txt.0"));
        assert_eq!(s.file_path(3), PathBuf::from("/logs/x.txt.3"));
        assert_eq!(s.lock_path(), PathBuf::from("/logs/x.txt.lck"));
    }

    #[test]
    fn timestamp_is_fixed_width() {
        let s = LoggerSettings::new("/logs");
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(s.format_timestamp(&at), "03-07 09:05:02.000");
    }

    #[test]
    fn yaml_fills_in_defaults() {
        let config: LoggerConfig = serde_yaml::from_str(
            "level: warn\nfile:\n  logsDir: /data/logs\n  maxFileCount: 2\n",
        )
        .unwrap();
        assert_eq!(config.level, Severity::Warn);
        assert!(config.console);
        let file = config.file.unwrap();
        assert_eq!(file.max_file_count, 2);
        assert_eq!(file.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(file.file_name, DEFAULT_FILE_NAME);
    }

    #[test]
    fn missing_config_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("nope.yaml")).unwrap();
        assert_eq!(config, LoggerConfig::default());
    }

    #[test]
    fn invalid_file_section_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logger.yaml");
        std::fs::write(&path, "file:\n  logsDir: /x\n  maxFileCount: 0\n").unwrap();
        assert!(matches!(load_config(&path), Err(LogError::Config(_))));
    }

    #[test]
    fn env_overrides_level() {
        let env = HashMap::from([(LEVEL_ENV_VAR.to_string(), "E".to_string())]);
        let config = LoggerConfig::default().apply_env_with(&env).unwrap();
        assert_eq!(config.level, Severity::Error);

        let bad = HashMap::from([(LEVEL_ENV_VAR.to_string(), "shout".to_string())]);
        assert!(LoggerConfig::default().apply_env_with(&bad).is_err());
    }
}
