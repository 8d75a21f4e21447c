use std::path::PathBuf;

/// Default logger config file, looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "logforge.yaml";

/// Settings the CLI itself reads before any logger exists.
#[derive(Debug, Clone)]
pub struct Config {
    /// YAML logger config to load
    pub config_path: PathBuf,
    /// `tracing` filter for the console output. Console lines are already
    /// filtered by the logger's own level, so their target is let through.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_FILE),
            log_filter: "info,logforge::console=trace".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            config_path: std::env::var("LOGFORGE_CONFIG")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_path),
            log_filter: std::env::var("RUST_LOG").unwrap_or(defaults.log_filter),
        }
    }
}
