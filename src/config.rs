//! Client configuration.
//!
//! Priority, highest first:
//! 1. CLI flags (and their `TASKAPP_*` environment variables, via clap)
//! 2. TOML file (`~/.config/taskapp/config.toml`, or `TASKAPP_CONFIG`)
//! 3. Compiled defaults
//!
//! A missing default config file is not an error. An explicit path that does
//! not exist is.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::selectors::UPCOMING_DAYS;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    server: ServerFileConfig,
    cache: CacheFileConfig,
    log: LogFileConfig,
    view: ViewFileConfig,
}

/// `[server]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

/// `[cache]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CacheFileConfig {
    stale_secs: Option<u64>,
}

/// `[log]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LogFileConfig {
    level: Option<String>,
}

/// `[view]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViewFileConfig {
    upcoming_days: Option<i64>,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Backend origin, e.g. `http://localhost:8080`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Age after which cached query results are refetched.
    pub stale_after: Duration,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Horizon of the upcoming view, in days.
    pub upcoming_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(10),
            stale_after: Duration::from_secs(60),
            log_level: "warn".to_string(),
            upcoming_days: UPCOMING_DAYS,
        }
    }
}

impl Config {
    /// Loads the config file (explicit path, `TASKAPP_CONFIG`, or the default
    /// location) and layers it over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit config file cannot be read or
    /// any config file cannot be parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("TASKAPP_CONFIG").map(PathBuf::from));

        let file = match explicit {
            Some(path) => read_config_file(&path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => read_config_file(&path)?,
                _ => ConfigFile::default(),
            },
        };
        Ok(Self::from_file(file))
    }

    /// Parses TOML text directly.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(text)?;
        Ok(Self::from_file(file))
    }

    fn from_file(file: ConfigFile) -> Self {
        let d = Self::default();
        Self {
            base_url: file.server.base_url.unwrap_or(d.base_url),
            timeout: file.server.timeout_secs.map(Duration::from_secs).unwrap_or(d.timeout),
            stale_after: file.cache.stale_secs.map(Duration::from_secs).unwrap_or(d.stale_after),
            log_level: file.log.level.unwrap_or(d.log_level),
            upcoming_days: file.view.upcoming_days.filter(|n| *n > 0).unwrap_or(d.upcoming_days),
        }
    }

    /// Applies a `--server` override.
    #[must_use]
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url {
            self.base_url = url;
        }
        self
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&text)?)
}

/// `~/.config/taskapp/config.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("taskapp").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = Config::from_toml("[server]\nbase_url = \"https://tasks.example\"\n").unwrap();
        assert_eq!(cfg.base_url, "https://tasks.example");
        assert_eq!(cfg.timeout, Duration::from_secs(10));
        assert_eq!(cfg.upcoming_days, 14);
    }

    #[test]
    fn all_sections() {
        let text = r#"
            [server]
            timeout_secs = 3
            [cache]
            stale_secs = 120
            [log]
            level = "debug"
            [view]
            upcoming_days = 7
        "#;
        let cfg = Config::from_toml(text).unwrap();
        assert_eq!(cfg.timeout, Duration::from_secs(3));
        assert_eq!(cfg.stale_after, Duration::from_secs(120));
        assert_eq!(cfg.log_level, "debug");
        assert_eq!(cfg.upcoming_days, 7);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(matches!(Config::from_toml("[server"), Err(ConfigError::ParseToml(_))));
    }

    #[test]
    fn cli_override_wins() {
        let cfg = Config::default().with_base_url(Some("http://other:9000".into()));
        assert_eq!(cfg.base_url, "http://other:9000");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = Config::load(Some(Path::new("/nonexistent/taskapp.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
