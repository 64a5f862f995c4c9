//! Shell configuration.
//!
//! Read from the file given with `--config`, else `$OCLI_CONFIG`, else
//! `./config.toml`. A missing file gives the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::interpreter::types::DEFAULT_DRAW_THRESHOLD;
use crate::network::HttpApiOptions;

pub const CONFIG_ENV: &str = "OCLI_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid debug level {0}, expected 0 to 4")]
    DebugLevel(i64),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the inventory API
    pub api_url: String,
    /// Bearer token sent with every request
    pub api_key: Option<String>,
    pub user: String,
    pub timeout_secs: u64,
    /// 0 (NONE) to 4 (DEBUG)
    pub debug_level: i64,
    /// Echo script lines before running them
    pub print_commands: bool,
    /// Objects `draw` sends without `-f`
    pub draw_limit: usize,
    /// Kept for the interactive front end
    pub history_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3001".to_string(),
            api_key: None,
            user: String::new(),
            timeout_secs: 30,
            debug_level: 1,
            print_commands: true,
            draw_limit: DEFAULT_DRAW_THRESHOLD,
            history_file: None,
        }
    }
}

impl Config {
    /// Load the configuration, `explicit` taking precedence over the
    /// environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => std::env::var_os(CONFIG_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        };
        if !path.exists() {
            tracing::debug!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if !(0..=4).contains(&config.debug_level) {
            return Err(ConfigError::DebugLevel(config.debug_level));
        }
        Ok(config)
    }

    pub fn api_options(&self) -> HttpApiOptions {
        HttpApiOptions {
            base_url: self.api_url.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(Some(&dir.path().join("none.toml"))).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api_url, "http://localhost:3001");
        assert_eq!(config.draw_limit, 50);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_url = \"http://api:8080\"\napi_key = \"secret\"\ndebug_level = 4\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.api_url, "http://api:8080");
        assert_eq!(config.api_key.as_deref(), Some("secret"));
        assert_eq!(config.debug_level, 4);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.print_commands);
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_url = ").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_invalid_debug_level() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "debug_level = 7\n").unwrap();
        let err = Config::load(Some(&path)).unwrap_err();
        assert_eq!(err.to_string(), "invalid debug level 7, expected 0 to 4");
    }

    #[test]
    fn test_api_options() {
        let config = Config {
            timeout_secs: 5,
            ..Config::default()
        };
        let options = config.api_options();
        assert_eq!(options.base_url, "http://localhost:3001");
        assert_eq!(options.timeout, Duration::from_secs(5));
    }
}
