//! Runtime configuration shared by the CLI and HTTP entry points.
//!
//! Values come from `TASKMATCH_*` environment variables; binaries apply
//! their own flag overrides on top.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "TASKMATCH_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "TASKMATCH_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TASKMATCH_LOG_DIR";
pub const ENV_BIND_ADDR: &str = "TASKMATCH_BIND_ADDR";

pub const DEFAULT_DB_PATH: &str = "taskmatch.sqlite3";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub message: String,
}

impl ConfigError {
    fn new(key: &'static str, message: impl Into<String>) -> Self {
        Self {
            key,
            message: message.into(),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}: {}", self.key, self.message)
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_level: &'static str,
    /// Absolute log directory; `None` logs to stderr.
    pub log_dir: Option<PathBuf>,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut config = Self::default();
        if let Some(path) = read(ENV_DB_PATH) {
            config = config.with_db_path(&path)?;
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config = config.with_log_level(&level)?;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config = config.with_log_dir(&dir)?;
        }
        if let Some(addr) = read(ENV_BIND_ADDR) {
            config = config.with_bind_addr(&addr)?;
        }
        Ok(config)
    }

    pub fn with_db_path(mut self, path: &str) -> Result<Self, ConfigError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::new(ENV_DB_PATH, "database path cannot be empty"));
        }
        self.db_path = PathBuf::from(trimmed);
        Ok(self)
    }

    pub fn with_log_level(mut self, level: &str) -> Result<Self, ConfigError> {
        self.log_level =
            normalize_level(level).map_err(|message| ConfigError::new(ENV_LOG_LEVEL, message))?;
        Ok(self)
    }

    pub fn with_log_dir(mut self, dir: &str) -> Result<Self, ConfigError> {
        self.log_dir =
            Some(normalize_log_dir(dir).map_err(|message| ConfigError::new(ENV_LOG_DIR, message))?);
        Ok(self)
    }

    pub fn with_bind_addr(mut self, addr: &str) -> Result<Self, ConfigError> {
        self.bind_addr = addr.trim().parse().map_err(|err| {
            ConfigError::new(ENV_BIND_ADDR, format!("`{}`: {err}", addr.trim()))
        })?;
        Ok(self)
    }

    /// Log directory as the string form `init_logging` takes.
    pub fn log_dir_str(&self) -> Option<String> {
        self.log_dir
            .as_ref()
            .map(|dir| dir.to_string_lossy().into_owned())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            log_level: default_log_level(),
            log_dir: None,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
        }
    }
}
