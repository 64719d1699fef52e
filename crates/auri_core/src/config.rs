//! Core configuration.
//!
//! # Responsibility
//! - Describe everything the core needs at startup in one serde struct.
//! - Load it from a JSON file and apply `AURI_*` environment overrides.
//!
//! # Invariants
//! - A validated config has a non-zero memory cap and message limit.
//! - Remote mirroring is disabled when `remote` is absent.

use crate::chat::usage_meter::DEFAULT_DAILY_MESSAGE_LIMIT;
use crate::model::memory_note::DEFAULT_MEMORY_CAPACITY;
use crate::sync::mirror::MirrorPolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const ENV_REMOTE_URL: &str = "AURI_REMOTE_URL";
pub const ENV_REMOTE_API_KEY: &str = "AURI_REMOTE_API_KEY";
pub const ENV_LOG_LEVEL: &str = "AURI_LOG_LEVEL";
pub const ENV_MEMORY_CAP: &str = "AURI_MEMORY_CAP";
pub const ENV_DAILY_MESSAGE_LIMIT: &str = "AURI_DAILY_MESSAGE_LIMIT";

const DEFAULT_DB_FILE_NAME: &str = "auri.sqlite3";
const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_OUTBOX_DRAIN_SECS: u64 = 60;

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, message: String },
    Parse(String),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, message } => {
                write!(f, "failed to read config `{}`: {message}", path.display())
            }
            Self::Parse(message) => write!(f, "invalid config json: {message}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {}

/// Remote backend-as-a-service endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    /// Public (anon) project key sent as `apikey`.
    pub api_key: String,
    #[serde(default = "default_remote_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub memory_capacity: usize,
    pub daily_message_limit: u32,
    pub mirror_policy: MirrorPolicy,
    pub outbox_drain_secs: u64,
    pub remote: Option<RemoteConfig>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: crate::logging::default_log_level().to_string(),
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            daily_message_limit: DEFAULT_DAILY_MESSAGE_LIMIT,
            mirror_policy: MirrorPolicy::OneShot,
            outbox_drain_secs: DEFAULT_OUTBOX_DRAIN_SECS,
            remote: None,
        }
    }
}

impl CoreConfig {
    /// Parses a JSON document; missing fields take defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON file, then applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        let mut config = Self::from_json_str(&raw)?;
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Applies `AURI_*` overrides using `lookup` to read variables.
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(level) = read(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(cap) = read(ENV_MEMORY_CAP) {
            self.memory_capacity = parse_env(ENV_MEMORY_CAP, &cap)?;
        }
        if let Some(limit) = read(ENV_DAILY_MESSAGE_LIMIT) {
            self.daily_message_limit = parse_env(ENV_DAILY_MESSAGE_LIMIT, &limit)?;
        }

        match (read(ENV_REMOTE_URL), read(ENV_REMOTE_API_KEY)) {
            (Some(base_url), Some(api_key)) => {
                let timeout_secs = self
                    .remote
                    .as_ref()
                    .map_or(DEFAULT_REMOTE_TIMEOUT_SECS, |remote| remote.timeout_secs);
                self.remote = Some(RemoteConfig {
                    base_url,
                    api_key,
                    timeout_secs,
                });
            }
            (Some(base_url), None) => match self.remote.as_mut() {
                Some(remote) => remote.base_url = base_url,
                None => {
                    return Err(ConfigError::Invalid(format!(
                        "{ENV_REMOTE_URL} is set but {ENV_REMOTE_API_KEY} is missing"
                    )))
                }
            },
            (None, Some(api_key)) => {
                if let Some(remote) = self.remote.as_mut() {
                    remote.api_key = api_key;
                }
            }
            (None, None) => {}
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.memory_capacity == 0 {
            return Err(ConfigError::Invalid(
                "memory_capacity must be at least 1".to_string(),
            ));
        }
        if self.daily_message_limit == 0 {
            return Err(ConfigError::Invalid(
                "daily_message_limit must be at least 1".to_string(),
            ));
        }
        if self.outbox_drain_secs == 0 {
            return Err(ConfigError::Invalid(
                "outbox_drain_secs must be at least 1".to_string(),
            ));
        }
        if let Some(remote) = &self.remote {
            if remote.base_url.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "remote.base_url cannot be empty".to_string(),
                ));
            }
            if remote.timeout_secs == 0 {
                return Err(ConfigError::Invalid(
                    "remote.timeout_secs must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{name} has invalid value `{value}`")))
}

fn default_remote_timeout_secs() -> u64 {
    DEFAULT_REMOTE_TIMEOUT_SECS
}
