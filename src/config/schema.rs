use crate::engine::EngineKind;
use crate::error::ConfigError;
use crate::poller::PollPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapiConfig {
    /// Path to config.toml - computed at load time, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,
    /// Backend tag, e.g. `dummy` or `DataTrails`
    #[serde(default = "default_engine")]
    pub engine: String,

    #[serde(default)]
    pub connection: EngineArgs,

    #[serde(default)]
    pub poll: PollConfig,
}

fn default_engine() -> String {
    "dummy".into()
}

impl Default for ScrapiConfig {
    fn default() -> Self {
        Self {
            config_path: PathBuf::new(),
            engine: default_engine(),
            connection: EngineArgs::default(),
            poll: PollConfig::default(),
        }
    }
}

impl ScrapiConfig {
    pub fn engine_kind(&self) -> Result<EngineKind, ConfigError> {
        self.engine.parse()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let kind = self.engine_kind()?;
        if kind.requires_credentials() {
            self.connection.validate()?;
        }
        self.poll.policy()?;
        Ok(())
    }
}

/// Construction parameters handed to an engine. Opaque to the façade.
#[derive(Clone, Serialize, Deserialize)]
pub struct EngineArgs {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "INFO".into()
}

impl Default for EngineArgs {
    fn default() -> Self {
        Self {
            url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            log_level: default_log_level(),
        }
    }
}

impl EngineArgs {
    pub fn new(url: &str, client_id: &str, client_secret: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            log_level: default_log_level(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingField("url"));
        }
        url::Url::parse(&self.url)
            .map_err(|e| ConfigError::Load(format!("invalid url '{}': {e}", self.url)))?;
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::MissingField("client_id"));
        }
        if self.client_secret.trim().is_empty() {
            return Err(ConfigError::MissingField("client_secret"));
        }
        Ok(())
    }
}

impl fmt::Debug for EngineArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secret = if self.client_secret.is_empty() {
            ""
        } else {
            "[REDACTED]"
        };
        f.debug_struct("EngineArgs")
            .field("url", &self.url)
            .field("client_id", &self.client_id)
            .field("client_secret", &secret)
            .field("log_level", &self.log_level)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_interval_ms() -> u64 {
    2_000
}

#[allow(clippy::unnecessary_wraps)]
fn default_max_attempts() -> Option<u32> {
    Some(150)
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
            timeout_secs: None,
        }
    }
}

impl PollConfig {
    pub fn policy(&self) -> Result<PollPolicy, ConfigError> {
        PollPolicy::new(
            Duration::from_millis(self.interval_ms),
            self.max_attempts,
            self.timeout_secs.map(Duration::from_secs),
        )
    }
}
