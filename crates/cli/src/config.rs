//! Configuration loading from touchline.toml.

use runtime::{LoopConfig, ProviderKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub fpl: FplConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

/// Backend provider configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Provider name: "anthropic" or "openai".
    pub provider: String,

    /// Model to use.
    pub model: String,

    /// API key. Falls back to the provider's environment variable.
    pub api_key: Option<String>,

    /// Upper bound on tokens per model response.
    pub max_tokens: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key: None,
            max_tokens: 4096,
        }
    }
}

/// Loop limits.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub max_steps: u32,
    pub tool_timeout_secs: u64,
    pub retry_backoff_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let defaults = LoopConfig::default();
        Self {
            max_steps: defaults.max_steps,
            tool_timeout_secs: defaults.tool_timeout.as_secs(),
            retry_backoff_ms: defaults.retry_backoff.as_millis() as u64,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FplConfig {
    /// Manager team id for the "my team" tools. Falls back to FPL_TEAM_ID.
    pub team_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Transcript database. Defaults to the user data directory.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load from `path` if it exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.agent.max_steps == 0 {
            return Err(ConfigError::Invalid("agent.max_steps must be at least 1".into()));
        }
        if self.agent.tool_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "agent.tool_timeout_secs must be at least 1".into(),
            ));
        }
        if self.backend.max_tokens == 0 {
            return Err(ConfigError::Invalid("backend.max_tokens must be at least 1".into()));
        }
        self.provider()?;
        Ok(())
    }

    pub fn provider(&self) -> Result<ProviderKind, ConfigError> {
        self.backend
            .provider
            .parse()
            .map_err(|e: runtime::Error| ConfigError::Invalid(e.to_string()))
    }

    /// The API key from the file, else from the provider's environment
    /// variable as returned by `env`.
    pub fn api_key(&self, env: impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
        let provider = self.provider()?;
        self.backend
            .api_key
            .clone()
            .or_else(|| env(provider.api_key_env()))
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey {
                env: provider.api_key_env(),
            })
    }

    /// The FPL team id from the file, else from `FPL_TEAM_ID`.
    pub fn team_id(&self, env: impl Fn(&str) -> Option<String>) -> Result<Option<u64>, ConfigError> {
        if let Some(id) = self.fpl.team_id {
            return Ok(Some(id));
        }
        match env("FPL_TEAM_ID") {
            Some(raw) if !raw.trim().is_empty() => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::Invalid(format!("FPL_TEAM_ID is not a number: {raw}"))),
            _ => Ok(None),
        }
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            max_steps: self.agent.max_steps,
            tool_timeout: Duration::from_secs(self.agent.tool_timeout_secs),
            retry_backoff: Duration::from_millis(self.agent.retry_backoff_ms),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("API key not configured: set backend.api_key or {env}")]
    MissingApiKey { env: &'static str },
}
