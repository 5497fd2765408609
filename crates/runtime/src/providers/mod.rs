//! LLM provider adapters.
//!
//! Each provider implements [`Gateway`] for its specific API.

mod anthropic;
mod openai;

pub use anthropic::{AnthropicBackend, AnthropicBackendBuilder};
pub use openai::{OpenAiBackend, OpenAiBackendBuilder};

use crate::model::{Decision, Gateway, ModelError, ModelRequest};
use crate::{Error, Result};
use std::str::FromStr;

/// Which provider API to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProviderKind {
    #[default]
    Anthropic,
    OpenAi,
}

impl ProviderKind {
    /// Environment variable holding this provider's API key.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::OpenAi => "OPENAI_API_KEY",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "anthropic" => Ok(Self::Anthropic),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::Config(format!(
                "unknown provider '{other}' (expected 'anthropic' or 'openai')"
            ))),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic => write!(f, "anthropic"),
            Self::OpenAi => write!(f, "openai"),
        }
    }
}

/// A provider chosen at runtime.
pub enum Provider {
    Anthropic(AnthropicBackend),
    OpenAi(OpenAiBackend),
}

impl Provider {
    pub fn new(
        kind: ProviderKind,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        system: impl Into<String>,
    ) -> Self {
        match kind {
            ProviderKind::Anthropic => Self::Anthropic(
                AnthropicBackend::builder(api_key, model)
                    .max_tokens(max_tokens)
                    .system(system)
                    .build(),
            ),
            ProviderKind::OpenAi => Self::OpenAi(
                OpenAiBackend::builder(api_key, model)
                    .max_tokens(max_tokens)
                    .system(system)
                    .build(),
            ),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anthropic(backend) => backend.fmt(f),
            Self::OpenAi(backend) => backend.fmt(f),
        }
    }
}

impl Gateway for Provider {
    async fn decide(&self, request: ModelRequest<'_>) -> std::result::Result<Decision, ModelError> {
        match self {
            Self::Anthropic(backend) => backend.decide(request).await,
            Self::OpenAi(backend) => backend.decide(request).await,
        }
    }
}
