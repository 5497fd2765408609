//! Touchline runtime: the reasoning-action loop and its boundaries.
//!
//! This crate runs one exchange at a time: a user message goes in, the model
//! alternates between thinking and calling tools, and a final answer (or a
//! structured abort) comes out. Every turn the exchange produced is then
//! appended to the session transcript.
//!
//! # Overview
//!
//! The runtime is organized around these concepts:
//!
//! - **Gateway**: A trait abstracting LLM providers (Anthropic, OpenAI).
//! - **ToolRegistry**: An immutable catalogue of named tools with argument
//!   schemas, shared across exchanges.
//! - **ToolInvoker**: Validates and runs tool calls, each under its own
//!   timeout, turning every failure into a result the model can read.
//! - **Agent**: Drives the loop for a session and persists its turns.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{Agent, AnthropicBackend, ToolRegistry};
//! use storage::{SessionKey, TranscriptStore};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> runtime::Result<()> {
//! let backend = AnthropicBackend::builder("sk-ant-api01-...", "claude-sonnet-4-20250514").build();
//! let registry = Arc::new(ToolRegistry::new());
//! let store = Arc::new(TranscriptStore::in_memory()?);
//!
//! let agent = Agent::new(backend, registry, store);
//! let session = SessionKey::from("alice");
//! let result = agent
//!     .run_exchange(&session, "Who should I captain?", &CancellationToken::new())
//!     .await?;
//! println!("{:?}", result.outcome);
//! # Ok(())
//! # }
//! ```

mod agent;
mod conversation;
mod error;
pub mod model;
mod orchestrator;
pub mod providers;
pub mod tools;
mod transcript;

// Exchange driver
pub use agent::{Agent, LoopResult};
pub use conversation::ConversationState;
pub use orchestrator::{AbortReason, LoopConfig, Outcome};

// Model boundary
pub use model::{
    Decision, Gateway, ModelError, ModelRequest, ToolCallRequest, ToolChoice, ToolDescriptor,
    Turn,
};

// Providers
pub use providers::{AnthropicBackend, OpenAiBackend, Provider, ProviderKind};

// Tools
pub use tools::{
    BoxError, InputSchema, Param, ParamType, RegistryError, ToolArguments, ToolCallResult,
    ToolError, ToolErrorKind, ToolHandler, ToolInvoker, ToolOutcome, ToolRegistry, ToolSpec,
};

// Persistence boundary
pub use transcript::Transcripts;

// Error types
pub use error::{Error, Result};
