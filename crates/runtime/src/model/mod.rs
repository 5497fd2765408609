//! Conversation turns, model decisions, and the gateway trait.

pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::{
    Decision, Gateway, ModelRequest, ToolCallRequest, ToolChoice, ToolDescriptor, Turn,
    arguments_from_value, replayable_turns,
};
