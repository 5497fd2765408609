use super::errors::ModelError;
use crate::tools::ToolCallResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::future::Future;
use tracing::debug;

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Unique within one exchange; correlates the call with its result.
    pub call_id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCallRequest {
    pub fn new(
        call_id: impl Into<String>,
        tool_name: impl Into<String>,
        arguments: Map<String, Value>,
    ) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// One entry in a conversation transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Turn {
    User {
        text: String,
    },
    Assistant {
        text: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        calls: Vec<ToolCallRequest>,
    },
    Tool(ToolCallResult),
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    /// A final (or intermediate) assistant message with no tool calls.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::Assistant {
            text: text.into(),
            calls: Vec::new(),
        }
    }

    /// An assistant turn that only requests tools.
    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self::Assistant {
            text: String::new(),
            calls,
        }
    }

    /// Name used when the turn is persisted.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::User { .. } => "user",
            Self::Assistant { .. } => "assistant",
            Self::Tool(_) => "tool",
        }
    }

    /// Text content, if this turn carries any.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::User { text } | Self::Assistant { text, .. } => Some(text),
            Self::Tool(_) => None,
        }
    }
}

/// What the model wants to do next.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// A final answer for the user.
    Answer(String),
    /// A batch of tool calls to run before asking again.
    CallTools(Vec<ToolCallRequest>),
}

impl Decision {
    /// Reject malformed decisions.
    ///
    /// A tool batch must be non-empty, and every call needs a non-blank id
    /// that is unique within the batch plus a non-blank tool name.
    pub fn validate(self) -> Result<Self, ModelError> {
        if let Self::CallTools(calls) = &self {
            if calls.is_empty() {
                return Err(ModelError::InvalidResponse(
                    "tool call batch is empty".into(),
                ));
            }
            let mut seen = HashSet::new();
            for call in calls {
                if call.call_id.trim().is_empty() {
                    return Err(ModelError::InvalidResponse(format!(
                        "tool call to {} has no id",
                        call.tool_name
                    )));
                }
                if call.tool_name.trim().is_empty() {
                    return Err(ModelError::InvalidResponse(format!(
                        "tool call {} has no tool name",
                        call.call_id
                    )));
                }
                if !seen.insert(call.call_id.as_str()) {
                    return Err(ModelError::InvalidResponse(format!(
                        "duplicate tool call id {}",
                        call.call_id
                    )));
                }
            }
        }
        Ok(self)
    }
}

/// A tool definition as presented to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool's arguments object.
    pub input_schema: Value,
}

/// How the model may use the offered tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolChoice {
    /// Model decides whether to call tools.
    #[default]
    Auto,
    /// Tools are listed for context but must not be called.
    None,
}

/// Everything needed for one gateway call.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    pub turns: &'a [Turn],
    pub tools: &'a [ToolDescriptor],
    pub tool_choice: ToolChoice,
}

/// Boundary to a language model provider.
///
/// Implementations turn the conversation into a provider request and parse
/// the reply into a [`Decision`]. Calls are not assumed to be idempotent.
pub trait Gateway: Send + Sync {
    fn decide(
        &self,
        request: ModelRequest<'_>,
    ) -> impl Future<Output = Result<Decision, ModelError>> + Send;
}

impl<G: Gateway> Gateway for std::sync::Arc<G> {
    fn decide(
        &self,
        request: ModelRequest<'_>,
    ) -> impl Future<Output = Result<Decision, ModelError>> + Send {
        (**self).decide(request)
    }
}

/// Drop tool calls that never got a result.
///
/// An exchange cancelled while its tools run is persisted with the call
/// batch but without the matching tool turns. Providers reject a call that
/// is not answered before the next message, so only calls whose result
/// follows directly are kept. An assistant turn left with neither text nor
/// calls is dropped.
pub fn replayable_turns(turns: &[Turn]) -> Vec<Turn> {
    let mut replayable = Vec::with_capacity(turns.len());
    for (index, turn) in turns.iter().enumerate() {
        let Turn::Assistant { text, calls } = turn else {
            replayable.push(turn.clone());
            continue;
        };
        if calls.is_empty() {
            replayable.push(turn.clone());
            continue;
        }

        let answered: HashSet<&str> = turns[index + 1..]
            .iter()
            .map_while(|next| match next {
                Turn::Tool(result) => Some(result.call_id.as_str()),
                _ => None,
            })
            .collect();
        let kept: Vec<ToolCallRequest> = calls
            .iter()
            .filter(|call| answered.contains(call.call_id.as_str()))
            .cloned()
            .collect();

        if kept.len() < calls.len() {
            debug!(
                dropped = calls.len() - kept.len(),
                "skipping unanswered tool calls"
            );
        }
        if text.is_empty() && kept.is_empty() {
            continue;
        }
        replayable.push(Turn::Assistant {
            text: text.clone(),
            calls: kept,
        });
    }
    replayable
}

/// Interpret a provider's tool input as an arguments object.
///
/// `null` is accepted as "no arguments".
pub fn arguments_from_value(value: Value) -> Result<Map<String, Value>, ModelError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(ModelError::InvalidResponse(format!(
            "tool arguments must be an object, got {other}"
        ))),
    }
}
