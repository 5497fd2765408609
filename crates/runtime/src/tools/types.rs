//! Tool-related types.

use super::{ToolError, ToolErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error type returned by tool handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Validated arguments handed to a tool handler.
///
/// Optional parameters the caller left out are filled with their schema
/// defaults before the handler runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArguments(pub Map<String, Value>);

impl ToolArguments {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
        })
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(Value::as_f64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }
}

impl TryFrom<Value> for ToolArguments {
    type Error = ToolError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(ToolError::InvalidArguments(format!(
                "arguments must be an object, got {other}"
            ))),
        }
    }
}

/// The `{kind, message}` envelope of a failed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolFailure {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl From<ToolError> for ToolFailure {
    fn from(error: ToolError) -> Self {
        let kind = error.kind();
        let message = match error {
            ToolError::UnknownTool(name) => format!("no tool named `{name}` is available"),
            ToolError::InvalidArguments(message) | ToolError::Execution(message) => message,
            ToolError::Timeout(ms) => format!("tool did not finish within {ms}ms"),
        };
        Self { kind, message }
    }
}

/// Outcome of one tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Ok { payload: Value },
    Error { error: ToolFailure },
}

/// The result returned to the model after a tool call, paired with its call id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallResult {
    pub call_id: String,
    #[serde(flatten)]
    pub outcome: ToolOutcome,
}

impl ToolCallResult {
    pub fn ok(call_id: impl Into<String>, payload: Value) -> Self {
        Self {
            call_id: call_id.into(),
            outcome: ToolOutcome::Ok { payload },
        }
    }

    pub fn error(call_id: impl Into<String>, error: ToolError) -> Self {
        Self {
            call_id: call_id.into(),
            outcome: ToolOutcome::Error {
                error: error.into(),
            },
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ToolOutcome::Error { .. })
    }

    /// Error kind, if the call failed.
    pub fn error_kind(&self) -> Option<ToolErrorKind> {
        match &self.outcome {
            ToolOutcome::Ok { .. } => None,
            ToolOutcome::Error { error } => Some(error.kind),
        }
    }

    /// Text form of the outcome as shown to the model.
    ///
    /// String payloads are passed through; everything else is JSON.
    pub fn content(&self) -> String {
        match &self.outcome {
            ToolOutcome::Ok {
                payload: Value::String(text),
            } => text.clone(),
            ToolOutcome::Ok { payload } => payload.to_string(),
            ToolOutcome::Error { error } => serde_json::json!({ "error": error }).to_string(),
        }
    }
}
