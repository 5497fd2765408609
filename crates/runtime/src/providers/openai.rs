//! OpenAI Chat Completions gateway.

use crate::model::{
    Decision, Gateway, ModelError, ModelRequest, ToolCallRequest, ToolChoice, ToolDescriptor,
    Turn, arguments_from_value, replayable_turns,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const OPENAI_API_URL: &str = "https://api.openai.com/v1";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "role", rename_all = "snake_case")]
enum ApiMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ApiToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_type")]
    call_type: String,
    function: ApiFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ApiFunctionCall {
    name: String,
    /// JSON-encoded arguments object.
    arguments: String,
}

fn function_type() -> String {
    "function".to_string()
}

#[derive(Debug, Serialize)]
struct ApiTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ApiFunction,
}

#[derive(Debug, Serialize)]
struct ApiFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ApiToolCall>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an OpenAI backend.
#[derive(Debug, Clone)]
pub struct OpenAiBackendBuilder {
    api_key: String,
    model: String,
    max_tokens: u32,
    system: Option<String>,
    base_url: String,
}

impl OpenAiBackendBuilder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
            system: None,
            base_url: OPENAI_API_URL.to_string(),
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Point at any Chat Completions compatible server.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn build(self) -> OpenAiBackend {
        OpenAiBackend {
            client: reqwest::Client::new(),
            api_key: self.api_key,
            model: self.model,
            max_tokens: self.max_tokens,
            system: self.system,
            url: format!("{}/chat/completions", self.base_url.trim_end_matches('/')),
        }
    }
}

/// OpenAI API backend.
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    system: Option<String>,
    url: String,
}

impl OpenAiBackend {
    pub fn builder(api_key: impl Into<String>, model: impl Into<String>) -> OpenAiBackendBuilder {
        OpenAiBackendBuilder::new(api_key, model)
    }

    /// Unanswered `tool_calls` are left out.
    fn turns_to_api(system: Option<&str>, turns: &[Turn]) -> Vec<ApiMessage> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        if let Some(system) = system {
            messages.push(ApiMessage::System {
                content: system.to_string(),
            });
        }

        messages.extend(replayable_turns(turns).iter().map(|turn| match turn {
            Turn::User { text } => ApiMessage::User {
                content: text.clone(),
            },
            Turn::Assistant { text, calls } => ApiMessage::Assistant {
                content: (!text.is_empty()).then(|| text.clone()),
                tool_calls: calls
                    .iter()
                    .map(|call| ApiToolCall {
                        id: call.call_id.clone(),
                        call_type: function_type(),
                        function: ApiFunctionCall {
                            name: call.tool_name.clone(),
                            arguments: Value::Object(call.arguments.clone()).to_string(),
                        },
                    })
                    .collect(),
            },
            Turn::Tool(result) => ApiMessage::Tool {
                tool_call_id: result.call_id.clone(),
                content: result.content(),
            },
        }));
        messages
    }

    fn tool_to_api(tool: &ToolDescriptor) -> ApiTool {
        ApiTool {
            tool_type: "function",
            function: ApiFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.input_schema.clone(),
            },
        }
    }

    fn response_to_decision(response: ApiResponse) -> Result<Decision, ModelError> {
        let message = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("response had no choices".into()))?
            .message;

        if !message.tool_calls.is_empty() {
            let calls = message
                .tool_calls
                .into_iter()
                .map(|call| {
                    let value: Value = serde_json::from_str(&call.function.arguments).map_err(|e| {
                        ModelError::InvalidResponse(format!(
                            "arguments for {} are not valid JSON: {e}",
                            call.function.name
                        ))
                    })?;
                    Ok(ToolCallRequest::new(
                        call.id,
                        call.function.name,
                        arguments_from_value(value)?,
                    ))
                })
                .collect::<Result<Vec<_>, ModelError>>()?;
            return Ok(Decision::CallTools(calls));
        }

        match message.content {
            Some(text) if !text.trim().is_empty() => Ok(Decision::Answer(text)),
            _ => Err(ModelError::InvalidResponse(
                "response had neither content nor tool calls".into(),
            )),
        }
    }
}

impl std::fmt::Display for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "openai({})", self.model)
    }
}

impl Gateway for OpenAiBackend {
    async fn decide(&self, request: ModelRequest<'_>) -> Result<Decision, ModelError> {
        let tools: Vec<ApiTool> = request.tools.iter().map(Self::tool_to_api).collect();
        let tool_choice = match request.tool_choice {
            ToolChoice::None if !tools.is_empty() => Some("none"),
            _ => None,
        };

        let api_request = ApiRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: Self::turns_to_api(self.system.as_deref(), request.turns),
            tools,
            tool_choice,
        };

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        Self::response_to_decision(api_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolCallResult, ToolError};
    use serde_json::{Map, json};

    fn parse(value: Value) -> Result<Decision, ModelError> {
        OpenAiBackend::response_to_decision(serde_json::from_value(value).unwrap())
    }

    #[test]
    fn tool_turns_become_tool_messages() {
        let mut arguments = Map::new();
        arguments.insert("gameweek".into(), json!(7));
        let turns = vec![
            Turn::user("fixtures?"),
            Turn::tool_calls(vec![ToolCallRequest::new(
                "call_1",
                "get_fixtures_for_gameweek",
                arguments,
            )]),
            Turn::Tool(ToolCallResult::error("call_1", ToolError::Timeout(250))),
        ];

        let messages = OpenAiBackend::turns_to_api(Some("be brief"), &turns);
        let encoded = serde_json::to_value(&messages).unwrap();
        assert_eq!(encoded[0], json!({ "role": "system", "content": "be brief" }));
        assert_eq!(
            encoded[2],
            json!({
                "role": "assistant",
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": { "name": "get_fixtures_for_gameweek", "arguments": "{\"gameweek\":7}" }
                }]
            })
        );
        assert_eq!(encoded[3]["role"], "tool");
        assert_eq!(encoded[3]["tool_call_id"], "call_1");
        assert!(encoded[3]["content"].as_str().unwrap().contains("Timeout"));
    }

    #[test]
    fn cancelled_batch_is_not_replayed() {
        let turns = vec![
            Turn::user("go"),
            Turn::Assistant {
                text: "Let me check.".into(),
                calls: vec![ToolCallRequest::new("call_1", "get_current_gameweek_info", Map::new())],
            },
            Turn::user("try again"),
        ];

        let encoded = serde_json::to_value(OpenAiBackend::turns_to_api(None, &turns)).unwrap();
        assert_eq!(
            encoded,
            json!([
                { "role": "user", "content": "go" },
                { "role": "assistant", "content": "Let me check." },
                { "role": "user", "content": "try again" }
            ])
        );
    }

    #[test]
    fn tool_calls_are_parsed() {
        let decision = parse(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": { "name": "get_top_players_by_form", "arguments": "{\"top_n\":5}" }
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let Decision::CallTools(calls) = decision else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].call_id, "call_9");
        assert_eq!(calls[0].arguments["top_n"], json!(5));
    }

    #[test]
    fn malformed_arguments_are_invalid() {
        let result = parse(json!({
            "choices": [{ "message": { "tool_calls": [{
                "id": "c", "type": "function",
                "function": { "name": "x", "arguments": "{not json" }
            }] } }]
        }));
        assert!(matches!(result, Err(ModelError::InvalidResponse(_))));

        let result = parse(json!({
            "choices": [{ "message": { "tool_calls": [{
                "id": "c", "type": "function",
                "function": { "name": "x", "arguments": "[1,2]" }
            }] } }]
        }));
        assert!(matches!(result, Err(ModelError::InvalidResponse(_))));
    }

    #[test]
    fn content_is_an_answer() {
        let decision = parse(json!({
            "choices": [{ "message": { "role": "assistant", "content": "Bench Isak." } }]
        }))
        .unwrap();
        assert_eq!(decision, Decision::Answer("Bench Isak.".into()));
    }

    #[test]
    fn empty_choices_are_invalid() {
        assert!(parse(json!({ "choices": [] })).is_err());
        assert!(parse(json!({ "choices": [{ "message": { "content": "" } }] })).is_err());
    }

    #[test]
    fn url_joins_base() {
        let backend = OpenAiBackend::builder("k", "gpt-4o-mini")
            .base_url("http://localhost:8080/v1/")
            .build();
        assert_eq!(backend.url, "http://localhost:8080/v1/chat/completions");
        assert_eq!(backend.to_string(), "openai(gpt-4o-mini)");
    }
}
