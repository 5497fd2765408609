//! Anthropic Messages API gateway.

use crate::model::{
    Decision, Gateway, ModelError, ModelRequest, ToolCallRequest, ToolChoice, ToolDescriptor,
    Turn, arguments_from_value, replayable_turns,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ApiToolChoice>,
}

#[derive(Debug, Serialize, PartialEq)]
struct ApiMessage {
    role: &'static str,
    content: ApiContent,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
enum ApiContent {
    Text(String),
    Blocks(Vec<ApiContentBlock>),
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize)]
struct ApiTool {
    name: String,
    description: String,
    input_schema: Value,
}

#[derive(Debug, Serialize)]
struct ApiToolChoice {
    #[serde(rename = "type")]
    choice_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    content: Vec<ApiResponseBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiResponseBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    #[serde(other)]
    Unknown,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Anthropic backend.
#[derive(Debug, Clone)]
pub struct AnthropicBackendBuilder {
    api_key: String,
    model: String,
    max_tokens: u32,
    system: Option<String>,
    url: String,
}

impl AnthropicBackendBuilder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 4096,
            system: None,
            url: ANTHROPIC_API_URL.to_string(),
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

    /// Override the endpoint (for proxies or gateways).
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn build(self) -> AnthropicBackend {
        AnthropicBackend {
            client: reqwest::Client::new(),
            api_key: self.api_key,
            model: self.model,
            max_tokens: self.max_tokens,
            system: self.system,
            url: self.url,
        }
    }
}

/// Anthropic API backend.
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    system: Option<String>,
    url: String,
}

impl AnthropicBackend {
    pub fn builder(api_key: impl Into<String>, model: impl Into<String>) -> AnthropicBackendBuilder {
        AnthropicBackendBuilder::new(api_key, model)
    }

    fn turn_to_api(turn: &Turn) -> (&'static str, Vec<ApiContentBlock>) {
        match turn {
            Turn::User { text } => ("user", vec![ApiContentBlock::Text { text: text.clone() }]),
            Turn::Assistant { text, calls } => {
                let mut blocks = Vec::with_capacity(calls.len() + 1);
                if !text.is_empty() {
                    blocks.push(ApiContentBlock::Text { text: text.clone() });
                }
                blocks.extend(calls.iter().map(|call| ApiContentBlock::ToolUse {
                    id: call.call_id.clone(),
                    name: call.tool_name.clone(),
                    input: Value::Object(call.arguments.clone()),
                }));
                ("assistant", blocks)
            }
            Turn::Tool(result) => (
                "user",
                vec![ApiContentBlock::ToolResult {
                    tool_use_id: result.call_id.clone(),
                    content: result.content(),
                    is_error: result.is_error(),
                }],
            ),
        }
    }

    /// Convert turns to API messages.
    ///
    /// Consecutive turns with the same role are merged, which puts all tool
    /// results of one batch into a single user message as the API requires.
    /// Unanswered `tool_use` blocks are left out.
    fn turns_to_api(turns: &[Turn]) -> Vec<ApiMessage> {
        let mut grouped: Vec<(&'static str, Vec<ApiContentBlock>)> = Vec::new();
        for turn in &replayable_turns(turns) {
            let (role, blocks) = Self::turn_to_api(turn);
            if blocks.is_empty() {
                continue;
            }
            match grouped.last_mut() {
                Some((last_role, last_blocks)) if *last_role == role => last_blocks.extend(blocks),
                _ => grouped.push((role, blocks)),
            }
        }

        grouped
            .into_iter()
            .map(|(role, mut blocks)| {
                // Simple case: single text block
                let content = match blocks.as_mut_slice() {
                    [ApiContentBlock::Text { text }] => ApiContent::Text(std::mem::take(text)),
                    _ => ApiContent::Blocks(blocks),
                };
                ApiMessage { role, content }
            })
            .collect()
    }

    fn tool_to_api(tool: &ToolDescriptor) -> ApiTool {
        ApiTool {
            name: tool.name.clone(),
            description: tool.description.clone(),
            input_schema: tool.input_schema.clone(),
        }
    }

    fn response_to_decision(blocks: Vec<ApiResponseBlock>) -> Result<Decision, ModelError> {
        let mut text = String::new();
        let mut calls = Vec::new();
        for block in blocks {
            match block {
                ApiResponseBlock::Text { text: part } => text.push_str(&part),
                ApiResponseBlock::ToolUse { id, name, input } => {
                    calls.push(ToolCallRequest::new(id, name, arguments_from_value(input)?));
                }
                ApiResponseBlock::Unknown => {}
            }
        }

        if !calls.is_empty() {
            Ok(Decision::CallTools(calls))
        } else if !text.trim().is_empty() {
            Ok(Decision::Answer(text))
        } else {
            Err(ModelError::InvalidResponse(
                "response had neither text nor tool calls".into(),
            ))
        }
    }
}

impl std::fmt::Display for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "anthropic({})", self.model)
    }
}

impl Gateway for AnthropicBackend {
    async fn decide(&self, request: ModelRequest<'_>) -> Result<Decision, ModelError> {
        let tools: Vec<ApiTool> = request.tools.iter().map(Self::tool_to_api).collect();
        let tool_choice = match request.tool_choice {
            ToolChoice::None if !tools.is_empty() => Some(ApiToolChoice { choice_type: "none" }),
            _ => None,
        };

        let api_request = ApiRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            messages: Self::turns_to_api(request.turns),
            system: self.system.clone(),
            tools,
            tool_choice,
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .header("accept", "application/json")
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

        Self::response_to_decision(api_response.content)
    }
}
