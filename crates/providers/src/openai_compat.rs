//! OpenAI-compatible chat completions client.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, Groq, and any
//! endpoint exposing `/chat/completions` with function calling.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use toolpilot_core::error::ModelError;
use toolpilot_core::message::{Role, Turn, TurnContent};
use toolpilot_core::provider::{ModelClient, ModelRequest, ModelResponse, ToolDeclaration};
use toolpilot_core::tool::{ToolCallRequest, ToolStatus};
use tracing::{debug, warn};

use crate::http;

/// An OpenAI-compatible model client.
pub struct OpenAiCompatClient {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: http::build_client(Duration::from_secs(120))?,
        })
    }

    /// Convert the transcript to OpenAI chat messages.
    fn to_api_messages(system: Option<&str>, transcript: &[Turn]) -> Vec<ApiMessage> {
        let mut messages = Vec::with_capacity(transcript.len() + 1);

        if let Some(system) = system {
            messages.push(ApiMessage::text("system", system));
        }

        for turn in transcript {
            let message = match turn.content() {
                TurnContent::Text { text } => {
                    let role = if turn.role() == Role::Assistant {
                        "assistant"
                    } else {
                        "user"
                    };
                    ApiMessage::text(role, text)
                }
                TurnContent::ToolCalls { text, calls } => ApiMessage {
                    role: "assistant".into(),
                    content: (!text.is_empty()).then(|| text.clone()),
                    tool_calls: Some(calls.iter().map(ApiToolCall::from_request).collect()),
                    tool_call_id: None,
                },
                TurnContent::ToolResult { result } => {
                    let content = match result.status {
                        ToolStatus::Ok => result.payload_text(),
                        ToolStatus::Error => format!("Error: {}", result.payload_text()),
                    };
                    ApiMessage {
                        role: "tool".into(),
                        content: Some(content),
                        tool_calls: None,
                        tool_call_id: Some(result.call_id.clone()),
                    }
                }
            };
            messages.push(message);
        }

        messages
    }

    fn to_api_tools(tools: &[ToolDeclaration]) -> Vec<ApiToolDefinition> {
        tools
            .iter()
            .map(|t| ApiToolDefinition {
                r#type: "function".into(),
                function: ApiToolFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.input_schema.clone(),
                },
            })
            .collect()
    }

    fn build_body(request: &ModelRequest<'_>) -> Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(request.system, request.transcript),
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "stream": false,
        });

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(request.tools));
        }

        body
    }

    fn into_model_response(resp: ApiResponse) -> Result<ModelResponse, ModelError> {
        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::RemoteProtocol("No choices in response".into()))?;

        let requests: Vec<ToolCallRequest> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| {
                ToolCallRequest::new(tc.id, tc.function.name, parse_arguments(tc.function.arguments))
            })
            .collect();

        if let Some(usage) = resp.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                tool_calls = requests.len(),
                "Chat completion response"
            );
        }

        Ok(ModelResponse::from_parts(
            choice.message.content.unwrap_or_default(),
            requests,
        ))
    }
}

/// Decode the JSON-string arguments of a function call.
///
/// An empty string means no arguments. A string that is not JSON is kept as
/// a JSON string so argument validation rejects it and the model is told.
fn parse_arguments(raw: String) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(serde_json::Map::new());
    }
    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Tool call arguments are not valid JSON");
            Value::String(raw)
        }
    }
}

#[async_trait]
impl ModelClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::build_body(&request);

        debug!(
            provider = %self.name,
            model = %request.model,
            turns = request.transcript.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;

        let text = http::read_body(response, &self.name).await?;
        let api_response: ApiResponse = http::decode(&text, &self.name)?;
        Self::into_model_response(api_response)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl ApiMessage {
    fn text(role: &str, content: &str) -> Self {
        Self {
            role: role.into(),
            content: Some(content.to_string()),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ApiFunction,
}

fn function_type() -> String {
    "function".into()
}

impl ApiToolCall {
    fn from_request(call: &ToolCallRequest) -> Self {
        // Arguments the model sent as broken JSON go back verbatim.
        let arguments = match &call.arguments {
            Value::String(raw) => raw.clone(),
            other => other.to_string(),
        };
        Self {
            id: call.call_id.clone(),
            r#type: function_type(),
            function: ApiFunction {
                name: call.tool_name.clone(),
                arguments,
            },
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolDefinition {
    r#type: String,
    function: ApiToolFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
