//! Anthropic native Messages API client.
//!
//! Features:
//! - `x-api-key` header authentication (not Bearer)
//! - `anthropic-version` header
//! - System prompt as top-level field
//! - Native tool use with `tool_use` / `tool_result` content blocks

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolpilot_core::error::ModelError;
use toolpilot_core::message::{Role, Turn, TurnContent};
use toolpilot_core::provider::{ModelClient, ModelRequest, ModelResponse, ToolDeclaration};
use toolpilot_core::tool::{ToolCallRequest, ToolStatus};
use tracing::debug;

use crate::http;

const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic Messages API client.
pub struct AnthropicClient {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ModelError> {
        Ok(Self {
            name: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client: http::build_client(Duration::from_secs(300))?,
        })
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Convert the transcript to Anthropic messages.
    ///
    /// Tool results travel as `user` messages, and consecutive messages with
    /// the same role are merged, so every result of a batch lands in the one
    /// user message right after its `tool_use` blocks.
    fn to_api_messages(transcript: &[Turn]) -> Vec<AnthropicMessage> {
        let mut result: Vec<AnthropicMessage> = Vec::new();

        for turn in transcript {
            let (role, blocks) = match turn.content() {
                TurnContent::Text { text } => {
                    let role = if turn.role() == Role::Assistant {
                        "assistant"
                    } else {
                        "user"
                    };
                    (role, text_block(text).into_iter().collect::<Vec<_>>())
                }
                TurnContent::ToolCalls { text, calls } => {
                    let mut blocks: Vec<ContentBlock> = text_block(text).into_iter().collect();
                    blocks.extend(calls.iter().map(|call| ContentBlock::ToolUse {
                        id: call.call_id.clone(),
                        name: call.tool_name.clone(),
                        input: if call.arguments.is_object() {
                            call.arguments.clone()
                        } else {
                            serde_json::json!({})
                        },
                    }));
                    ("assistant", blocks)
                }
                TurnContent::ToolResult { result } => (
                    "user",
                    vec![ContentBlock::ToolResult {
                        tool_use_id: result.call_id.clone(),
                        content: result.payload_text(),
                        is_error: result.status == ToolStatus::Error,
                    }],
                ),
            };

            if blocks.is_empty() {
                continue;
            }
            match result.last_mut() {
                Some(last) if last.role == role => last.content.extend(blocks),
                _ => result.push(AnthropicMessage {
                    role: role.into(),
                    content: blocks,
                }),
            }
        }

        result
    }

    fn to_api_tools(tools: &[ToolDeclaration]) -> Vec<AnthropicTool> {
        tools
            .iter()
            .map(|t| AnthropicTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect()
    }

    fn build_body(request: &ModelRequest<'_>) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(request.transcript),
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        if let Some(system) = request.system {
            body["system"] = serde_json::json!(system);
        }

        if !request.tools.is_empty() {
            body["tools"] = serde_json::json!(Self::to_api_tools(request.tools));
        }

        body
    }

    /// Convert an Anthropic response into the model's next move.
    fn into_model_response(resp: AnthropicResponse) -> ModelResponse {
        let mut text = String::new();
        let mut requests = Vec::new();

        for block in resp.content {
            match block {
                ResponseContentBlock::Text { text: part } => {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&part);
                }
                ResponseContentBlock::ToolUse { id, name, input } => {
                    requests.push(ToolCallRequest::new(id, name, input));
                }
                ResponseContentBlock::Other => {}
            }
        }

        debug!(
            stop_reason = resp.stop_reason.as_deref().unwrap_or("unknown"),
            input_tokens = resp.usage.input_tokens,
            output_tokens = resp.usage.output_tokens,
            tool_calls = requests.len(),
            "Anthropic response"
        );
        ModelResponse::from_parts(text, requests)
    }
}

fn text_block(text: &str) -> Option<ContentBlock> {
    (!text.is_empty()).then(|| ContentBlock::Text {
        text: text.to_string(),
    })
}

#[async_trait]
impl ModelClient for AnthropicClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        let url = format!("{}/v1/messages", self.base_url);
        let body = Self::build_body(&request);

        debug!(
            provider = "anthropic",
            model = %request.model,
            turns = request.transcript.len(),
            "Sending messages request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(http::transport_error)?;

        let text = http::read_body(response, &self.name).await?;
        let api_resp: AnthropicResponse = http::decode(&text, &self.name)?;
        Ok(Self::into_model_response(api_resp))
    }
}

// --- Anthropic API types ---

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct AnthropicTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ResponseContentBlock>,
    #[serde(default)]
    usage: AnthropicUsage,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    /// Thinking and any future block types.
    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}
