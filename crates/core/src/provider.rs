//! Model client trait: the abstraction over hosted LLM APIs.
//!
//! A model client knows how to send a transcript plus tool declarations to a
//! remote model and decode the answer into either a final text reply or a
//! batch of tool-call requests. It is the only component that talks to the
//! network; it does not interpret tool semantics.
//!
//! Implementations: Anthropic Messages API, OpenAI-compatible endpoints.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::message::Turn;
use crate::tool::ToolCallRequest;

/// A tool declaration sent to the model so it knows what it can call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    /// The tool name
    pub name: String,

    /// Description of what the tool does
    pub description: String,

    /// JSON Schema describing the tool's parameters
    pub input_schema: serde_json::Value,
}

/// One request to the model.
///
/// Borrows the transcript: sending never mutates the conversation.
#[derive(Debug, Clone, Copy)]
pub struct ModelRequest<'a> {
    /// The model to use (e.g., "claude-3-7-sonnet-latest", "gpt-4o")
    pub model: &'a str,

    /// Instructions sent out-of-band, never stored as a turn
    pub system: Option<&'a str>,

    /// The full transcript, in append order
    pub transcript: &'a [Turn],

    /// Available tools the model can call
    pub tools: &'a [ToolDeclaration],

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    pub temperature: f32,
}

/// What the model answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelResponse {
    /// A final answer with no pending tool calls.
    TextReply { text: String },

    /// One or more tool calls, in the order the model listed them.
    /// `text` is any prose the model sent along with them.
    ToolCallBatch {
        #[serde(default)]
        text: String,
        requests: Vec<ToolCallRequest>,
    },
}

impl ModelResponse {
    /// Build a response from decoded parts: no tool calls means a final reply.
    pub fn from_parts(text: String, requests: Vec<ToolCallRequest>) -> Self {
        if requests.is_empty() {
            ModelResponse::TextReply { text }
        } else {
            ModelResponse::ToolCallBatch { text, requests }
        }
    }
}

/// The core model client trait.
///
/// The orchestration loop calls `send()` without knowing which provider is
/// behind it.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// A human-readable name for this client (e.g., "anthropic", "openai").
    fn name(&self) -> &str;

    /// Send the transcript and get the model's next move.
    async fn send(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError>;
}
