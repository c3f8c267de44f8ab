//! Turn and Conversation domain types.
//!
//! A conversation is the model's only memory: an append-only sequence of
//! turns whose insertion order is exactly what the model sees.
//! User types a message → the loop appends it → the model replies or asks
//! for tools → every answer is appended in turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tool::{ToolCallRequest, ToolResult};

/// Unique identifier for a conversation (session).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a turn in its conversation. Assigned by [`Conversation::append`],
/// starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurnId(pub u64);

impl TurnId {
    /// Placeholder carried by a turn that has not been appended yet.
    pub const UNASSIGNED: TurnId = TurnId(0);
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The end user
    User,
    /// The model, either a final reply or a tool-call request
    Assistant,
    /// The outcome of a tool execution
    ToolResult,
}

/// What a turn says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnContent {
    /// Plain text (user input or a final assistant reply).
    Text { text: String },

    /// The model asked for tools. `text` is any prose that came with the request.
    ToolCalls {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        text: String,
        calls: Vec<ToolCallRequest>,
    },

    /// A tool's answer to one request.
    ToolResult { result: ToolResult },
}

/// A single entry in the transcript.
///
/// Fields are private: once a turn is appended nobody can change it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    id: TurnId,
    role: Role,
    content: TurnContent,
    timestamp: DateTime<Utc>,
}

impl Turn {
    fn new(role: Role, content: TurnContent) -> Self {
        Self {
            id: TurnId::UNASSIGNED,
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// Create a user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, TurnContent::Text { text: text.into() })
    }

    /// Create a final assistant reply.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, TurnContent::Text { text: text.into() })
    }

    /// Create an assistant turn that requests tool executions.
    pub fn tool_calls(text: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self::new(
            Role::Assistant,
            TurnContent::ToolCalls {
                text: text.into(),
                calls,
            },
        )
    }

    /// Create a tool-result turn.
    pub fn tool_result(result: ToolResult) -> Self {
        Self::new(Role::ToolResult, TurnContent::ToolResult { result })
    }

    pub fn id(&self) -> TurnId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &TurnContent {
        &self.content
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The text of a user turn, a final reply, or the prose accompanying a
    /// tool-call request. Tool results have no text.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            TurnContent::Text { text } => Some(text),
            TurnContent::ToolCalls { text, .. } => Some(text),
            TurnContent::ToolResult { .. } => None,
        }
    }

    /// Rough size used for token estimates.
    fn char_len(&self) -> usize {
        match &self.content {
            TurnContent::Text { text } => text.len(),
            TurnContent::ToolCalls { text, calls } => {
                text.len()
                    + calls
                        .iter()
                        .map(|c| c.tool_name.len() + c.arguments.to_string().len())
                        .sum::<usize>()
            }
            TurnContent::ToolResult { result } => result.payload_text().len(),
        }
    }
}

/// The ordered, append-only transcript of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    id: ConversationId,
    turns: Vec<Turn>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            turns: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &ConversationId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Append a turn, assigning it the next id.
    pub fn append(&mut self, mut turn: Turn) -> TurnId {
        let id = TurnId(self.turns.len() as u64 + 1);
        turn.id = id;
        self.updated_at = Utc::now();
        self.turns.push(turn);
        id
    }

    /// The full transcript in append order.
    pub fn snapshot(&self) -> &[Turn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Get the total token count estimate (rough: 4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.turns.iter().map(|t| t.char_len() / 4).sum()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
