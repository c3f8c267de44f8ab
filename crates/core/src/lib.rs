//! # toolpilot core
//!
//! Domain types, traits, and error definitions for the toolpilot agent.
//! This crate has **no I/O**. It defines the domain model that the
//! tools, providers and agent crates implement against.
//!
//! ## Design Philosophy
//!
//! Every seam is a trait or a plain data type here:
//! - [`ModelClient`] hides the remote wire protocol
//! - [`ToolHandler`] hides what a tool actually does
//! - [`Conversation`] is the single owner of the transcript
//!
//! Implementations live in their respective crates and can be swapped for
//! scripted stand-ins in tests.

pub mod error;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, ModelError, Result, ToolError};
pub use message::{Conversation, ConversationId, Role, Turn, TurnContent, TurnId};
pub use provider::{ModelClient, ModelRequest, ModelResponse, ToolDeclaration};
pub use tool::{
    InputSchema, ParamKind, ParamSpec, SchemaPolicy, ToolArgs, ToolCallRequest, ToolHandler,
    ToolRegistry, ToolResult, ToolSpec, ToolStatus,
};
