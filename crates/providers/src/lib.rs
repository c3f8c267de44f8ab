//! Model client implementations for toolpilot.
//!
//! All clients implement the `toolpilot_core::ModelClient` trait.
//! [`build_from_config`] picks one based on configuration.

pub mod anthropic;
mod http;
pub mod openai_compat;
pub mod router;

pub use anthropic::AnthropicClient;
pub use openai_compat::OpenAiCompatClient;
pub use router::build_from_config;
