//! Shared test helpers for executor, dispatch and loop tests.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::sync::Barrier;
use toolpilot_core::error::{ModelError, ToolError};
use toolpilot_core::message::Turn;
use toolpilot_core::provider::{ModelClient, ModelRequest, ModelResponse};
use toolpilot_core::tool::{InputSchema, ParamKind, ToolArgs, ToolCallRequest, ToolHandler, ToolSpec};

/// A model client that replays a scripted sequence of outcomes.
///
/// Every request's transcript is recorded so tests can inspect what the
/// model was shown. Running past the end of the script is a protocol error.
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<ModelResponse, ModelError>>>,
    seen: Mutex<Vec<Vec<Turn>>>,
    systems: Mutex<Vec<Option<String>>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<ModelResponse, ModelError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
            systems: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    /// Transcripts in the order they were sent.
    pub fn seen(&self) -> Vec<Vec<Turn>> {
        self.seen.lock().unwrap().clone()
    }

    pub fn systems(&self) -> Vec<Option<String>> {
        self.systems.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        self.seen.lock().unwrap().push(request.transcript.to_vec());
        self.systems
            .lock()
            .unwrap()
            .push(request.system.map(str::to_string));
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::RemoteProtocol("script exhausted".into())))
    }
}

/// A model client whose requests never complete.
pub struct HangingClient;

#[async_trait]
impl ModelClient for HangingClient {
    fn name(&self) -> &str {
        "hanging"
    }

    async fn send(&self, _request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        std::future::pending().await
    }
}

pub fn text(reply: &str) -> Result<ModelResponse, ModelError> {
    Ok(ModelResponse::TextReply {
        text: reply.into(),
    })
}

pub fn calls(requests: Vec<ToolCallRequest>) -> Result<ModelResponse, ModelError> {
    Ok(ModelResponse::ToolCallBatch {
        text: String::new(),
        requests,
    })
}

/// A tool that reports the `path` argument as its filesystem target.
struct PathTool {
    barrier: Option<Arc<Barrier>>,
}

#[async_trait]
impl ToolHandler for PathTool {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        if let Some(barrier) = &self.barrier {
            barrier.wait().await;
        }
        Ok(json!(format!("touched {}", args.require_str("path")?)))
    }

    fn fs_targets(&self, arguments: &Value) -> Option<Vec<PathBuf>> {
        arguments
            .get("path")
            .and_then(Value::as_str)
            .map(|p| vec![PathBuf::from(p)])
    }
}

fn path_schema() -> InputSchema {
    InputSchema::new().required("path", ParamKind::String, "Target path")
}

pub fn path_tool(name: &str) -> ToolSpec {
    ToolSpec::new(name, "Touches a path", path_schema(), Arc::new(PathTool { barrier: None }))
}

/// Like [`path_tool`] but every call waits on `barrier` before finishing.
pub fn barrier_tool(name: &str, barrier: Arc<Barrier>) -> ToolSpec {
    ToolSpec::new(
        name,
        "Touches a path once all peers arrive",
        path_schema(),
        Arc::new(PathTool {
            barrier: Some(barrier),
        }),
    )
}
