//! End-to-end integration tests for the toolpilot agent.
//!
//! These tests exercise the full pipeline from user input to final reply:
//! the orchestration loop, the real file-system tools inside a temporary
//! workspace, and a scripted model client standing in for the remote API.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::json;
use toolpilot_agent::{AgentLoop, CancellationToken};
use toolpilot_config::{AppConfig, DispatchPolicy};
use toolpilot_core::error::ModelError;
use toolpilot_core::message::{Conversation, Role, Turn, TurnContent};
use toolpilot_core::provider::{ModelClient, ModelRequest, ModelResponse};
use toolpilot_core::tool::{SchemaPolicy, ToolCallRequest, ToolRegistry, ToolResult, ToolStatus};
use toolpilot_security::Workspace;
use toolpilot_tools::default_registry;

// ── Mock Client ──────────────────────────────────────────────────────────

/// A model client that replays scripted outcomes in sequence.
struct ScriptedClient {
    script: Mutex<VecDeque<Result<ModelResponse, ModelError>>>,
    seen: Mutex<Vec<Vec<Turn>>>,
}

impl ScriptedClient {
    fn new(script: Vec<Result<ModelResponse, ModelError>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    fn seen(&self) -> Vec<Vec<Turn>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ModelClient for ScriptedClient {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn send(&self, request: ModelRequest<'_>) -> Result<ModelResponse, ModelError> {
        assert!(!request.tools.is_empty(), "tool declarations must be sent");
        self.seen.lock().unwrap().push(request.transcript.to_vec());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .expect("ScriptedClient: no more responses")
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn text(reply: &str) -> Result<ModelResponse, ModelError> {
    Ok(ModelResponse::TextReply {
        text: reply.into(),
    })
}

fn tool_calls(requests: Vec<ToolCallRequest>) -> Result<ModelResponse, ModelError> {
    Ok(ModelResponse::ToolCallBatch {
        text: "Let me check.".into(),
        requests,
    })
}

fn registry_for(root: &Path) -> Arc<ToolRegistry> {
    let workspace = Workspace::new(root, &[".git".to_string()]).unwrap();
    Arc::new(default_registry(Arc::new(workspace), 1024 * 1024, SchemaPolicy::Lenient).unwrap())
}

fn result_at(conv: &Conversation, index: usize) -> &ToolResult {
    match conv.snapshot()[index].content() {
        TurnContent::ToolResult { result } => result,
        other => panic!("Expected tool result at {index}, got {other:?}"),
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_list_files_then_reply() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.txt"), "alpha").unwrap();
    std::fs::write(dir.path().join("b.txt"), "beta").unwrap();

    let client = ScriptedClient::new(vec![
        tool_calls(vec![ToolCallRequest::new(
            "call_1",
            "list_files",
            json!({"directory": "."}),
        )]),
        text("There are two files: a.txt and b.txt."),
    ]);
    let agent = AgentLoop::new(client.clone(), registry_for(dir.path()), "mock-model");
    let mut conv = Conversation::new();

    let outcome = agent
        .run_exchange(&mut conv, "What files are here?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.reply, "There are two files: a.txt and b.txt.");
    assert_eq!(outcome.tool_calls, 1);

    let result = result_at(&conv, 2);
    assert_eq!(result.call_id, "call_1");
    assert_eq!(result.status, ToolStatus::Ok);
    assert_eq!(result.payload, json!(["a.txt", "b.txt"]));

    // Second model call saw user, tool-call descriptor and tool result
    let seen = client.seen();
    assert_eq!(seen.len(), 2);
    let roles: Vec<Role> = seen[1].iter().map(Turn::role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::ToolResult]);

    // Turn ids strictly increase in append order
    let ids: Vec<u64> = conv.snapshot().iter().map(|t| t.id().0).collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "{ids:?}");
}

#[tokio::test]
async fn e2e_missing_file_is_reported_and_loop_continues() {
    let dir = tempfile::tempdir().unwrap();

    let client = ScriptedClient::new(vec![
        tool_calls(vec![ToolCallRequest::new(
            "call_1",
            "read_file",
            json!({"path": "missing.txt"}),
        )]),
        text("That file does not exist."),
    ]);
    let agent = AgentLoop::new(client.clone(), registry_for(dir.path()), "mock-model");
    let mut conv = Conversation::new();

    let outcome = agent
        .run_exchange(&mut conv, "Read missing.txt", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.reply, "That file does not exist.");
    let result = result_at(&conv, 2);
    assert_eq!(result.status, ToolStatus::Error);
    assert_eq!(result.payload, json!("file not found: missing.txt"));
    assert_eq!(client.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn e2e_transient_errors_recovered_without_duplicate_turns() {
    let dir = tempfile::tempdir().unwrap();

    let client = ScriptedClient::new(vec![
        Err(ModelError::TransientNetwork("connection reset".into())),
        Err(ModelError::TransientNetwork("HTTP 503".into())),
        text("Hello after the outage."),
    ]);
    let agent = AgentLoop::new(client.clone(), registry_for(dir.path()), "mock-model");
    let mut conv = Conversation::new();

    let outcome = agent
        .run_exchange(&mut conv, "Hi", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.reply, "Hello after the outage.");
    assert_eq!(outcome.retries, 2);
    assert_eq!(client.calls(), 3);
    assert_eq!(conv.len(), 2);
    assert_eq!(conv.snapshot()[0].role(), Role::User);
    assert_eq!(conv.snapshot()[1].role(), Role::Assistant);
}

#[tokio::test]
async fn e2e_writes_to_same_path_run_in_order() {
    let dir = tempfile::tempdir().unwrap();

    let client = ScriptedClient::new(vec![
        tool_calls(vec![
            ToolCallRequest::new("w1", "write_file", json!({"path": "notes.txt", "content": "first"})),
            ToolCallRequest::new("w2", "write_file", json!({"path": "notes.txt", "content": "second"})),
        ]),
        text("Written twice."),
    ]);
    // Even when concurrency is allowed, overlapping targets run in order
    let agent = AgentLoop::new(client, registry_for(dir.path()), "mock-model")
        .with_dispatch(DispatchPolicy::ConcurrentWhenDisjoint);
    let mut conv = Conversation::new();

    agent
        .run_exchange(&mut conv, "Write the notes", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result_at(&conv, 2).payload, json!("Created notes.txt (5 bytes)"));
    assert_eq!(
        result_at(&conv, 3).payload,
        json!("Overwrote notes.txt (6 bytes, previously 5 bytes)")
    );
    assert_eq!(
        std::fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
        "second"
    );
}

#[tokio::test]
async fn e2e_disjoint_writes_all_land() {
    let dir = tempfile::tempdir().unwrap();

    let client = ScriptedClient::new(vec![
        tool_calls(vec![
            ToolCallRequest::new("w1", "write_file", json!({"path": "one.txt", "content": "1"})),
            ToolCallRequest::new("w2", "write_file", json!({"path": "two.txt", "content": "2"})),
        ]),
        text("Both written."),
    ]);
    let agent = AgentLoop::new(client, registry_for(dir.path()), "mock-model")
        .with_dispatch(DispatchPolicy::ConcurrentWhenDisjoint);
    let mut conv = Conversation::new();

    agent
        .run_exchange(&mut conv, "Write both", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result_at(&conv, 2).call_id, "w1");
    assert_eq!(result_at(&conv, 3).call_id, "w2");
    assert_eq!(std::fs::read_to_string(dir.path().join("one.txt")).unwrap(), "1");
    assert_eq!(std::fs::read_to_string(dir.path().join("two.txt")).unwrap(), "2");
}

#[tokio::test]
async fn e2e_edit_then_read_across_rounds() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.rs"), "fn main() { println!(\"hi\"); }\n").unwrap();

    let client = ScriptedClient::new(vec![
        tool_calls(vec![ToolCallRequest::new(
            "e1",
            "edit_file",
            json!({"path": "main.rs", "old_str": "\"hi\"", "new_str": "\"hello\""}),
        )]),
        tool_calls(vec![ToolCallRequest::new(
            "r1",
            "read_file",
            json!({"path": "main.rs"}),
        )]),
        text("Updated the greeting."),
    ]);
    let agent = AgentLoop::new(client.clone(), registry_for(dir.path()), "mock-model");
    let mut conv = Conversation::new();

    let outcome = agent
        .run_exchange(&mut conv, "Say hello instead", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.model_calls, 3);
    assert_eq!(outcome.tool_calls, 2);
    assert_eq!(result_at(&conv, 2).status, ToolStatus::Ok);
    assert_eq!(
        result_at(&conv, 4).payload,
        json!("fn main() { println!(\"hello\"); }\n")
    );
    assert_eq!(client.seen()[2].len(), 5);
}

#[tokio::test]
async fn e2e_sandbox_escape_is_a_tool_error() {
    let dir = tempfile::tempdir().unwrap();

    let client = ScriptedClient::new(vec![
        tool_calls(vec![ToolCallRequest::new(
            "x1",
            "read_file",
            json!({"path": "../../etc/passwd"}),
        )]),
        text("I can't read outside the workspace."),
    ]);
    let agent = AgentLoop::new(client, registry_for(dir.path()), "mock-model");
    let mut conv = Conversation::new();

    agent
        .run_exchange(&mut conv, "Read /etc/passwd", &CancellationToken::new())
        .await
        .unwrap();

    let result = result_at(&conv, 2);
    assert_eq!(result.status, ToolStatus::Error);
    assert!(result.payload_text().starts_with("path rejected"), "{}", result.payload_text());
}

#[tokio::test]
async fn e2e_multi_exchange_session_keeps_history() {
    let dir = tempfile::tempdir().unwrap();

    let client = ScriptedClient::new(vec![text("Nice to meet you."), text("You said hello.")]);
    let mut config = AppConfig::default();
    config.workspace.root = Some(dir.path().to_path_buf());
    config.system_prompt = Some("You are a test agent.".into());
    let agent = AgentLoop::from_config(client.clone(), registry_for(dir.path()), &config);
    let mut conv = Conversation::new();

    agent
        .run_exchange(&mut conv, "hello", &CancellationToken::new())
        .await
        .unwrap();
    agent
        .run_exchange(&mut conv, "what did I say?", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(conv.len(), 4);
    let seen = client.seen();
    assert_eq!(seen[1].len(), 3);
    assert_eq!(seen[1][0].text(), Some("hello"));
    assert_eq!(seen[1][1].text(), Some("Nice to meet you."));
}
