//! Tool executor: the boundary between model requests and tool handlers.
//!
//! `execute` never fails: unknown tools, invalid arguments, handler errors,
//! panics and timeouts all come back as a [`ToolResult`] with
//! `status = error`, ready to be shown to the model.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use toolpilot_core::error::ToolError;
use toolpilot_core::tool::{ToolCallRequest, ToolRegistry, ToolResult};
use tracing::{debug, warn};

pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    timeout: Option<Duration>,
}

impl ToolExecutor {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            timeout: None,
        }
    }

    /// Abort handlers that run longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Validate and run one request.
    pub async fn execute(&self, request: &ToolCallRequest) -> ToolResult {
        let start = Instant::now();
        let outcome = self.run(request).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(payload) => {
                debug!(
                    tool = %request.tool_name,
                    call_id = %request.call_id,
                    status = "ok",
                    duration_ms,
                    "Tool executed"
                );
                ToolResult::ok(&request.call_id, payload)
            }
            Err(e) => {
                warn!(
                    tool = %request.tool_name,
                    call_id = %request.call_id,
                    status = "error",
                    duration_ms,
                    error = %e,
                    "Tool execution failed"
                );
                ToolResult::error(&request.call_id, &e)
            }
        }
    }

    async fn run(&self, request: &ToolCallRequest) -> Result<serde_json::Value, ToolError> {
        let (spec, args) = self.registry.validate(request)?;
        let handler = Arc::clone(&spec.handler);
        let tool_name = spec.name.clone();

        let call = AssertUnwindSafe(async move { handler.call(args).await }).catch_unwind();
        let caught = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| ToolError::Timeout {
                    tool_name: tool_name.clone(),
                    timeout_secs: limit.as_secs(),
                })?,
            None => call.await,
        };

        caught.map_err(|panic| ToolError::Panicked {
            tool_name,
            reason: panic_message(panic.as_ref()),
        })?
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use toolpilot_core::tool::{InputSchema, ParamKind, ToolArgs, ToolSpec, ToolStatus};

    fn executor_with(specs: Vec<ToolSpec>) -> ToolExecutor {
        let mut registry = ToolRegistry::new();
        for spec in specs {
            registry.register(spec).unwrap();
        }
        ToolExecutor::new(Arc::new(registry))
    }

    fn counting_tool(counter: Arc<AtomicUsize>) -> ToolSpec {
        ToolSpec::from_fn(
            "count",
            "Counts invocations",
            InputSchema::new().required("label", ParamKind::String, "A label"),
            move |args: ToolArgs| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<Value, ToolError>(json!(format!("counted {}", args.require_str("label")?)))
                }
            },
        )
    }

    #[tokio::test]
    async fn success_returns_ok_payload() {
        let counter = Arc::new(AtomicUsize::new(0));
        let executor = executor_with(vec![counting_tool(counter.clone())]);

        let result = executor
            .execute(&ToolCallRequest::new("c1", "count", json!({"label": "x"})))
            .await;
        assert_eq!(result.call_id, "c1");
        assert_eq!(result.status, ToolStatus::Ok);
        assert_eq!(result.payload, json!("counted x"));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_error_without_invocation() {
        let counter = Arc::new(AtomicUsize::new(0));
        let executor = executor_with(vec![counting_tool(counter.clone())]);

        let result = executor
            .execute(&ToolCallRequest::new("c2", "nope", json!({})))
            .await;
        assert_eq!(result.status, ToolStatus::Error);
        assert_eq!(result.payload, json!("unknown tool: nope"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_arguments_skip_handler() {
        let counter = Arc::new(AtomicUsize::new(0));
        let executor = executor_with(vec![counting_tool(counter.clone())]);

        let result = executor
            .execute(&ToolCallRequest::new("c3", "count", json!({"label": ["not", "a", "string"]})))
            .await;
        assert_eq!(result.status, ToolStatus::Error);
        assert!(result.payload_text().starts_with("invalid arguments for count"));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_error_becomes_error_result() {
        let executor = executor_with(vec![ToolSpec::from_fn(
            "fail",
            "Always fails",
            InputSchema::new(),
            |_args: ToolArgs| async {
                Err::<Value, ToolError>(ToolError::NotFound("missing.txt".into()))
            },
        )]);

        let result = executor
            .execute(&ToolCallRequest::new("c4", "fail", json!({})))
            .await;
        assert_eq!(result.status, ToolStatus::Error);
        assert_eq!(result.payload, json!("file not found: missing.txt"));
    }

    #[tokio::test]
    async fn panic_is_contained() {
        let executor = executor_with(vec![ToolSpec::from_fn(
            "boom",
            "Panics",
            InputSchema::new(),
            |_args: ToolArgs| async {
                if true {
                    panic!("handler exploded");
                }
                Ok::<Value, ToolError>(Value::Null)
            },
        )]);

        let result = executor
            .execute(&ToolCallRequest::new("c5", "boom", json!({})))
            .await;
        assert_eq!(result.status, ToolStatus::Error);
        assert!(result.payload_text().contains("panicked"));
        assert!(result.payload_text().contains("handler exploded"));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_handler_times_out() {
        let executor = executor_with(vec![ToolSpec::from_fn(
            "hang",
            "Never finishes",
            InputSchema::new(),
            |_args: ToolArgs| async {
                std::future::pending::<()>().await;
                Ok::<Value, ToolError>(Value::Null)
            },
        )])
        .with_timeout(Some(Duration::from_secs(5)));

        let result = executor
            .execute(&ToolCallRequest::new("c6", "hang", json!({})))
            .await;
        assert_eq!(result.status, ToolStatus::Error);
        assert_eq!(result.payload, json!("hang timed out after 5s"));
    }
}
