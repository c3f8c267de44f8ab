//! File write tool: create or overwrite a file inside the workspace.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use toolpilot_core::error::ToolError;
use toolpilot_core::tool::{InputSchema, ParamKind, ToolArgs, ToolHandler, ToolSpec};
use toolpilot_security::Workspace;

pub const NAME: &str = "write_file";

pub struct WriteFileTool {
    workspace: Arc<Workspace>,
}

impl WriteFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    pub fn spec(self) -> ToolSpec {
        ToolSpec::new(
            NAME,
            "Write content to a file. Creates the file (and parent directories) if it \
             doesn't exist, overwrites it if it does.",
            InputSchema::new()
                .required("path", ParamKind::String, "Relative path from the workspace root.")
                .required("content", ParamKind::String, "The full new file content."),
            Arc::new(self),
        )
    }
}

#[async_trait]
impl ToolHandler for WriteFileTool {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let path = args.require_str("path")?;
        let content = args.require_str("content")?;
        let resolved = self.workspace.resolve(path)?;

        let previous = match tokio::fs::metadata(&resolved).await {
            Ok(meta) if meta.is_dir() => {
                return Err(ToolError::failed(NAME, format!("{path} is a directory")));
            }
            Ok(meta) => Some(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(ToolError::from_io(NAME, path, &e)),
        };

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ToolError::from_io(NAME, path, &e))?;
        }
        tokio::fs::write(&resolved, content)
            .await
            .map_err(|e| ToolError::from_io(NAME, path, &e))?;

        tracing::debug!(path, bytes = content.len(), overwrote = previous.is_some(), "Wrote file");
        let message = match previous {
            Some(old) => format!(
                "Overwrote {path} ({} bytes, previously {old} bytes)",
                content.len()
            ),
            None => format!("Created {path} ({} bytes)", content.len()),
        };
        Ok(Value::String(message))
    }

    fn fs_targets(&self, arguments: &Value) -> Option<Vec<PathBuf>> {
        crate::resolve_target(&self.workspace, arguments, "path", None)
    }
}
