//! File read tool: read a UTF-8 text file inside the workspace.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use toolpilot_core::error::ToolError;
use toolpilot_core::tool::{InputSchema, ParamKind, ToolArgs, ToolHandler, ToolSpec};
use toolpilot_security::Workspace;

pub const NAME: &str = "read_file";

pub struct ReadFileTool {
    workspace: Arc<Workspace>,
    max_file_size: u64,
}

impl ReadFileTool {
    pub fn new(workspace: Arc<Workspace>, max_file_size: u64) -> Self {
        Self {
            workspace,
            max_file_size,
        }
    }

    pub fn spec(self) -> ToolSpec {
        ToolSpec::new(
            NAME,
            "Read a file and return its contents as text.",
            InputSchema::new().required(
                "path",
                ParamKind::String,
                "The relative path of a file in the working directory.",
            ),
            Arc::new(self),
        )
    }
}

#[async_trait]
impl ToolHandler for ReadFileTool {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let path = args.require_str("path")?;
        let resolved = self.workspace.resolve(path)?;

        let metadata = tokio::fs::metadata(&resolved)
            .await
            .map_err(|e| ToolError::from_io(NAME, path, &e))?;
        if metadata.is_dir() {
            return Err(ToolError::failed(
                NAME,
                format!("{path} is a directory, use list_files"),
            ));
        }
        if metadata.len() > self.max_file_size {
            return Err(ToolError::failed(
                NAME,
                format!(
                    "{path} is {} bytes, larger than the {} byte limit",
                    metadata.len(),
                    self.max_file_size
                ),
            ));
        }

        let bytes = tokio::fs::read(&resolved)
            .await
            .map_err(|e| ToolError::from_io(NAME, path, &e))?;
        let content =
            String::from_utf8(bytes).map_err(|_| ToolError::InvalidEncoding(path.to_string()))?;

        tracing::debug!(path, bytes = content.len(), "Read file");
        Ok(Value::String(content))
    }

    fn fs_targets(&self, arguments: &Value) -> Option<Vec<PathBuf>> {
        crate::resolve_target(&self.workspace, arguments, "path", None)
    }
}
