//! File edit tool: create, overwrite, or patch a single occurrence.
//!
//! Modes, picked from the file state and `old_str`:
//! - file missing: create it with `new_str` (parents created, `old_str` ignored)
//! - `old_str` empty or absent: overwrite with `new_str`
//! - otherwise: replace exactly one occurrence of `old_str`; zero or several
//!   matches is an error and the file is left untouched

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use toolpilot_core::error::ToolError;
use toolpilot_core::tool::{InputSchema, ParamKind, ToolArgs, ToolHandler, ToolSpec};
use toolpilot_security::Workspace;

pub const NAME: &str = "edit_file";

pub struct EditFileTool {
    workspace: Arc<Workspace>,
}

impl EditFileTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self { workspace }
    }

    pub fn spec(self) -> ToolSpec {
        ToolSpec::new(
            NAME,
            "Create/overwrite or edit a text file.\n\
             - If the file does not exist: create it with new_str (old_str is ignored).\n\
             - If the file exists and old_str is empty/missing: overwrite with new_str.\n\
             - If the file exists and old_str is provided: replace exactly ONE occurrence.",
            InputSchema::new()
                .required("path", ParamKind::String, "Relative path from the workspace root.")
                .required("new_str", ParamKind::String, "Text to replace old_str with")
                .optional(
                    "old_str",
                    ParamKind::String,
                    "Text to replace (optional, only needed if editing)",
                ),
            Arc::new(self),
        )
    }
}

#[async_trait]
impl ToolHandler for EditFileTool {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let path = args.require_str("path")?;
        let new_str = args.require_str("new_str")?;
        let old_str = args.opt_str("old_str").unwrap_or_default();
        let resolved = self.workspace.resolve(path)?;

        let existing = match tokio::fs::read(&resolved).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(ToolError::from_io(NAME, path, &e)),
        };

        let Some(bytes) = existing else {
            if let Some(parent) = resolved.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ToolError::from_io(NAME, path, &e))?;
            }
            write(&resolved, path, new_str).await?;
            tracing::debug!(path, "Created file");
            return Ok(Value::String(format!("Created {path}")));
        };

        if old_str.is_empty() {
            write(&resolved, path, new_str).await?;
            tracing::debug!(path, "Overwrote file");
            return Ok(Value::String(format!("File {path} overwritten.")));
        }

        let content =
            String::from_utf8(bytes).map_err(|_| ToolError::InvalidEncoding(path.to_string()))?;
        match content.matches(old_str).count() {
            0 => Err(ToolError::failed(
                NAME,
                format!("old_str not found in {path}"),
            )),
            1 => {
                let updated = content.replacen(old_str, new_str, 1);
                write(&resolved, path, &updated).await?;
                tracing::debug!(path, "Replaced one occurrence");
                Ok(Value::String(format!("Edited {path}")))
            }
            n => Err(ToolError::failed(
                NAME,
                format!("old_str matches {n} times in {path}; include more context to make it unique"),
            )),
        }
    }

    fn fs_targets(&self, arguments: &Value) -> Option<Vec<PathBuf>> {
        crate::resolve_target(&self.workspace, arguments, "path", None)
    }
}

async fn write(resolved: &std::path::Path, path: &str, content: &str) -> Result<(), ToolError> {
    tokio::fs::write(resolved, content)
        .await
        .map_err(|e| ToolError::from_io(NAME, path, &e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{args, workspace};

    #[tokio::test]
    async fn missing_file_is_created() {
        let (dir, ws) = workspace();
        let tool = EditFileTool::new(ws);
        let output = tool
            .call(args(
                NAME,
                serde_json::json!({"path": "pkg/new.txt", "new_str": "fresh", "old_str": "ignored"}),
            ))
            .await
            .unwrap();
        assert_eq!(output, Value::String("Created pkg/new.txt".into()));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("pkg/new.txt")).unwrap(),
            "fresh"
        );
    }

    #[tokio::test]
    async fn empty_old_str_overwrites() {
        let (dir, ws) = workspace();
        std::fs::write(dir.path().join("a.txt"), "old body").unwrap();
        let tool = EditFileTool::new(ws);
        tool.call(args(NAME, serde_json::json!({"path": "a.txt", "new_str": "new body"})))
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "new body"
        );
    }

    #[tokio::test]
    async fn single_occurrence_replaced() {
        let (dir, ws) = workspace();
        std::fs::write(dir.path().join("main.rs"), "fn main() { old(); }").unwrap();
        let tool = EditFileTool::new(ws);
        let output = tool
            .call(args(
                NAME,
                serde_json::json!({"path": "main.rs", "old_str": "old()", "new_str": "new()"}),
            ))
            .await
            .unwrap();
        assert_eq!(output, Value::String("Edited main.rs".into()));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("main.rs")).unwrap(),
            "fn main() { new(); }"
        );
    }

    #[tokio::test]
    async fn no_match_is_error_and_file_untouched() {
        let (dir, ws) = workspace();
        std::fs::write(dir.path().join("a.txt"), "abc").unwrap();
        let tool = EditFileTool::new(ws);
        let err = tool
            .call(args(
                NAME,
                serde_json::json!({"path": "a.txt", "old_str": "xyz", "new_str": "q"}),
            ))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "abc");
    }

    #[tokio::test]
    async fn ambiguous_match_is_error() {
        let (dir, ws) = workspace();
        std::fs::write(dir.path().join("a.txt"), "x x x").unwrap();
        let tool = EditFileTool::new(ws);
        let err = tool
            .call(args(
                NAME,
                serde_json::json!({"path": "a.txt", "old_str": "x", "new_str": "y"}),
            ))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("matches 3 times"));
        assert_eq!(std::fs::read_to_string(dir.path().join("a.txt")).unwrap(), "x x x");
    }
}
