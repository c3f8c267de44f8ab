//! Directory listing tool: recursive, sorted, relative paths.

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use toolpilot_core::error::ToolError;
use toolpilot_core::tool::{InputSchema, ParamKind, ToolArgs, ToolHandler, ToolSpec};
use toolpilot_security::Workspace;
use walkdir::WalkDir;

pub const NAME: &str = "list_files";

/// Default cap on returned entries.
pub const MAX_ENTRIES: usize = 5000;

pub struct ListFilesTool {
    workspace: Arc<Workspace>,
    max_entries: usize,
}

impl ListFilesTool {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self {
            workspace,
            max_entries: MAX_ENTRIES,
        }
    }

    /// Cap the listing at `max` entries. Anything past the cap is replaced
    /// by a single truncation marker.
    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn spec(self) -> ToolSpec {
        ToolSpec::new(
            NAME,
            "Recursively list files in a directory. Paths are relative to that directory; \
             directories end with '/'.",
            InputSchema::new().optional(
                "directory",
                ParamKind::String,
                "Directory path, relative to the workspace root (default: \".\")",
            ),
            Arc::new(self),
        )
    }
}

#[async_trait]
impl ToolHandler for ListFilesTool {
    async fn call(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let directory = args.opt_str("directory").unwrap_or(".").to_string();
        let base = self.workspace.resolve(&directory)?;

        match tokio::fs::metadata(&base).await {
            Ok(meta) if meta.is_dir() => {}
            Ok(_) => {
                return Err(ToolError::failed(
                    NAME,
                    format!("{directory} is not a directory"),
                ));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::NotFound(directory));
            }
            Err(e) => return Err(ToolError::from_io(NAME, &directory, &e)),
        }

        let workspace = Arc::clone(&self.workspace);
        let mut entries = tokio::task::spawn_blocking(move || walk(&workspace, &base))
            .await
            .map_err(|e| ToolError::failed(NAME, e))?;

        let total = entries.len();
        if total > self.max_entries {
            tracing::warn!(
                directory = %directory,
                total,
                shown = self.max_entries,
                "Listing truncated"
            );
            entries.truncate(self.max_entries);
            entries.push(truncation_marker(self.max_entries, total));
        } else {
            tracing::debug!(directory = %directory, entries = total, "Listed files");
        }
        Ok(Value::Array(entries.into_iter().map(Value::String).collect()))
    }

    fn fs_targets(&self, arguments: &Value) -> Option<Vec<PathBuf>> {
        crate::resolve_target(&self.workspace, arguments, "directory", Some("."))
    }
}

fn truncation_marker(shown: usize, total: usize) -> String {
    format!("[truncated: showing {shown} of {total} entries]")
}

/// Every visible entry under `base`, sorted.
fn walk(workspace: &Workspace, base: &std::path::Path) -> Vec<String> {
    let mut entries: Vec<String> = WalkDir::new(base)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !workspace.is_forbidden(e.path()))
        .filter_map(|e| e.ok())
        .filter_map(|entry| {
            let rel = entry.path().strip_prefix(base).ok()?;
            let mut rel = rel.to_string_lossy().replace('\\', "/");
            if entry.file_type().is_dir() {
                rel.push('/');
            }
            Some(rel)
        })
        .collect();
    entries.sort();
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{args, workspace};

    #[tokio::test]
    async fn lists_flat_directory_sorted() {
        let (dir, ws) = workspace();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();

        let tool = ListFilesTool::new(ws);
        let output = tool
            .call(args(NAME, serde_json::json!({"directory": "."})))
            .await
            .unwrap();
        assert_eq!(output, serde_json::json!(["a.txt", "b.txt"]));
    }

    #[tokio::test]
    async fn recursive_with_directory_suffix() {
        let (dir, ws) = workspace();
        std::fs::create_dir_all(dir.path().join("src/bin")).unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        std::fs::write(dir.path().join("src/bin/cli.rs"), "").unwrap();

        let tool = ListFilesTool::new(ws);
        let output = tool.call(args(NAME, serde_json::json!({}))).await.unwrap();
        assert_eq!(
            output,
            serde_json::json!(["src/", "src/bin/", "src/bin/cli.rs", "src/lib.rs"])
        );
    }

    #[tokio::test]
    async fn subdirectory_paths_are_relative_to_it() {
        let (dir, ws) = workspace();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/guide.md"), "").unwrap();

        let tool = ListFilesTool::new(ws);
        let output = tool
            .call(args(NAME, serde_json::json!({"directory": "docs"})))
            .await
            .unwrap();
        assert_eq!(output, serde_json::json!(["guide.md"]));
    }

    #[tokio::test]
    async fn forbidden_entries_are_hidden() {
        let (dir, _) = workspace();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        let ws = Arc::new(Workspace::new(dir.path(), &[".git".into()]).unwrap());

        let tool = ListFilesTool::new(ws);
        let output = tool.call(args(NAME, serde_json::json!({}))).await.unwrap();
        assert_eq!(output, serde_json::json!(["a.txt"]));
    }

    #[tokio::test]
    async fn truncation_keeps_first_sorted_entries() {
        let (dir, ws) = workspace();
        for name in ["e.txt", "c.txt", "a.txt", "d.txt", "b.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let tool = ListFilesTool::new(ws).with_max_entries(2);
        let output = tool.call(args(NAME, serde_json::json!({}))).await.unwrap();
        assert_eq!(
            output,
            serde_json::json!([
                "a.txt",
                "b.txt",
                "[truncated: showing 2 of 5 entries]"
            ])
        );
    }

    #[tokio::test]
    async fn listing_at_cap_has_no_marker() {
        let (dir, ws) = workspace();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        std::fs::write(dir.path().join("b.txt"), "").unwrap();

        let tool = ListFilesTool::new(ws).with_max_entries(2);
        let output = tool.call(args(NAME, serde_json::json!({}))).await.unwrap();
        assert_eq!(output, serde_json::json!(["a.txt", "b.txt"]));
    }

    #[tokio::test]
    async fn missing_directory_is_not_found() {
        let (_dir, ws) = workspace();
        let tool = ListFilesTool::new(ws);
        let err = tool
            .call(args(NAME, serde_json::json!({"directory": "nope"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "file not found: nope");
    }

    #[tokio::test]
    async fn empty_directory_is_empty_array() {
        let (_dir, ws) = workspace();
        let tool = ListFilesTool::new(ws);
        let output = tool.call(args(NAME, serde_json::json!({}))).await.unwrap();
        assert_eq!(output, serde_json::json!([]));
    }
}
