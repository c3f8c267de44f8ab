//! Built-in tool implementations for toolpilot.
//!
//! Four file-system tools, all confined to one [`Workspace`]:
//! `read_file`, `write_file`, `edit_file`, and `list_files`.

pub mod edit_file;
pub mod list_files;
pub mod read_file;
pub mod write_file;

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use toolpilot_core::error::ToolError;
use toolpilot_core::tool::{SchemaPolicy, ToolRegistry};
use toolpilot_security::Workspace;

pub use edit_file::EditFileTool;
pub use list_files::ListFilesTool;
pub use read_file::ReadFileTool;
pub use write_file::WriteFileTool;

/// Create a registry with all built-in tools.
///
/// Registration order is the order the model sees them in.
pub fn default_registry(
    workspace: Arc<Workspace>,
    max_file_size: u64,
    policy: SchemaPolicy,
) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::with_policy(policy);
    registry.register(ReadFileTool::new(Arc::clone(&workspace), max_file_size).spec())?;
    registry.register(ListFilesTool::new(Arc::clone(&workspace)).spec())?;
    registry.register(EditFileTool::new(Arc::clone(&workspace)).spec())?;
    registry.register(WriteFileTool::new(workspace).spec())?;
    Ok(registry)
}

/// Resolve the path argument `key` for dispatch planning.
///
/// `None` when the argument is missing or the path would be rejected; the
/// call then runs alone and reports its own error.
pub(crate) fn resolve_target(
    workspace: &Workspace,
    arguments: &Value,
    key: &str,
    default: Option<&str>,
) -> Option<Vec<PathBuf>> {
    let path = arguments.get(key).and_then(Value::as_str).or(default)?;
    workspace.resolve(path).ok().map(|p| vec![p])
}
