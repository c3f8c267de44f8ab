//! Deciding how one batch of tool calls is run.

use std::path::{Path, PathBuf};
use toolpilot_config::DispatchPolicy;
use toolpilot_core::tool::{ToolCallRequest, ToolRegistry};

/// How a batch will actually be executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    Sequential,
    Concurrent,
}

/// Pick the execution mode for `requests`.
///
/// Concurrency needs the policy to allow it, every call to declare its
/// filesystem targets, and no two calls to touch the same path or a parent
/// of one another.
pub fn plan(
    policy: DispatchPolicy,
    registry: &ToolRegistry,
    requests: &[ToolCallRequest],
) -> DispatchMode {
    if policy == DispatchPolicy::Sequential || requests.len() < 2 {
        return DispatchMode::Sequential;
    }

    let mut claimed: Vec<Vec<PathBuf>> = Vec::with_capacity(requests.len());
    for request in requests {
        let Ok(spec) = registry.lookup(&request.tool_name) else {
            return DispatchMode::Sequential;
        };
        let Some(targets) = spec.handler.fs_targets(&request.arguments) else {
            return DispatchMode::Sequential;
        };
        if claimed
            .iter()
            .flatten()
            .any(|seen| targets.iter().any(|t| overlaps(seen, t)))
        {
            return DispatchMode::Sequential;
        }
        claimed.push(targets);
    }

    DispatchMode::Concurrent
}

fn overlaps(a: &Path, b: &Path) -> bool {
    a.starts_with(b) || b.starts_with(a)
}
