//! Path validation: filesystem sandboxing to the workspace directory.
//!
//! Ensures file tools can only access paths inside the workspace root and
//! blocks access to forbidden paths (e.g., `.git`, ~/.ssh).

use std::path::{Component, Path, PathBuf};

use toolpilot_core::ToolError;

/// Error returned when path validation fails.
#[derive(Debug, thiserror::Error)]
pub enum PathValidationError {
    #[error("Path '{path}' is outside the workspace")]
    OutsideWorkspace { path: String },

    #[error("Path '{path}' matches forbidden pattern '{pattern}'")]
    ForbiddenPath { path: String, pattern: String },

    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Failed to canonicalize path '{path}': {reason}")]
    CanonicalizeFailed { path: String, reason: String },
}

impl From<PathValidationError> for ToolError {
    fn from(err: PathValidationError) -> Self {
        ToolError::SandboxViolation(err.to_string())
    }
}

/// The directory tools operate in.
///
/// Every path a tool receives is resolved against `root` and must stay
/// inside it after symlinks are followed.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    forbidden: Vec<(String, PathBuf)>,
}

impl Workspace {
    /// Open a workspace rooted at an existing directory.
    ///
    /// Relative forbidden patterns are taken relative to the root; `~` is
    /// expanded to the home directory.
    pub fn new(
        root: impl AsRef<Path>,
        forbidden_paths: &[String],
    ) -> Result<Self, PathValidationError> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .map_err(|e| PathValidationError::CanonicalizeFailed {
                path: root.display().to_string(),
                reason: e.to_string(),
            })?;

        let forbidden = forbidden_paths
            .iter()
            .map(|pattern| {
                let expanded = PathBuf::from(expand_tilde(pattern));
                let absolute = if expanded.is_absolute() {
                    expanded
                } else {
                    root.join(expanded)
                };
                // Canonicalize when possible so /var vs /private/var style
                // aliases still match.
                let absolute = absolute.canonicalize().unwrap_or(absolute);
                (pattern.clone(), absolute)
            })
            .collect();

        Ok(Self { root, forbidden })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a tool-supplied path to an absolute path inside the root.
    ///
    /// Checks:
    /// 1. No `..` components
    /// 2. Symlinks and relative components resolved through the nearest
    ///    existing ancestor (the target itself may not exist yet)
    /// 3. Result is within the workspace root
    /// 4. Result is not under a forbidden path
    pub fn resolve(&self, path: &str) -> Result<PathBuf, PathValidationError> {
        let raw = if path.trim().is_empty() { "." } else { path };
        let input = Path::new(raw);

        if input.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(PathValidationError::PathTraversal { path: path.into() });
        }

        let joined = if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.root.join(input)
        };
        let canonical = canonicalize_lenient(&joined).map_err(|e| {
            PathValidationError::CanonicalizeFailed {
                path: path.into(),
                reason: e.to_string(),
            }
        })?;

        if !within_root(&canonical, &self.root) {
            tracing::warn!(path, "Rejected path outside workspace");
            return Err(PathValidationError::OutsideWorkspace { path: path.into() });
        }

        if let Some((pattern, _)) = self
            .forbidden
            .iter()
            .find(|(_, forbidden)| starts_with_ci(&canonical, forbidden))
        {
            tracing::warn!(path, pattern = %pattern, "Rejected forbidden path");
            return Err(PathValidationError::ForbiddenPath {
                path: path.into(),
                pattern: pattern.clone(),
            });
        }

        Ok(canonical)
    }

    /// Whether an already-resolved path falls under a forbidden pattern.
    pub fn is_forbidden(&self, path: &Path) -> bool {
        self.forbidden
            .iter()
            .any(|(_, forbidden)| starts_with_ci(path, forbidden))
    }
}

/// Canonicalize the longest existing prefix of `path` and append the rest.
fn canonicalize_lenient(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path.to_path_buf();
    let mut rest: Vec<std::ffi::OsString> = Vec::new();

    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent.to_path_buf();
            }
            _ => break,
        }
    }

    let mut canonical = existing.canonicalize()?;
    for name in rest.into_iter().rev() {
        canonical.push(name);
    }
    Ok(canonical)
}

/// Root containment on the canonical path. Case is folded only on Windows,
/// where the filesystem folds it too.
fn within_root(path: &Path, root: &Path) -> bool {
    #[cfg(windows)]
    {
        starts_with_ci(path, root)
    }
    #[cfg(not(windows))]
    {
        path.starts_with(root)
    }
}

/// Component-wise, case-insensitive prefix check.
///
/// Used for forbidden paths, where matching too much is the safe side.
fn starts_with_ci(path: &Path, prefix: &Path) -> bool {
    let mut path_components = path.components();
    prefix.components().all(|p| {
        path_components.next().is_some_and(|c| {
            c.as_os_str()
                .to_string_lossy()
                .eq_ignore_ascii_case(&p.as_os_str().to_string_lossy())
        })
    })
}

/// Expand ~ to the user's home directory.
fn expand_tilde(path: &str) -> String {
    if (path.starts_with("~/") || path == "~")
        && let Ok(home) = home_dir()
    {
        return path.replacen('~', &home, 1);
    }
    path.to_string()
}

fn home_dir() -> Result<String, std::env::VarError> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
    }
}
