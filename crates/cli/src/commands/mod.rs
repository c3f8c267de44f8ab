//! CLI subcommands.

pub mod chat;
pub mod init;
pub mod tools;

use std::path::PathBuf;
use std::sync::Arc;
use toolpilot_config::AppConfig;
use toolpilot_core::tool::ToolRegistry;
use toolpilot_security::Workspace;

/// Flags shared by every subcommand.
#[derive(Debug, Default)]
pub struct GlobalArgs {
    pub config: Option<PathBuf>,
    pub workspace: Option<PathBuf>,
    pub model: Option<String>,
}

impl GlobalArgs {
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(AppConfig::config_path)
    }
}

/// Load the config file and environment, then apply command-line overrides.
pub fn load_config(globals: &GlobalArgs) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let path = globals.config_path();
    let mut config = AppConfig::load_with_env(&path)
        .map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(model) = &globals.model {
        config.model = model.clone();
    }
    if let Some(root) = &globals.workspace {
        config.workspace.root = Some(root.clone());
    }

    tracing::debug!(
        config = %path.display(),
        provider = %config.provider,
        model = %config.model,
        "Configuration loaded"
    );
    Ok(config)
}

/// Open the workspace and register the built-in tools against it.
pub fn build_registry(config: &AppConfig) -> Result<Arc<ToolRegistry>, Box<dyn std::error::Error>> {
    let workspace = Workspace::new(config.workspace_root(), &config.workspace.forbidden_paths)?;
    let registry = toolpilot_tools::default_registry(
        Arc::new(workspace),
        config.workspace.max_file_size_bytes,
        config.agent.schema_policy,
    )?;
    Ok(Arc::new(registry))
}
