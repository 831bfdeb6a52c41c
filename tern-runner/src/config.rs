//! Runner configuration
//!
//! Defines where runs keep their fetched sources and which external tools
//! drive source retrieval and containers.

use std::path::PathBuf;

/// Runner configuration
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Base directory for run-scoped working directories (e.g. /tmp/tern)
    pub workspace_base: PathBuf,

    /// Container engine CLI (`podman`, or a CLI-compatible `docker`)
    pub container_engine: String,

    /// Git binary used to fetch sources
    pub git_binary: String,

    /// Working directory inside step containers where the source tree is mounted
    pub container_workdir: String,

    /// Keep working directories after a run finishes (useful for debugging)
    pub keep_workspaces: bool,
}

impl RunnerConfig {
    /// Creates a new configuration with defaults
    pub fn new(workspace_base: PathBuf) -> Self {
        Self {
            workspace_base,
            container_engine: "podman".to_string(),
            git_binary: "git".to_string(),
            container_workdir: "/app".to_string(),
            keep_workspaces: false,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// All variables are optional:
    /// - TERN_WORKSPACE_BASE (default: /tmp/tern)
    /// - TERN_CONTAINER_ENGINE (default: podman)
    /// - TERN_GIT_BINARY (default: git)
    /// - TERN_CONTAINER_WORKDIR (default: /app)
    /// - TERN_KEEP_WORKSPACES (default: false)
    pub fn from_env() -> anyhow::Result<Self> {
        let mut config = Self::default();

        if let Ok(base) = std::env::var("TERN_WORKSPACE_BASE") {
            config.workspace_base = PathBuf::from(base);
        }

        if let Ok(engine) = std::env::var("TERN_CONTAINER_ENGINE") {
            config.container_engine = engine;
        }

        if let Ok(git) = std::env::var("TERN_GIT_BINARY") {
            config.git_binary = git;
        }

        if let Ok(workdir) = std::env::var("TERN_CONTAINER_WORKDIR") {
            config.container_workdir = workdir;
        }

        if let Ok(keep) = std::env::var("TERN_KEEP_WORKSPACES") {
            config.keep_workspaces = parse_flag(&keep).ok_or_else(|| {
                anyhow::anyhow!("TERN_KEEP_WORKSPACES must be a boolean, got '{}'", keep)
            })?;
        }

        Ok(config)
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workspace_base.as_os_str().is_empty() {
            anyhow::bail!("workspace_base cannot be empty");
        }

        if self.container_engine.trim().is_empty() {
            anyhow::bail!("container_engine cannot be empty");
        }

        if self.git_binary.trim().is_empty() {
            anyhow::bail!("git_binary cannot be empty");
        }

        if !self.container_workdir.starts_with('/') {
            anyhow::bail!("container_workdir must be an absolute path");
        }

        Ok(())
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("/tmp/tern"))
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
