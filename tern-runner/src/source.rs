//! Source retrieval
//!
//! Fetches a branch of a project's repository into a run-scoped working
//! directory.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git clone exited with {status}: {output}")]
    CloneFailed { status: String, output: String },
}

/// Fetches source code at a given ref
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Fetches `branch` of `repo` into `dest`
    ///
    /// `dest` must not exist yet. Returns the fetch tool's combined output.
    async fn fetch_branch(&self, repo: &str, branch: &str, dest: &Path)
    -> Result<String, FetchError>;
}

/// Fetches sources with `git clone`
pub struct GitFetcher {
    git: String,
}

impl GitFetcher {
    pub fn new(git: impl Into<String>) -> Self {
        Self { git: git.into() }
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch_branch(
        &self,
        repo: &str,
        branch: &str,
        dest: &Path,
    ) -> Result<String, FetchError> {
        debug!("Cloning {} (branch {}) into {}", repo, branch, dest.display());

        let output = Command::new(&self.git)
            .arg("clone")
            .arg("--branch")
            .arg(branch)
            .arg("--single-branch")
            .arg("--")
            .arg(repo)
            .arg(dest)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| FetchError::Spawn {
                program: self.git.clone(),
                source: e,
            })?;

        let combined = combine_output(&output.stdout, &output.stderr);

        if !output.status.success() {
            return Err(FetchError::CloneFailed {
                status: output.status.to_string(),
                output: combined,
            });
        }

        Ok(combined)
    }
}

fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);

    [stdout.trim(), stderr.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
