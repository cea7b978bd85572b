//! Staged diff retrieval via `git diff --staged`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::DiffError;

use super::{RepositoryHandle, Workspace};

/// Diff text reported when nothing is staged.
pub const NO_CHANGES_STAGED: &str = "No changes staged.";

/// Outcome of one diff retrieval.
///
/// When `error` is set the retrieval failed and `diff` is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffResult {
    pub diff: String,
    pub error: Option<String>,
}

impl DiffResult {
    pub fn ok(diff: impl Into<String>) -> Self {
        Self {
            diff: diff.into(),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            diff: String::new(),
            error: Some(message.into()),
        }
    }

    /// True when the diff holds actual staged changes.
    pub fn has_changes(&self) -> bool {
        self.error.is_none() && !self.diff.trim().is_empty() && self.diff != NO_CHANGES_STAGED
    }
}

/// Source of the staged diff for a repository.
///
/// Failures are reported inside the [`DiffResult`], never as a panic or
/// separate error channel.
#[async_trait]
pub trait DiffSource: Send + Sync {
    async fn staged_diff(
        &self,
        repo: Option<&RepositoryHandle>,
        workspace: &Workspace,
    ) -> DiffResult;
}

/// Runs the `git` executable found on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct GitDiffSource;

impl GitDiffSource {
    pub fn new() -> Self {
        Self
    }
}

/// Directory to run git in: the repository root, else the first workspace root.
fn working_dir(
    repo: Option<&RepositoryHandle>,
    workspace: &Workspace,
) -> Result<PathBuf, DiffError> {
    repo.map(|r| r.root().to_path_buf())
        .or_else(|| workspace.roots().first().cloned())
        .ok_or(DiffError::NoWorkspaceFound)
}

async fn run_git_diff(dir: &Path) -> Result<String, DiffError> {
    if which::which("git").is_err() {
        return Err(DiffError::GitNotInstalled);
    }

    let output = Command::new("git")
        .args(["diff", "--staged"])
        .current_dir(dir)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(DiffError::SpawnFailed)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let code = output.status.code().unwrap_or(-1);
        return Err(DiffError::NonZeroExit { code, stderr });
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[async_trait]
impl DiffSource for GitDiffSource {
    async fn staged_diff(
        &self,
        repo: Option<&RepositoryHandle>,
        workspace: &Workspace,
    ) -> DiffResult {
        let result = match working_dir(repo, workspace) {
            Ok(dir) => {
                debug!("Running git diff --staged in {}", dir.display());
                run_git_diff(&dir).await
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(diff) if diff.trim().is_empty() => DiffResult::ok(NO_CHANGES_STAGED),
            Ok(diff) => DiffResult::ok(diff),
            Err(e) => {
                warn!("Failed to get staged diff: {}", e);
                DiffResult::failed(e.to_string())
            }
        }
    }
}
