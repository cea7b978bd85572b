//! Known repositories of a workspace and target selection.

use std::path::{Path, PathBuf};

use git2::Repository;
use tracing::debug;

/// A git repository, identified by its working tree root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHandle {
    root: PathBuf,
}

impl RepositoryHandle {
    /// Find the repository containing `path`, if any.
    ///
    /// Bare repositories have no working tree and are skipped.
    pub fn discover(path: &Path) -> Option<Self> {
        let repo = Repository::discover(path).ok()?;
        let workdir = repo.workdir()?;
        Some(Self {
            root: canonical(workdir),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Folders the user is working in and the repositories found there.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    roots: Vec<PathBuf>,
    repositories: Vec<RepositoryHandle>,
}

impl Workspace {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        let mut repositories: Vec<RepositoryHandle> = Vec::new();
        for root in &roots {
            match RepositoryHandle::discover(root) {
                Some(handle) if !repositories.contains(&handle) => {
                    debug!("Found repository at {}", handle.root().display());
                    repositories.push(handle);
                }
                Some(_) => {}
                None => debug!("No repository at {}", root.display()),
            }
        }
        Self {
            roots,
            repositories,
        }
    }

    /// Workspace rooted at the current directory.
    pub fn from_current_dir() -> std::io::Result<Self> {
        Ok(Self::new(vec![std::env::current_dir()?]))
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn repositories(&self) -> &[RepositoryHandle] {
        &self.repositories
    }

    /// Pick the repository a trigger refers to.
    ///
    /// A `trigger_root` inside a known repository selects that repository;
    /// anything else falls back to the first known one.
    pub fn resolve_repository(&self, trigger_root: Option<&Path>) -> Option<&RepositoryHandle> {
        if let Some(root) = trigger_root {
            let root = canonical(root);
            // Nested repositories: the deepest root wins.
            let matched = self
                .repositories
                .iter()
                .filter(|repo| root.starts_with(repo.root()))
                .max_by_key(|repo| repo.root().components().count());
            if matched.is_some() {
                return matched;
            }
            debug!(
                "{} is not a known repository; using the first one",
                root.display()
            );
        }
        self.repositories.first()
    }
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
