//! Repository discovery (git2) and staged diff retrieval (git executable).

pub mod diff;
pub mod repo;

pub use diff::{DiffResult, DiffSource, GitDiffSource, NO_CHANGES_STAGED};
pub use repo::{RepositoryHandle, Workspace};
