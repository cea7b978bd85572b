//! ai-commit - Generate commit messages for staged changes with an LLM.
//!
//! # Overview
//!
//! ai-commit reads the staged diff of a git repository, builds a chat prompt
//! that asks for a conventional (optionally gitmoji-annotated) commit message,
//! sends it to an OpenAI-compatible endpoint or Gemini, and writes the answer
//! into the commit message file or stdout.

pub mod commands;
pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod llm;

// Re-export commonly used types
pub use commit::{CommitMessageGenerator, GenerateTrigger, PromptSettings, build_prompt};
pub use config::{ConfigKey, ConfigStore, Settings};
pub use error::{
    ConfigError, DiffError, GenerateError, ModelsError, NotificationAction, ProviderError,
};
pub use git::{DiffResult, DiffSource, GitDiffSource, RepositoryHandle, Workspace};
pub use llm::{ChatMessage, CompletionProvider, Provider, Role};
