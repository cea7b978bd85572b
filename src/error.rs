//! Error types for ai-commit modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

use crate::llm::Provider;

/// Errors from reading or writing settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("No configuration directory available on this platform. Pass --config <PATH> instead.")]
    NoConfigDir,

    #[error("Failed to read settings file {}: {source}", path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file {}: {reason}", path.display())]
    ParseFailed { path: PathBuf, reason: String },

    #[error("Failed to write settings file {}: {reason}", path.display())]
    WriteFailed { path: PathBuf, reason: String },

    #[error("Unknown setting '{0}'. Run `ai-commit config keys` to list valid settings.")]
    UnknownKey(String),

    #[error("Invalid value '{value}' for {key}: expected {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("Failed to launch editor '{editor}': {source}")]
    EditorFailed {
        editor: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from computing the staged diff.
///
/// These never cross the diff source boundary as `Err`; they are rendered
/// into `DiffResult::error`.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("No workspace folder found")]
    NoWorkspaceFound,

    #[error("git executable not found in PATH")]
    GitNotInstalled,

    #[error("Failed to run git: {0}")]
    SpawnFailed(#[source] std::io::Error),

    #[error("git diff exited with code {code}: {stderr}")]
    NonZeroExit { code: i32, stderr: String },
}

/// Errors from LLM provider calls.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("The {0} API key is missing or empty. Set {setting} in the settings file or the {env} environment variable.", setting = .0.api_key_setting(), env = .0.api_key_env())]
    MissingCredential(Provider),

    #[error("{provider} API returned status {status}: {message}")]
    Api {
        provider: Provider,
        status: u16,
        message: String,
    },

    #[error("Request to {provider} failed: {source}")]
    Transport {
        provider: Provider,
        #[source]
        source: reqwest::Error,
    },

    #[error("{0} returned an empty completion")]
    EmptyCompletion(Provider),

    #[error("{provider} returned an unexpected response: {reason}")]
    InvalidResponse { provider: Provider, reason: String },

    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: Provider,
        operation: &'static str,
    },
}

impl ProviderError {
    /// HTTP status attached to the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProviderError::Api { status, .. } => Some(*status),
            ProviderError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Errors from fetching or caching the available-model list.
#[derive(Error, Debug)]
pub enum ModelsError {
    #[error("Failed to fetch models: {0}")]
    Fetch(#[from] ProviderError),

    #[error("Failed to read model cache {}: {reason}", path.display())]
    CacheRead { path: PathBuf, reason: String },

    #[error("Failed to write model cache {}: {reason}", path.display())]
    CacheWrite { path: PathBuf, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Actions offered next to a failure notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationAction {
    Retry,
    OpenSettings,
}

impl NotificationAction {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationAction::Retry => "Retry",
            NotificationAction::OpenSettings => "Configure",
        }
    }
}

/// Failures of one commit message generation, classified for the user.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("No git repository found. Run ai-commit inside a git repository or pass --repo.")]
    RepoNotFound,

    #[error("{0} API key not configured")]
    MissingCredential(Provider),

    #[error("Failed to get staged changes: {0}")]
    DiffRetrievalFailed(String),

    #[error("No changes staged for commit")]
    NothingStaged,

    #[error("Invalid API key or unauthorized access")]
    Unauthorized,

    #[error("Rate limit exceeded. Please try again later")]
    RateLimited,

    #[error("The AI provider reported a server error. Please try again later")]
    ServerError,

    #[error("The AI provider is temporarily unavailable")]
    ServiceUnavailable,

    #[error("Failed to generate commit message: the provider returned no content")]
    EmptyCompletion,

    #[error("An unexpected error occurred")]
    UnknownCompletionError,

    #[error("A commit message is already being generated")]
    AlreadyRunning,

    #[error("Unable to write the commit message: {0}")]
    WriteFailed(String),

    #[error("Failed to load settings: {0}")]
    Settings(#[from] ConfigError),
}

impl GenerateError {
    /// Benign outcomes are reported, but are not failures of the tool.
    pub fn is_benign(&self) -> bool {
        matches!(self, GenerateError::NothingStaged | GenerateError::AlreadyRunning)
    }

    /// Actions offered to the user alongside this error.
    pub fn actions(&self) -> &'static [NotificationAction] {
        match self {
            GenerateError::NothingStaged | GenerateError::AlreadyRunning => &[],
            _ => &[NotificationAction::Retry, NotificationAction::OpenSettings],
        }
    }
}
