//! Commit message generation pipeline.
//!
//! One run resolves the repository, checks the credential, fetches the
//! staged diff, builds the prompt, asks the provider, and writes the result
//! into the commit input. Every failure is classified into a
//! [`GenerateError`] here and nowhere else.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::config::ConfigStore;
use crate::error::{GenerateError, ProviderError};
use crate::git::{DiffSource, Workspace};
use crate::llm::ProviderFactory;

use super::input::CommitInput;
use super::prompt::{PromptSettings, build_prompt};

/// Pipeline phase, reported to a [`ProgressSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    ResolvingRepo,
    CheckingCredential,
    FetchingDiff,
    BuildingPrompt,
    AwaitingCompletion,
    Writing,
    Done,
    Failed,
}

impl Phase {
    /// User-facing progress text, for the phases that have one.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            Phase::FetchingDiff => Some("Getting staged changes..."),
            Phase::BuildingPrompt => Some("Analyzing changes..."),
            Phase::AwaitingCompletion => Some("Generating commit message..."),
            _ => None,
        }
    }
}

/// Observer of pipeline progress. Purely informational.
pub trait ProgressSink: Send + Sync {
    fn report(&self, phase: Phase);
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _phase: Phase) {}
}

/// What started a generation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateTrigger {
    /// Repository the user invoked the command for, if known.
    pub repository_root: Option<PathBuf>,
}

impl GenerateTrigger {
    pub fn for_repository(root: impl Into<PathBuf>) -> Self {
        Self {
            repository_root: Some(root.into()),
        }
    }
}

/// Map an HTTP status from a failed completion to a user-facing category.
pub fn classify_status(status: Option<u16>) -> GenerateError {
    match status {
        Some(401) => GenerateError::Unauthorized,
        Some(429) => GenerateError::RateLimited,
        Some(500) => GenerateError::ServerError,
        Some(503) => GenerateError::ServiceUnavailable,
        _ => GenerateError::UnknownCompletionError,
    }
}

/// Classify a provider failure.
pub fn classify_provider_error(err: &ProviderError) -> GenerateError {
    match err {
        ProviderError::MissingCredential(provider) => GenerateError::MissingCredential(*provider),
        ProviderError::EmptyCompletion(_) => GenerateError::EmptyCompletion,
        other => classify_status(other.status()),
    }
}

/// Clears the in-flight flag when a run ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Generates commit messages for the repositories of one workspace.
pub struct CommitMessageGenerator {
    store: Arc<ConfigStore>,
    workspace: Workspace,
    diff_source: Arc<dyn DiffSource>,
    providers: Arc<dyn ProviderFactory>,
    progress: Arc<dyn ProgressSink>,
    in_flight: AtomicBool,
}

impl CommitMessageGenerator {
    pub fn new(
        store: Arc<ConfigStore>,
        workspace: Workspace,
        diff_source: Arc<dyn DiffSource>,
        providers: Arc<dyn ProviderFactory>,
    ) -> Self {
        Self {
            store,
            workspace,
            diff_source,
            providers,
            progress: Arc::new(NoProgress),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Generate a message for the staged changes and write it into `input`.
    ///
    /// A second call while one is running fails with
    /// [`GenerateError::AlreadyRunning`]. On any failure `input` is left
    /// untouched.
    pub async fn generate(
        &self,
        trigger: &GenerateTrigger,
        input: &dyn CommitInput,
    ) -> Result<(), GenerateError> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            return Err(GenerateError::AlreadyRunning);
        };

        let result = self.run(trigger, input).await;
        match &result {
            Ok(()) => self.progress.report(Phase::Done),
            Err(e) => {
                if e.is_benign() {
                    info!("{}", e);
                } else {
                    warn!("Commit message generation failed: {}", e);
                }
                self.progress.report(Phase::Failed);
            }
        }
        result
    }

    async fn run(
        &self,
        trigger: &GenerateTrigger,
        input: &dyn CommitInput,
    ) -> Result<(), GenerateError> {
        self.progress.report(Phase::ResolvingRepo);
        let repo = self
            .workspace
            .resolve_repository(trigger.repository_root.as_deref())
            .ok_or(GenerateError::RepoNotFound)?;
        debug!("Generating for repository {}", repo.root().display());

        self.progress.report(Phase::CheckingCredential);
        let settings = self.store.settings()?;
        if settings.active_api_key().is_none() {
            return Err(GenerateError::MissingCredential(settings.provider));
        }

        self.progress.report(Phase::FetchingDiff);
        let diff = self
            .diff_source
            .staged_diff(Some(repo), &self.workspace)
            .await;
        if let Some(error) = diff.error {
            return Err(GenerateError::DiffRetrievalFailed(error));
        }
        if !diff.has_changes() {
            return Err(GenerateError::NothingStaged);
        }

        self.progress.report(Phase::BuildingPrompt);
        let context = input.read();
        let messages = build_prompt(
            &diff.diff,
            context.as_deref(),
            &PromptSettings::from(settings.as_ref()),
        );

        self.progress.report(Phase::AwaitingCompletion);
        let provider = self.providers.create(&settings).map_err(|e| {
            warn!("Could not create {} client: {}", settings.provider, e);
            classify_provider_error(&e)
        })?;
        let message = provider.complete(&messages).await.map_err(|e| {
            warn!("{} completion failed: {}", provider.provider(), e);
            classify_provider_error(&e)
        })?;

        self.progress.report(Phase::Writing);
        input
            .write(&message)
            .map_err(|e| GenerateError::WriteFailed(e.to_string()))?;
        info!("Commit message generated with {}", provider.provider());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use git2::Repository;
    use tokio::sync::Notify;

    use super::*;
    use crate::config::{MemoryConfigSource, Settings};
    use crate::git::{DiffResult, NO_CHANGES_STAGED, RepositoryHandle};
    use crate::llm::{ChatMessage, CompletionProvider, MockCompletionProvider, Provider};

    /// Hands out one prebuilt provider.
    struct FixedFactory(Arc<dyn CompletionProvider>);

    #[async_trait]
    impl ProviderFactory for FixedFactory {
        fn create(
            &self,
            settings: &Settings,
        ) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
            match settings.active_api_key() {
                Some(_) => Ok(Arc::clone(&self.0)),
                None => Err(ProviderError::MissingCredential(settings.provider)),
            }
        }

        async fn list_models(
            &self,
            _settings: &Settings,
            _provider: Provider,
        ) -> Result<Vec<String>, ProviderError> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct RecordingInput {
        context: Option<String>,
        value: Mutex<Option<String>>,
    }

    impl CommitInput for RecordingInput {
        fn read(&self) -> Option<String> {
            self.context.clone()
        }

        fn write(&self, message: &str) -> io::Result<()> {
            *self.value.lock().unwrap() = Some(message.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingProgress(Mutex<Vec<Phase>>);

    impl ProgressSink for RecordingProgress {
        fn report(&self, phase: Phase) {
            self.0.lock().unwrap().push(phase);
        }
    }

    struct Fixture {
        _dir: tempfile::TempDir,
        workspace: Workspace,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let workspace = Workspace::new(vec![dir.path().to_path_buf()]);
        Fixture {
            _dir: dir,
            workspace,
        }
    }

    fn store(api_key: &str) -> Arc<ConfigStore> {
        let mut settings = Settings::default();
        settings.openai.api_key = api_key.to_string();
        Arc::new(ConfigStore::new(MemoryConfigSource::new(settings)))
    }

    /// Returns a fixed diff and records which repository it was asked for.
    struct FixedDiffSource {
        diff: DiffResult,
        requested: Mutex<Vec<Option<PathBuf>>>,
    }

    impl FixedDiffSource {
        fn new(diff: DiffResult) -> Self {
            Self {
                diff,
                requested: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.requested.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl DiffSource for FixedDiffSource {
        async fn staged_diff(
            &self,
            repo: Option<&RepositoryHandle>,
            _workspace: &Workspace,
        ) -> DiffResult {
            self.requested
                .lock()
                .unwrap()
                .push(repo.map(|r| r.root().to_path_buf()));
            self.diff.clone()
        }
    }

    fn diff_source(diff: DiffResult) -> Arc<FixedDiffSource> {
        Arc::new(FixedDiffSource::new(diff))
    }

    fn provider_returning(
        result: impl Fn() -> Result<String, ProviderError> + Send + Sync + 'static,
    ) -> Arc<FixedFactory> {
        let mut provider = MockCompletionProvider::new();
        provider.expect_provider().return_const(Provider::OpenAi);
        provider.expect_complete().returning(move |_| result());
        Arc::new(FixedFactory(Arc::new(provider)))
    }

    fn provider_never_called() -> Arc<FixedFactory> {
        let mut provider = MockCompletionProvider::new();
        provider.expect_provider().return_const(Provider::OpenAi);
        provider.expect_complete().never();
        Arc::new(FixedFactory(Arc::new(provider)))
    }

    fn api_error(status: u16) -> ProviderError {
        ProviderError::Api {
            provider: Provider::OpenAi,
            status,
            message: "error".to_string(),
        }
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(classify_status(Some(401)), GenerateError::Unauthorized));
        assert!(matches!(classify_status(Some(429)), GenerateError::RateLimited));
        assert!(matches!(classify_status(Some(500)), GenerateError::ServerError));
        assert!(matches!(
            classify_status(Some(503)),
            GenerateError::ServiceUnavailable
        ));
        assert!(matches!(
            classify_status(Some(502)),
            GenerateError::UnknownCompletionError
        ));
        assert!(matches!(
            classify_status(None),
            GenerateError::UnknownCompletionError
        ));
    }

    #[test]
    fn test_classify_provider_error_keeps_own_categories() {
        assert!(matches!(
            classify_provider_error(&ProviderError::EmptyCompletion(Provider::Gemini)),
            GenerateError::EmptyCompletion
        ));
        assert!(matches!(
            classify_provider_error(&ProviderError::MissingCredential(Provider::Gemini)),
            GenerateError::MissingCredential(Provider::Gemini)
        ));
        assert!(matches!(
            classify_provider_error(&api_error(401)),
            GenerateError::Unauthorized
        ));
    }

    #[test]
    fn test_unknown_error_message() {
        assert_eq!(
            GenerateError::UnknownCompletionError.to_string(),
            "An unexpected error occurred"
        );
    }

    #[tokio::test]
    async fn test_nothing_staged_skips_provider() {
        let fx = fixture();
        let generator = CommitMessageGenerator::new(
            store("sk"),
            fx.workspace,
            diff_source(DiffResult::ok(NO_CHANGES_STAGED)),
            provider_never_called(),
        );
        let input = RecordingInput::default();

        let err = generator
            .generate(&GenerateTrigger::default(), &input)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::NothingStaged));
        assert!(input.value.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_diff_is_nothing_staged() {
        let fx = fixture();
        let generator = CommitMessageGenerator::new(
            store("sk"),
            fx.workspace,
            diff_source(DiffResult::ok("")),
            provider_never_called(),
        );

        let err = generator
            .generate(&GenerateTrigger::default(), &RecordingInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::NothingStaged));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_diff_and_network() {
        let fx = fixture();
        let source = diff_source(DiffResult::ok("+added line\n"));
        let generator = CommitMessageGenerator::new(
            store(""),
            fx.workspace,
            Arc::clone(&source) as Arc<dyn DiffSource>,
            provider_never_called(),
        );

        let err = generator
            .generate(&GenerateTrigger::default(), &RecordingInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::MissingCredential(Provider::OpenAi)));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_success_writes_completion() {
        let fx = fixture();
        let progress = Arc::new(RecordingProgress::default());
        let generator = CommitMessageGenerator::new(
            store("sk"),
            fx.workspace,
            diff_source(DiffResult::ok("+added line\n")),
            provider_returning(|| Ok("✨ feat(x): add line".to_string())),
        )
        .with_progress(Arc::clone(&progress) as Arc<dyn ProgressSink>);
        let input = RecordingInput::default();

        generator
            .generate(&GenerateTrigger::default(), &input)
            .await
            .unwrap();

        assert_eq!(
            input.value.lock().unwrap().as_deref(),
            Some("✨ feat(x): add line")
        );
        let labels: Vec<&str> = progress
            .0
            .lock()
            .unwrap()
            .iter()
            .filter_map(Phase::label)
            .collect();
        assert_eq!(
            labels,
            vec![
                "Getting staged changes...",
                "Analyzing changes...",
                "Generating commit message...",
            ]
        );
        assert_eq!(progress.0.lock().unwrap().last(), Some(&Phase::Done));
    }

    #[tokio::test]
    async fn test_context_from_input_reaches_prompt() {
        let fx = fixture();
        let mut provider = MockCompletionProvider::new();
        provider.expect_provider().return_const(Provider::OpenAi);
        provider
            .expect_complete()
            .withf(|messages| {
                messages
                    .last()
                    .is_some_and(|m: &ChatMessage| {
                        m.content == "Additional context:\nwip login\n\n+added line\n"
                    })
            })
            .returning(|_| Ok("fix(auth): handle login".to_string()));

        let generator = CommitMessageGenerator::new(
            store("sk"),
            fx.workspace,
            diff_source(DiffResult::ok("+added line\n")),
            Arc::new(FixedFactory(Arc::new(provider))),
        );
        let input = RecordingInput {
            context: Some("wip login".to_string()),
            ..RecordingInput::default()
        };

        generator
            .generate(&GenerateTrigger::default(), &input)
            .await
            .unwrap();
        assert_eq!(
            input.value.lock().unwrap().as_deref(),
            Some("fix(auth): handle login")
        );
    }

    #[tokio::test]
    async fn test_rate_limit_leaves_input_unchanged() {
        let fx = fixture();
        let generator = CommitMessageGenerator::new(
            store("sk"),
            fx.workspace,
            diff_source(DiffResult::ok("+added line\n")),
            provider_returning(|| Err(api_error(429))),
        );
        let input = RecordingInput::default();

        let err = generator
            .generate(&GenerateTrigger::default(), &input)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::RateLimited));
        assert_eq!(err.to_string(), "Rate limit exceeded. Please try again later");
        assert!(input.value.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_diff_failure_is_reported() {
        let fx = fixture();
        let generator = CommitMessageGenerator::new(
            store("sk"),
            fx.workspace,
            diff_source(DiffResult::failed("fatal: not a git repository")),
            provider_never_called(),
        );

        let err = generator
            .generate(&GenerateTrigger::default(), &RecordingInput::default())
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to get staged changes: fatal: not a git repository"
        );
    }

    #[tokio::test]
    async fn test_no_repository() {
        let generator = CommitMessageGenerator::new(
            store("sk"),
            Workspace::default(),
            diff_source(DiffResult::ok("+x")),
            provider_never_called(),
        );

        let err = generator
            .generate(&GenerateTrigger::default(), &RecordingInput::default())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::RepoNotFound));
    }

    #[tokio::test]
    async fn test_trigger_selects_repository() {
        let first = fixture();
        let second = fixture();
        let second_root = RepositoryHandle::discover(second.workspace.roots()[0].as_path())
            .unwrap()
            .root()
            .to_path_buf();
        let workspace = Workspace::new(vec![
            first.workspace.roots()[0].clone(),
            second.workspace.roots()[0].clone(),
        ]);

        let source = diff_source(DiffResult::ok(NO_CHANGES_STAGED));
        let generator = CommitMessageGenerator::new(
            store("sk"),
            workspace,
            Arc::clone(&source) as Arc<dyn DiffSource>,
            provider_never_called(),
        );

        let err = generator
            .generate(
                &GenerateTrigger::for_repository(second_root.clone()),
                &RecordingInput::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::NothingStaged));
        assert_eq!(*source.requested.lock().unwrap(), vec![Some(second_root)]);
    }

    /// Blocks until released, so a run can be held in flight.
    struct GatedDiffSource(Arc<Notify>);

    #[async_trait]
    impl DiffSource for GatedDiffSource {
        async fn staged_diff(
            &self,
            _repo: Option<&RepositoryHandle>,
            _workspace: &Workspace,
        ) -> DiffResult {
            self.0.notified().await;
            DiffResult::ok("+added line\n")
        }
    }

    #[tokio::test]
    async fn test_concurrent_generate_is_rejected() {
        let fx = fixture();
        let gate = Arc::new(Notify::new());
        let generator = CommitMessageGenerator::new(
            store("sk"),
            fx.workspace,
            Arc::new(GatedDiffSource(Arc::clone(&gate))),
            provider_returning(|| Ok("chore: tidy".to_string())),
        );
        let trigger = GenerateTrigger::default();
        let first_input = RecordingInput::default();
        let second_input = RecordingInput::default();

        let first = generator.generate(&trigger, &first_input);
        let second = async {
            tokio::task::yield_now().await;
            let result = generator.generate(&trigger, &second_input).await;
            gate.notify_one();
            result
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok());
        assert!(matches!(second, Err(GenerateError::AlreadyRunning)));
        assert!(second_input.value.lock().unwrap().is_none());

        // The flag is released once the first run finishes.
        gate.notify_one();
        generator.generate(&trigger, &second_input).await.unwrap();
        assert_eq!(second_input.value.lock().unwrap().as_deref(), Some("chore: tidy"));
    }
}
