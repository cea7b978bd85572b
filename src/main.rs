//! ai-commit - CLI entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ai_commit::commands::{
    TerminalNotifier, TerminalProgress, open_settings, run_generate, select_model, show_setting,
};
use ai_commit::commit::{CommitInput, MessageFile, StdoutInput};
use ai_commit::config::FileConfigSource;
use ai_commit::llm::{DefaultProviderFactory, ModelCache, ModelCatalog, ProviderFactory};
use ai_commit::{
    CommitMessageGenerator, ConfigKey, ConfigStore, GenerateTrigger, GitDiffSource, ModelsError,
    ProviderError, Workspace,
};

/// Generate commit messages for staged changes with an LLM.
#[derive(Parser, Debug)]
#[command(name = "ai-commit")]
#[command(
    about = "Generate commit messages for staged changes with OpenAI-compatible or Gemini models"
)]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Settings file (defaults to $AI_COMMIT_CONFIG, then the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Show debug logs (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    generate: GenerateArgs,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Repository to generate for (defaults to the current directory)
    #[arg(long)]
    repo: Option<PathBuf>,

    /// Commit message file: its text is extra context and it receives the result
    #[arg(long)]
    message_file: Option<PathBuf>,

    /// Extra context for the model when printing to stdout
    #[arg(long, conflicts_with = "message_file")]
    context: Option<String>,

    /// Never prompt for a follow-up action
    #[arg(long)]
    no_interactive: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a commit message for the staged changes (default)
    Generate(GenerateArgs),

    /// Open the settings file, or read and write single settings
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },

    /// List the active provider's models and pick one
    Models {
        /// Fetch the list again instead of using the cache
        #[arg(long)]
        refresh: bool,

        /// Print the list without prompting
        #[arg(long)]
        no_interactive: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Open the settings file in $VISUAL / $EDITOR
    Open,
    /// Print the settings file path
    Path,
    /// Print one setting
    Get { key: String },
    /// Change one setting
    Set { key: String, value: String },
    /// List every setting name
    Keys,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = match cli.config {
        Some(path) => path,
        None => FileConfigSource::default_path().context("Could not locate the settings file")?,
    };
    let store = Arc::new(ConfigStore::new(FileConfigSource::new(config_path)));
    let factory: Arc<dyn ProviderFactory> = Arc::new(DefaultProviderFactory::new());
    let catalog = Arc::new(ModelCatalog::new(
        Arc::clone(&store),
        Arc::clone(&factory),
        ModelCache::default_path(),
    ));
    // Settings can change from `config set`, the editor, or the Configure
    // action of a failed generation.
    let listener = Arc::clone(&catalog).spawn_refresh_listener();

    let result = match cli.command.unwrap_or(Command::Generate(cli.generate)) {
        Command::Generate(args) => generate(args, Arc::clone(&store), factory).await,
        Command::Config { action } => config(action.unwrap_or(ConfigAction::Open), &store)
            .map(|()| ExitCode::SUCCESS),
        Command::Models {
            refresh,
            no_interactive,
        } => models(&store, &catalog, refresh, !no_interactive)
            .await
            .map(|()| ExitCode::SUCCESS),
    };

    listener.finish().await;
    result
}

fn init_logging(verbose: bool) {
    let default = if verbose { "ai_commit=debug" } else { "ai_commit=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn generate(
    args: GenerateArgs,
    store: Arc<ConfigStore>,
    factory: Arc<dyn ProviderFactory>,
) -> Result<ExitCode> {
    let root = match args.repo {
        Some(path) => path,
        None => std::env::current_dir().context("Could not read the current directory")?,
    };

    let generator = CommitMessageGenerator::new(
        Arc::clone(&store),
        Workspace::new(vec![root.clone()]),
        Arc::new(GitDiffSource::new()),
        factory,
    )
    .with_progress(Arc::new(TerminalProgress));

    let input: Box<dyn CommitInput> = match args.message_file {
        Some(path) => Box::new(MessageFile::new(path)),
        None => Box::new(StdoutInput::new(args.context)),
    };
    let notifier = TerminalNotifier::new(!args.no_interactive);

    let result = run_generate(
        &generator,
        &store,
        &GenerateTrigger::for_repository(root),
        input.as_ref(),
        &notifier,
    )
    .await;

    // The notifier has already told the user what went wrong.
    Ok(match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_benign() => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    })
}

fn config(action: ConfigAction, store: &ConfigStore) -> Result<()> {
    match action {
        ConfigAction::Open => {
            open_settings(store).context("Failed to open settings")?;
        }
        ConfigAction::Path => {
            if let Some(path) = store.location() {
                println!("{}", path.display());
            }
        }
        ConfigAction::Get { key } => {
            let key: ConfigKey = key.parse()?;
            println!("{}", show_setting(store, key)?);
        }
        ConfigAction::Set { key, value } => {
            let key: ConfigKey = key.parse()?;
            store
                .set(key, &value)
                .with_context(|| format!("Failed to set {}", key))?;
            println!("✓ {} updated", key);
        }
        ConfigAction::Keys => {
            for key in ConfigKey::ALL {
                println!("{}", key);
            }
        }
    }
    Ok(())
}

async fn models(
    store: &ConfigStore,
    catalog: &ModelCatalog,
    refresh: bool,
    interactive: bool,
) -> Result<()> {
    match select_model(store, catalog, refresh, interactive).await {
        Ok(Some(model)) => println!("✓ Now using {}", model),
        Ok(None) => {}
        Err(ModelsError::Fetch(ProviderError::Unsupported { provider, .. })) => {
            let key = ConfigKey::model_for(provider);
            println!(
                "{} does not list models. Set one with `ai-commit config set {} <MODEL>` (current: {}).",
                provider,
                key,
                store.get(key)?
            );
        }
        Err(e) => return Err(e).context("Failed to list models"),
    }
    Ok(())
}
