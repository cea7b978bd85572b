//! Host commands: generation with recovery actions, settings, and models.

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::Command;

use dialoguer::Select;
use tracing::{debug, warn};

use crate::commit::{CommitInput, CommitMessageGenerator, GenerateTrigger, Phase, ProgressSink};
use crate::config::{ConfigKey, ConfigStore};
use crate::error::{ConfigError, GenerateError, ModelsError, NotificationAction};
use crate::llm::ModelCatalog;

/// Surfaces a failed generation and lets the user pick a follow-up.
pub trait Notifier: Send + Sync {
    fn notify(
        &self,
        error: &GenerateError,
        actions: &[NotificationAction],
    ) -> Option<NotificationAction>;
}

/// Prints failures to stderr and, on a terminal, offers the actions.
#[derive(Debug, Clone, Copy)]
pub struct TerminalNotifier {
    interactive: bool,
}

impl TerminalNotifier {
    pub fn new(interactive: bool) -> Self {
        Self { interactive }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(
        &self,
        error: &GenerateError,
        actions: &[NotificationAction],
    ) -> Option<NotificationAction> {
        eprintln!("[AI Commit] {}", error);

        if !self.interactive || actions.is_empty() || !std::io::stdin().is_terminal() {
            return None;
        }

        let mut labels: Vec<&str> = actions.iter().map(NotificationAction::label).collect();
        labels.push("Dismiss");

        match Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact_opt()
        {
            Ok(Some(index)) => actions.get(index).copied(),
            Ok(None) => None,
            Err(e) => {
                debug!("Action prompt closed: {}", e);
                None
            }
        }
    }
}

/// Progress lines on stderr, so stdout carries only the message.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalProgress;

impl ProgressSink for TerminalProgress {
    fn report(&self, phase: Phase) {
        if let Some(label) = phase.label() {
            eprintln!("[AI Commit] {}", label);
        }
    }
}

/// Run one generation and handle the user's chosen recovery action.
///
/// Retry re-runs with the same trigger once; after that only the settings
/// action is offered.
pub async fn run_generate(
    generator: &CommitMessageGenerator,
    store: &ConfigStore,
    trigger: &GenerateTrigger,
    input: &dyn CommitInput,
    notifier: &dyn Notifier,
) -> Result<(), GenerateError> {
    let mut retried = false;
    loop {
        let err = match generator.generate(trigger, input).await {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        let actions: Vec<NotificationAction> = err
            .actions()
            .iter()
            .copied()
            .filter(|a| !(retried && *a == NotificationAction::Retry))
            .collect();

        match notifier.notify(&err, &actions) {
            Some(NotificationAction::Retry) => {
                debug!("Retrying commit message generation");
                retried = true;
            }
            Some(NotificationAction::OpenSettings) => {
                if let Err(e) = open_settings(store) {
                    warn!("Could not open settings: {}", e);
                    eprintln!("[AI Commit] {}", e);
                }
                return Err(err);
            }
            None => return Err(err),
        }
    }
}

/// Editor from `$VISUAL` or `$EDITOR`.
fn editor() -> Option<String> {
    ["VISUAL", "EDITOR"]
        .into_iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.trim().is_empty())
}

/// Open the settings file in the user's editor, creating it if needed.
///
/// Without an editor the path is printed instead. Edits made in the editor
/// are announced as a change of every key.
pub fn open_settings(store: &ConfigStore) -> Result<PathBuf, ConfigError> {
    let path = store
        .prepare_for_edit()?
        .ok_or(ConfigError::NoConfigDir)?
        .to_path_buf();

    let Some(editor) = editor() else {
        println!("Settings file: {}", path.display());
        return Ok(path);
    };

    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or_default();
    let status = Command::new(program)
        .args(parts)
        .arg(&path)
        .status()
        .map_err(|source| ConfigError::EditorFailed {
            editor: editor.clone(),
            source,
        })?;

    if !status.success() {
        warn!("Editor '{}' exited with {}", editor, status);
    }
    store.notify_changed(&ConfigKey::ALL);
    Ok(path)
}

/// A setting as `config get` prints it: API keys are masked down to their
/// last four characters.
pub fn show_setting(store: &ConfigStore, key: ConfigKey) -> Result<String, ConfigError> {
    let value = store.get_or(key, "(unset)")?;
    if !key.is_secret() || store.get(key)?.trim().is_empty() {
        return Ok(value);
    }

    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 8 {
        return Ok("****".to_string());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    Ok(format!("****{}", tail))
}

/// List the active provider's models and optionally switch to one.
///
/// Returns the newly selected model, if the user picked a different one.
pub async fn select_model(
    store: &ConfigStore,
    catalog: &ModelCatalog,
    refresh: bool,
    interactive: bool,
) -> Result<Option<String>, ModelsError> {
    let provider = store.settings()?.provider;
    let models = if refresh {
        catalog.refresh(provider).await?
    } else {
        catalog.available_models(provider).await?
    };

    // Refresh may have healed the model; read it afterwards.
    let current = store.settings()?.model(provider).to_string();

    if models.is_empty() {
        println!("No models available for {}", provider);
        return Ok(None);
    }

    if !interactive || !std::io::stdin().is_terminal() {
        for model in &models {
            let marker = if *model == current { "*" } else { " " };
            println!("{} {}", marker, model);
        }
        return Ok(None);
    }

    let default = models.iter().position(|m| *m == current).unwrap_or(0);
    let choice = match Select::new()
        .with_prompt(format!("{} model", provider))
        .items(&models)
        .default(default)
        .interact_opt()
    {
        Ok(choice) => choice,
        Err(e) => {
            debug!("Model prompt closed: {}", e);
            None
        }
    };

    match choice.and_then(|i| models.get(i)) {
        Some(model) if *model != current => {
            store.set(ConfigKey::model_for(provider), model)?;
            Ok(Some(model.clone()))
        }
        _ => Ok(None),
    }
}
