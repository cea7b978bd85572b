//! Settings snapshot, keys, and the cached configuration store.

pub mod source;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::ConfigError;
use crate::llm::Provider;

pub use source::{ConfigSource, FileConfigSource, MemoryConfigSource};

/// Default sampling temperature for both providers.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default output language of generated messages.
pub const DEFAULT_LANGUAGE: &str = "English";

/// Capacity of the change broadcast; slow subscribers only miss old events.
const CHANGE_CHANNEL_CAPACITY: usize = 16;

/// Shape of a setting's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Bool,
    Float,
    Provider,
}

/// Every recognized setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKey {
    Provider,
    Language,
    EmojiEnabled,
    FullGitmojiSpec,
    SystemPrompt,
    OneShotExample,
    OpenAiApiKey,
    OpenAiBaseUrl,
    OpenAiApiVersion,
    OpenAiModel,
    OpenAiTemperature,
    GeminiApiKey,
    GeminiModel,
    GeminiTemperature,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 14] = [
        ConfigKey::Provider,
        ConfigKey::Language,
        ConfigKey::EmojiEnabled,
        ConfigKey::FullGitmojiSpec,
        ConfigKey::SystemPrompt,
        ConfigKey::OneShotExample,
        ConfigKey::OpenAiApiKey,
        ConfigKey::OpenAiBaseUrl,
        ConfigKey::OpenAiApiVersion,
        ConfigKey::OpenAiModel,
        ConfigKey::OpenAiTemperature,
        ConfigKey::GeminiApiKey,
        ConfigKey::GeminiModel,
        ConfigKey::GeminiTemperature,
    ];

    /// Dotted name as written in the settings file.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::Provider => "provider",
            ConfigKey::Language => "language",
            ConfigKey::EmojiEnabled => "emoji_enabled",
            ConfigKey::FullGitmojiSpec => "full_gitmoji_spec",
            ConfigKey::SystemPrompt => "system_prompt",
            ConfigKey::OneShotExample => "one_shot_example",
            ConfigKey::OpenAiApiKey => "openai.api_key",
            ConfigKey::OpenAiBaseUrl => "openai.base_url",
            ConfigKey::OpenAiApiVersion => "openai.api_version",
            ConfigKey::OpenAiModel => "openai.model",
            ConfigKey::OpenAiTemperature => "openai.temperature",
            ConfigKey::GeminiApiKey => "gemini.api_key",
            ConfigKey::GeminiModel => "gemini.model",
            ConfigKey::GeminiTemperature => "gemini.temperature",
        }
    }

    /// `(table, field)` location in the settings file.
    pub fn path(&self) -> (Option<&'static str>, &'static str) {
        let name = self.name();
        match name.split_once('.') {
            Some((table, field)) => (Some(table), field),
            None => (None, name),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            ConfigKey::Provider => ValueKind::Provider,
            ConfigKey::EmojiEnabled | ConfigKey::FullGitmojiSpec | ConfigKey::OneShotExample => {
                ValueKind::Bool
            }
            ConfigKey::OpenAiTemperature | ConfigKey::GeminiTemperature => ValueKind::Float,
            _ => ValueKind::Text,
        }
    }

    /// Keys whose change invalidates the available-model list.
    pub fn affects_provider(&self) -> bool {
        matches!(
            self,
            ConfigKey::Provider
                | ConfigKey::OpenAiApiKey
                | ConfigKey::OpenAiBaseUrl
                | ConfigKey::OpenAiApiVersion
                | ConfigKey::GeminiApiKey
        )
    }

    pub fn is_secret(&self) -> bool {
        matches!(self, ConfigKey::OpenAiApiKey | ConfigKey::GeminiApiKey)
    }

    pub fn model_for(provider: Provider) -> ConfigKey {
        match provider {
            Provider::OpenAi => ConfigKey::OpenAiModel,
            Provider::Gemini => ConfigKey::GeminiModel,
        }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

/// OpenAI-compatible endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub base_url: String,
    pub api_version: String,
    pub model: String,
    pub temperature: f32,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: String::new(),
            api_version: String::new(),
            model: Provider::OpenAi.default_model().to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl OpenAiSettings {
    pub fn api_key(&self) -> Option<&str> {
        non_blank(&self.api_key)
    }

    pub fn base_url(&self) -> Option<&str> {
        non_blank(&self.base_url)
    }

    pub fn api_version(&self) -> Option<&str> {
        non_blank(&self.api_version)
    }

    pub fn model(&self) -> &str {
        non_blank(&self.model).unwrap_or(Provider::OpenAi.default_model())
    }
}

/// Gemini settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: Provider::Gemini.default_model().to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl GeminiSettings {
    pub fn api_key(&self) -> Option<&str> {
        non_blank(&self.api_key)
    }

    pub fn model(&self) -> &str {
        non_blank(&self.model).unwrap_or(Provider::Gemini.default_model())
    }
}

/// Read-only view of all settings at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub provider: Provider,
    pub language: String,
    pub emoji_enabled: bool,
    pub full_gitmoji_spec: bool,
    pub system_prompt: String,
    pub one_shot_example: bool,
    pub openai: OpenAiSettings,
    pub gemini: GeminiSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            language: DEFAULT_LANGUAGE.to_string(),
            emoji_enabled: true,
            full_gitmoji_spec: false,
            system_prompt: String::new(),
            one_shot_example: false,
            openai: OpenAiSettings::default(),
            gemini: GeminiSettings::default(),
        }
    }
}

impl Settings {
    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::OpenAi => self.openai.api_key(),
            Provider::Gemini => self.gemini.api_key(),
        }
    }

    /// API key of the active provider.
    pub fn active_api_key(&self) -> Option<&str> {
        self.api_key(self.provider)
    }

    pub fn model(&self, provider: Provider) -> &str {
        match provider {
            Provider::OpenAi => self.openai.model(),
            Provider::Gemini => self.gemini.model(),
        }
    }

    pub fn language(&self) -> &str {
        non_blank(&self.language).unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn system_prompt(&self) -> Option<&str> {
        non_blank(&self.system_prompt)
    }

    /// Current value of a key, rendered as text.
    pub fn value(&self, key: ConfigKey) -> String {
        match key {
            ConfigKey::Provider => self.provider.id().to_string(),
            ConfigKey::Language => self.language.clone(),
            ConfigKey::EmojiEnabled => self.emoji_enabled.to_string(),
            ConfigKey::FullGitmojiSpec => self.full_gitmoji_spec.to_string(),
            ConfigKey::SystemPrompt => self.system_prompt.clone(),
            ConfigKey::OneShotExample => self.one_shot_example.to_string(),
            ConfigKey::OpenAiApiKey => self.openai.api_key.clone(),
            ConfigKey::OpenAiBaseUrl => self.openai.base_url.clone(),
            ConfigKey::OpenAiApiVersion => self.openai.api_version.clone(),
            ConfigKey::OpenAiModel => self.openai.model.clone(),
            ConfigKey::OpenAiTemperature => self.openai.temperature.to_string(),
            ConfigKey::GeminiApiKey => self.gemini.api_key.clone(),
            ConfigKey::GeminiModel => self.gemini.model.clone(),
            ConfigKey::GeminiTemperature => self.gemini.temperature.to_string(),
        }
    }

    /// Parse `raw` for `key` and assign it.
    pub fn apply(&mut self, key: ConfigKey, raw: &str) -> Result<(), ConfigError> {
        let raw = raw.trim();
        match key {
            ConfigKey::Provider => self.provider = raw.parse()?,
            ConfigKey::Language => self.language = raw.to_string(),
            ConfigKey::EmojiEnabled => self.emoji_enabled = parse_bool(key, raw)?,
            ConfigKey::FullGitmojiSpec => self.full_gitmoji_spec = parse_bool(key, raw)?,
            ConfigKey::SystemPrompt => self.system_prompt = raw.to_string(),
            ConfigKey::OneShotExample => self.one_shot_example = parse_bool(key, raw)?,
            ConfigKey::OpenAiApiKey => self.openai.api_key = raw.to_string(),
            ConfigKey::OpenAiBaseUrl => self.openai.base_url = raw.to_string(),
            ConfigKey::OpenAiApiVersion => self.openai.api_version = raw.to_string(),
            ConfigKey::OpenAiModel => self.openai.model = raw.to_string(),
            ConfigKey::OpenAiTemperature => self.openai.temperature = parse_temperature(key, raw)?,
            ConfigKey::GeminiApiKey => self.gemini.api_key = raw.to_string(),
            ConfigKey::GeminiModel => self.gemini.model = raw.to_string(),
            ConfigKey::GeminiTemperature => self.gemini.temperature = parse_temperature(key, raw)?,
        }
        Ok(())
    }
}

pub(crate) fn parse_bool(key: ConfigKey, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.name().to_string(),
            value: raw.to_string(),
            expected: "true or false",
        }),
    }
}

pub(crate) fn parse_temperature(key: ConfigKey, raw: &str) -> Result<f32, ConfigError> {
    match raw.parse::<f32>() {
        Ok(t) if (0.0..=2.0).contains(&t) => Ok(t),
        _ => Err(ConfigError::InvalidValue {
            key: key.name().to_string(),
            value: raw.to_string(),
            expected: "a number between 0.0 and 2.0",
        }),
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}

/// Lazily cached settings with explicit invalidation.
///
/// One store is constructed per process and shared (`Arc`) with every
/// component that reads settings. Writes go through [`ConfigStore::set`],
/// which invalidates the cache and broadcasts the changed keys.
pub struct ConfigStore {
    source: Box<dyn ConfigSource>,
    cache: RwLock<Option<Arc<Settings>>>,
    changes: broadcast::Sender<Vec<ConfigKey>>,
}

impl ConfigStore {
    pub fn new(source: impl ConfigSource + 'static) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            source: Box::new(source),
            cache: RwLock::new(None),
            changes,
        }
    }

    /// Current snapshot, loading from the source on a cache miss.
    pub fn settings(&self) -> Result<Arc<Settings>, ConfigError> {
        let cached = self
            .cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        if let Some(settings) = cached {
            return Ok(settings);
        }

        let loaded = Arc::new(self.source.load()?);
        *self
            .cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    pub fn get(&self, key: ConfigKey) -> Result<String, ConfigError> {
        Ok(self.settings()?.value(key))
    }

    /// Value of `key`, or `default` when unset or blank.
    pub fn get_or(&self, key: ConfigKey, default: &str) -> Result<String, ConfigError> {
        let value = self.get(key)?;
        Ok(match non_blank(&value) {
            Some(v) => v.to_string(),
            None => default.to_string(),
        })
    }

    /// Validate and persist a value, then announce the change.
    pub fn set(&self, key: ConfigKey, value: &str) -> Result<(), ConfigError> {
        let mut probe = (*self.settings()?).clone();
        probe.apply(key, value)?;

        self.source.store(key, value.trim())?;
        self.notify_changed(&[key]);
        Ok(())
    }

    /// Drop the cached snapshot; the next read reloads.
    pub fn invalidate(&self) {
        *self
            .cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// React to a change of `keys` made through any channel.
    pub fn notify_changed(&self, keys: &[ConfigKey]) {
        self.invalidate();
        debug!(
            "Settings changed: {}",
            keys.iter().map(|k| k.name()).collect::<Vec<_>>().join(", ")
        );
        // Err only means nobody subscribed.
        let _ = self.changes.send(keys.to_vec());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<ConfigKey>> {
        self.changes.subscribe()
    }

    /// Where settings live on disk, if anywhere.
    pub fn location(&self) -> Option<&Path> {
        self.source.location()
    }

    /// Settings file to open in an editor, created from the template if
    /// missing.
    pub fn prepare_for_edit(&self) -> Result<Option<&Path>, ConfigError> {
        self.source.prepare_for_edit()
    }
}
