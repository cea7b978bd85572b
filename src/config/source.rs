//! Where settings come from: a TOML file on disk or memory.

use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use toml_edit::DocumentMut;
use tracing::debug;

use crate::error::ConfigError;

use super::{ConfigKey, Settings, ValueKind, parse_bool, parse_temperature};

/// Environment variable that points at an alternative settings file.
pub const CONFIG_PATH_ENV_VAR: &str = "AI_COMMIT_CONFIG";

/// Credentials and endpoints that may come from the environment when the
/// settings file leaves them blank.
const ENV_FALLBACKS: [(ConfigKey, &str); 3] = [
    (ConfigKey::OpenAiApiKey, "OPENAI_API_KEY"),
    (ConfigKey::OpenAiBaseUrl, "OPENAI_BASE_URL"),
    (ConfigKey::GeminiApiKey, "GEMINI_API_KEY"),
];

/// Commented starting point written by `ai-commit config`.
const SETTINGS_TEMPLATE: &str = r#"# ai-commit settings

# Active provider: "openai" or "gemini"
provider = "openai"

# Language of generated commit messages
language = "English"

# Prefix subjects with a gitmoji
emoji_enabled = true

# Choose from the whole gitmoji list instead of one emoji per commit type
full_gitmoji_spec = false

# Replace the built-in system prompt entirely
system_prompt = ""

# Prime the model with an example diff and message before the real diff
one_shot_example = false

[openai]
# Falls back to the OPENAI_API_KEY environment variable
api_key = ""
# Alternate OpenAI-compatible endpoint (proxy, self-hosted, Azure)
base_url = ""
# Azure API version; with base_url set this switches to api-key header auth
api_version = ""
model = "gpt-4o"
temperature = 0.7

[gemini]
# Falls back to the GEMINI_API_KEY environment variable
api_key = ""
model = "gemini-1.5-flash"
temperature = 0.7
"#;

/// Backing storage for settings.
pub trait ConfigSource: Send + Sync {
    /// Read a fresh snapshot.
    fn load(&self) -> Result<Settings, ConfigError>;

    /// Persist one already-validated value.
    fn store(&self, key: ConfigKey, value: &str) -> Result<(), ConfigError>;

    /// File backing this source, if any.
    fn location(&self) -> Option<&Path> {
        None
    }

    /// Make the backing file ready for hand editing and return it.
    fn prepare_for_edit(&self) -> Result<Option<&Path>, ConfigError> {
        Ok(self.location())
    }
}

/// Settings stored in a TOML file, with environment fallbacks for
/// credentials.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
    env_fallbacks: bool,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_fallbacks: true,
        }
    }

    /// Ignore `OPENAI_API_KEY` and friends; only the file counts.
    pub fn without_env_fallbacks(mut self) -> Self {
        self.env_fallbacks = false;
        self
    }

    /// Default settings path: `$AI_COMMIT_CONFIG`, else
    /// `<config_dir>/ai-commit/config.toml`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = env::var(CONFIG_PATH_ENV_VAR) {
            if !path.is_empty() {
                return Ok(PathBuf::from(path));
            }
        }

        dirs::config_dir()
            .map(|dir| dir.join("ai-commit").join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the commented template if no settings file exists yet.
    pub fn ensure_exists(&self) -> Result<(), ConfigError> {
        if self.path.exists() {
            return Ok(());
        }
        debug!("Creating settings file at {}", self.path.display());
        self.write_atomic(SETTINGS_TEMPLATE)
    }

    fn read_document(&self) -> Result<DocumentMut, ConfigError> {
        let content = self.read_content()?;
        content
            .parse::<DocumentMut>()
            .map_err(|e| ConfigError::ParseFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })
    }

    fn read_content(&self) -> Result<String, ConfigError> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(ConfigError::ReadFailed {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Replace the file through a temp file in the same directory.
    fn write_atomic(&self, content: &str) -> Result<(), ConfigError> {
        let write_failed = |reason: String| ConfigError::WriteFailed {
            path: self.path.clone(),
            reason,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| write_failed(e.to_string()))?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| write_failed(e.to_string()))?;
        tmp.write_all(content.as_bytes())
            .map_err(|e| write_failed(e.to_string()))?;
        tmp.persist(&self.path)
            .map_err(|e| write_failed(e.error.to_string()))?;
        Ok(())
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<Settings, ConfigError> {
        let content = self.read_content()?;
        let mut settings: Settings =
            toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        if self.env_fallbacks {
            apply_env_fallbacks(&mut settings)?;
        }

        Ok(settings)
    }

    fn store(&self, key: ConfigKey, value: &str) -> Result<(), ConfigError> {
        let mut doc = self.read_document()?;
        let item = toml_value(key, value)?;

        match key.path() {
            (Some(table), field) => {
                if doc.get(table).is_none() {
                    doc.insert(table, toml_edit::table());
                }
                // Sections may be written as `[table]` or as an inline table.
                let section = doc
                    .get_mut(table)
                    .and_then(toml_edit::Item::as_table_like_mut)
                    .ok_or_else(|| ConfigError::InvalidValue {
                        key: table.to_string(),
                        value: value.to_string(),
                        expected: "a table in the settings file",
                    })?;
                section.insert(field, item);
            }
            (None, field) => {
                doc[field] = item;
            }
        }

        self.write_atomic(&doc.to_string())
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.path)
    }

    fn prepare_for_edit(&self) -> Result<Option<&Path>, ConfigError> {
        self.ensure_exists()?;
        Ok(Some(&self.path))
    }
}

/// Convert a validated value into a typed TOML item.
fn toml_value(key: ConfigKey, value: &str) -> Result<toml_edit::Item, ConfigError> {
    Ok(match key.kind() {
        ValueKind::Bool => toml_edit::value(parse_bool(key, value)?),
        ValueKind::Float => {
            // Validate as f32, but write the literal the user typed.
            parse_temperature(key, value)?;
            let literal: f64 = value.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.name().to_string(),
                value: value.to_string(),
                expected: "a number between 0.0 and 2.0",
            })?;
            toml_edit::value(literal)
        }
        ValueKind::Text | ValueKind::Provider => toml_edit::value(value),
    })
}

fn apply_env_fallbacks(settings: &mut Settings) -> Result<(), ConfigError> {
    for (key, var) in ENV_FALLBACKS {
        if !settings.value(key).trim().is_empty() {
            continue;
        }
        if let Ok(value) = env::var(var) {
            if !value.trim().is_empty() {
                debug!("Using {} from environment for {}", var, key);
                settings.apply(key, &value)?;
            }
        }
    }
    Ok(())
}

/// In-memory settings, for embedding hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryConfigSource {
    settings: Mutex<Settings>,
}

impl MemoryConfigSource {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl ConfigSource for MemoryConfigSource {
    fn load(&self) -> Result<Settings, ConfigError> {
        Ok(self
            .settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn store(&self, key: ConfigKey, value: &str) -> Result<(), ConfigError> {
        self.settings
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .apply(key, value)
    }
}
