//! Available-model catalog, persisted between runs.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{ConfigKey, ConfigStore, Settings};
use crate::error::{ModelsError, ProviderError};

use super::{Provider, ProviderFactory};

/// Models fetched for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedModels {
    pub models: Vec<String>,
    pub fetched_at: DateTime<Utc>,
}

/// On-disk cache of model lists, keyed by provider id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelCache {
    #[serde(default)]
    providers: BTreeMap<String, CachedModels>,
}

impl ModelCache {
    /// `<cache_dir>/ai-commit/models.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::cache_dir().map(|dir| dir.join("ai-commit").join("models.json"))
    }

    /// Read the cache; a missing file is an empty cache.
    pub fn load(path: &Path) -> Result<Self, ModelsError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(ModelsError::CacheRead {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        };

        serde_json::from_str(&content).map_err(|e| ModelsError::CacheRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelsError> {
        let write_failed = |reason: String| ModelsError::CacheWrite {
            path: path.to_path_buf(),
            reason,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| write_failed(e.to_string()))?;

        let json = serde_json::to_string_pretty(self).map_err(|e| write_failed(e.to_string()))?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| write_failed(e.to_string()))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| write_failed(e.to_string()))?;
        tmp.persist(path)
            .map_err(|e| write_failed(e.error.to_string()))?;
        Ok(())
    }

    pub fn get(&self, provider: Provider) -> Option<&CachedModels> {
        self.providers.get(provider.id())
    }

    pub fn insert(&mut self, provider: Provider, models: Vec<String>) {
        self.providers.insert(
            provider.id().to_string(),
            CachedModels {
                models,
                fetched_at: Utc::now(),
            },
        );
    }
}

/// Handle to the task started by [`ModelCatalog::spawn_refresh_listener`].
pub struct RefreshListener {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl RefreshListener {
    /// Process the changes already announced, then stop the task.
    pub async fn finish(self) {
        // The task may already be gone; that is fine.
        let _ = self.shutdown.send(());
        if let Err(e) = self.handle.await {
            warn!("Model refresh listener failed: {}", e);
        }
    }
}

/// Model lists per provider, refreshed when credentials or endpoints change.
pub struct ModelCatalog {
    store: Arc<ConfigStore>,
    factory: Arc<dyn ProviderFactory>,
    cache_path: Option<PathBuf>,
    cache: Mutex<ModelCache>,
}

impl ModelCatalog {
    /// Create a catalog; `cache_path: None` keeps the cache in memory only.
    pub fn new(
        store: Arc<ConfigStore>,
        factory: Arc<dyn ProviderFactory>,
        cache_path: Option<PathBuf>,
    ) -> Self {
        let cache = match cache_path.as_deref().map(ModelCache::load) {
            Some(Ok(cache)) => cache,
            Some(Err(e)) => {
                warn!("Ignoring unreadable model cache: {}", e);
                ModelCache::default()
            }
            None => ModelCache::default(),
        };

        Self {
            store,
            factory,
            cache_path,
            cache: Mutex::new(cache),
        }
    }

    /// Cached list for `provider`, without touching the network.
    pub fn cached(&self, provider: Provider) -> Option<Vec<String>> {
        self.lock_cache().get(provider).map(|c| c.models.clone())
    }

    /// Cached list, fetched on first request.
    pub async fn available_models(&self, provider: Provider) -> Result<Vec<String>, ModelsError> {
        match self.cached(provider) {
            Some(models) => Ok(models),
            None => self.refresh(provider).await,
        }
    }

    /// Fetch the live list, persist it, and heal the configured model.
    pub async fn refresh(&self, provider: Provider) -> Result<Vec<String>, ModelsError> {
        let settings = self.store.settings()?;
        let models = self.factory.list_models(&settings, provider).await?;
        debug!("Fetched {} models for {}", models.len(), provider);

        let snapshot = {
            let mut cache = self.lock_cache();
            cache.insert(provider, models.clone());
            cache.clone()
        };
        if let Some(path) = &self.cache_path {
            snapshot.save(path)?;
        }

        self.heal_model(&settings, provider, &models)?;
        Ok(models)
    }

    /// Refresh, logging instead of failing.
    pub async fn refresh_quietly(&self, provider: Provider) {
        match self.refresh(provider).await {
            Ok(_) => {}
            Err(ModelsError::Fetch(ProviderError::Unsupported { .. })) => {
                debug!("{} does not list models; skipping refresh", provider);
            }
            Err(e) => warn!("Could not refresh {} models: {}", provider, e),
        }
    }

    /// Refresh the active provider's models whenever a provider-affecting
    /// setting changes.
    ///
    /// Changes announced after this call are seen by the task. It stops once
    /// the returned [`RefreshListener`] is finished or dropped; the store
    /// keeps its channel open for as long as the catalog lives.
    pub fn spawn_refresh_listener(self: Arc<Self>) -> RefreshListener {
        let mut changes = self.store.subscribe();
        let (shutdown_tx, mut shutdown) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            loop {
                // Pending changes win over shutdown.
                let change = tokio::select! {
                    biased;
                    change = changes.recv() => change,
                    _ = &mut shutdown => break,
                };
                match change {
                    Ok(keys) if keys.iter().any(ConfigKey::affects_provider) => {
                        match self.store.settings() {
                            Ok(settings) => self.refresh_quietly(settings.provider).await,
                            Err(e) => warn!("Skipping model refresh: {}", e),
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Model refresh listener skipped {} change events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        RefreshListener {
            shutdown: shutdown_tx,
            handle,
        }
    }

    /// Reset the configured model to the provider default when the live list
    /// no longer contains it.
    fn heal_model(
        &self,
        settings: &Settings,
        provider: Provider,
        models: &[String],
    ) -> Result<(), ModelsError> {
        let current = settings.model(provider);
        let default = provider.default_model();
        if models.is_empty() || current == default || models.iter().any(|m| m == current) {
            return Ok(());
        }

        info!(
            "Model '{}' is not offered by {}; resetting to '{}'",
            current, provider, default
        );
        self.store.set(ConfigKey::model_for(provider), default)?;
        Ok(())
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, ModelCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
