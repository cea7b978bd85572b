//! Provider selection: one place that maps settings to a client.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Settings;
use crate::error::ProviderError;

use super::{CompletionProvider, GeminiProvider, OpenAiProvider, Provider};

/// Builds provider clients from a settings snapshot.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    /// Client for the active provider.
    fn create(&self, settings: &Settings) -> Result<Arc<dyn CompletionProvider>, ProviderError>;

    /// Models offered by `provider` under the current credentials.
    async fn list_models(
        &self,
        settings: &Settings,
        provider: Provider,
    ) -> Result<Vec<String>, ProviderError>;
}

/// Factory for the real HTTP clients, sharing one connection pool.
#[derive(Debug, Clone, Default)]
pub struct DefaultProviderFactory {
    client: reqwest::Client,
    gemini_base_url: Option<String>,
}

impl DefaultProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send Gemini requests somewhere other than the public endpoint.
    pub fn with_gemini_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.gemini_base_url = Some(base_url.into());
        self
    }

    fn gemini(&self, settings: &Settings) -> Result<GeminiProvider, ProviderError> {
        let provider = GeminiProvider::with_client(&settings.gemini, self.client.clone())?;
        Ok(match &self.gemini_base_url {
            Some(url) => provider.with_base_url(url.clone()),
            None => provider,
        })
    }
}

#[async_trait]
impl ProviderFactory for DefaultProviderFactory {
    fn create(&self, settings: &Settings) -> Result<Arc<dyn CompletionProvider>, ProviderError> {
        Ok(match settings.provider {
            Provider::OpenAi => Arc::new(OpenAiProvider::with_client(
                &settings.openai,
                self.client.clone(),
            )?),
            Provider::Gemini => Arc::new(self.gemini(settings)?),
        })
    }

    async fn list_models(
        &self,
        settings: &Settings,
        provider: Provider,
    ) -> Result<Vec<String>, ProviderError> {
        match provider {
            Provider::OpenAi => {
                OpenAiProvider::with_client(&settings.openai, self.client.clone())?
                    .list_models()
                    .await
            }
            Provider::Gemini => Err(ProviderError::Unsupported {
                provider,
                operation: "model listing",
            }),
        }
    }
}
