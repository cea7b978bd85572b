//! OpenAI-compatible chat completions (OpenAI, proxies, Azure OpenAI).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OpenAiSettings;
use crate::error::ProviderError;

use super::{ChatMessage, CompletionProvider, Provider, non_empty_completion, send_json};

/// Endpoint used when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// How requests authenticate.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Auth {
    /// `Authorization: Bearer <key>`
    Bearer(String),
    /// Azure style: `api-key: <key>` header and `api-version` query parameter.
    ApiKeyHeader { key: String, version: String },
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

/// Client for `/chat/completions` on an OpenAI-compatible endpoint.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    auth: Auth,
    model: String,
    temperature: f32,
}

impl OpenAiProvider {
    /// Build a provider from settings.
    ///
    /// Fails with `MissingCredential` before any network traffic if the API
    /// key is unset. An API version only takes effect together with a base
    /// URL, mirroring how Azure deployments are addressed.
    pub fn new(settings: &OpenAiSettings) -> Result<Self, ProviderError> {
        Self::with_client(settings, reqwest::Client::new())
    }

    pub fn with_client(
        settings: &OpenAiSettings,
        client: reqwest::Client,
    ) -> Result<Self, ProviderError> {
        let key = settings
            .api_key()
            .ok_or(ProviderError::MissingCredential(Provider::OpenAi))?
            .to_string();

        let (base_url, auth) = match settings.base_url() {
            Some(base) => {
                let auth = match settings.api_version() {
                    Some(version) => Auth::ApiKeyHeader {
                        key,
                        version: version.to_string(),
                    },
                    None => Auth::Bearer(key),
                };
                (base.trim_end_matches('/').to_string(), auth)
            }
            None => (DEFAULT_BASE_URL.to_string(), Auth::Bearer(key)),
        };

        Ok(Self {
            client,
            base_url,
            auth,
            model: settings.model().to_string(),
            temperature: settings.temperature,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether requests use Azure-style header + query authentication.
    pub fn uses_api_key_header(&self) -> bool {
        matches!(self.auth, Auth::ApiKeyHeader { .. })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::Bearer(key) => request.bearer_auth(key),
            Auth::ApiKeyHeader { key, version } => request
                .query(&[("api-version", version.as_str())])
                .header("api-key", key),
        }
    }

    /// Model identifiers the endpoint offers, sorted.
    pub async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let request = self.authorize(self.client.get(&url));

        let list: ModelList = send_json(Provider::OpenAi, request).await?;
        let mut ids: Vec<String> = list.data.into_iter().map(|m| m.id).collect();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    fn provider(&self) -> Provider {
        Provider::OpenAi
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            "POST {} model={} messages={} temperature={}",
            url,
            self.model,
            messages.len(),
            self.temperature
        );

        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
        };
        let request = self.authorize(self.client.post(&url)).json(&body);

        let response: ChatCompletionResponse = send_json(Provider::OpenAi, request).await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content);

        non_empty_completion(Provider::OpenAi, content)
    }
}
