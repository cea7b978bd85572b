//! Gemini `generateContent` client.
//!
//! The whole transcript goes out as a single user turn, one text part per
//! message, the way a fresh chat session sends its first message. Gemini does
//! not take a system role in this mode, so the system prompt travels as the
//! first part.
//!
//! Model listing is not offered: the public API does not return the
//! generation-capable models in a form usable for selection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeminiSettings;
use crate::error::ProviderError;

use super::{ChatMessage, CompletionProvider, Provider, non_empty_completion, send_json};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GeminiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl GeminiProvider {
    /// Fails with `MissingCredential` if no API key is configured.
    pub fn new(settings: &GeminiSettings) -> Result<Self, ProviderError> {
        Self::with_client(settings, reqwest::Client::new())
    }

    pub fn with_client(
        settings: &GeminiSettings,
        client: reqwest::Client,
    ) -> Result<Self, ProviderError> {
        let api_key = settings
            .api_key()
            .ok_or(ProviderError::MissingCredential(Provider::Gemini))?
            .to_string();

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: settings.model().to_string(),
            temperature: settings.temperature,
        })
    }

    /// Point the client at another endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

fn request_body(messages: &[ChatMessage], temperature: f32) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts: messages
                .iter()
                .map(|m| Part {
                    text: m.content.as_str(),
                })
                .collect(),
        }],
        generation_config: GenerationConfig { temperature },
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        debug!("POST {} parts={}", url, messages.len());

        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(messages, self.temperature));

        let response: GenerateContentResponse = send_json(Provider::Gemini, request).await?;
        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            });

        non_empty_completion(Provider::Gemini, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_fails_eagerly() {
        let result = GeminiProvider::new(&GeminiSettings::default());
        assert!(matches!(
            result,
            Err(ProviderError::MissingCredential(Provider::Gemini))
        ));
    }

    #[test]
    fn test_request_body_is_single_user_turn() {
        let messages = vec![
            ChatMessage::system("rules"),
            ChatMessage::user("context"),
            ChatMessage::user("+diff"),
        ];
        let json = serde_json::to_value(request_body(&messages, 0.7)).unwrap();

        let contents = json["contents"].as_array().unwrap();
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
        let parts = contents[0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0]["text"], "rules");
        assert_eq!(parts[2]["text"], "+diff");
        assert!((json["generationConfig"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_with_base_url_trims_slash() {
        let settings = GeminiSettings {
            api_key: "g".to_string(),
            ..GeminiSettings::default()
        };
        let provider = GeminiProvider::new(&settings)
            .unwrap()
            .with_base_url("http://localhost:9999/");
        assert_eq!(provider.base_url, "http://localhost:9999");
        assert_eq!(provider.model(), "gemini-1.5-flash");
    }
}
