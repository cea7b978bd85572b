//! Integration tests for the OpenAI-compatible client with a mocked endpoint.

use ai_commit::config::OpenAiSettings;
use ai_commit::llm::{ChatMessage, CompletionProvider, OpenAiProvider, Provider};
use ai_commit::ProviderError;
use serde_json::json;
use wiremock::matchers::{bearer_token, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(base_url: &str) -> OpenAiSettings {
    OpenAiSettings {
        api_key: "sk-test".to_string(),
        base_url: base_url.to_string(),
        ..OpenAiSettings::default()
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }
        ]
    })
}

fn messages() -> Vec<ChatMessage> {
    vec![ChatMessage::system("rules"), ChatMessage::user("+added line\n")]
}

#[tokio::test]
async fn test_completion_returns_first_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(bearer_token("sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "messages": [
                { "role": "system", "content": "rules" },
                { "role": "user", "content": "+added line\n" }
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("✨ feat(x): add line")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(&settings(&server.uri())).unwrap();
    let message = provider.complete(&messages()).await.unwrap();

    assert_eq!(message, "✨ feat(x): add line");
}

#[tokio::test]
async fn test_azure_style_auth_uses_header_and_version() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(query_param("api-version", "2024-02-01"))
        .and(header("api-key", "sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("fix: azure")))
        .expect(1)
        .mount(&server)
        .await;

    let mut azure = settings(&server.uri());
    azure.api_version = "2024-02-01".to_string();
    let provider = OpenAiProvider::new(&azure).unwrap();
    assert!(provider.uses_api_key_header());

    let message = provider.complete(&messages()).await.unwrap();
    assert_eq!(message, "fix: azure");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_rate_limit_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": { "message": "Rate limit reached for requests", "type": "requests" }
        })))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(&settings(&server.uri())).unwrap();
    let err = provider.complete(&messages()).await.unwrap_err();

    assert_eq!(err.status(), Some(429));
    match err {
        ProviderError::Api { message, .. } => {
            assert_eq!(message, "Rate limit reached for requests")
        }
        other => panic!("Expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_blank_content_is_empty_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("   ")))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(&settings(&server.uri())).unwrap();
    let err = provider.complete(&messages()).await.unwrap_err();
    assert!(matches!(err, ProviderError::EmptyCompletion(Provider::OpenAi)));
}

#[tokio::test]
async fn test_missing_choices_is_empty_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(&settings(&server.uri())).unwrap();
    let err = provider.complete(&messages()).await.unwrap_err();
    assert!(matches!(err, ProviderError::EmptyCompletion(Provider::OpenAi)));
}

#[tokio::test]
async fn test_list_models_sorted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/models"))
        .and(bearer_token("sk-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [
                { "id": "gpt-4o-mini", "object": "model" },
                { "id": "gpt-4o", "object": "model" },
                { "id": "gpt-4o", "object": "model" }
            ]
        })))
        .mount(&server)
        .await;

    let provider = OpenAiProvider::new(&settings(&server.uri())).unwrap();
    let models = provider.list_models().await.unwrap();
    assert_eq!(models, vec!["gpt-4o", "gpt-4o-mini"]);
}
