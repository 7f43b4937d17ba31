//! Mock HTTP server tests for `OpenAiCompatProvider::complete()`.
//!
//! A local `wiremock` server emulates an OpenAI-compatible chat completions
//! endpoint so the full request/response path runs without a real platform.

use std::time::Duration;

use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use firmaudit_llm::{
    ChatMessage, ChatRequest, LlmProviderConfig, OpenAiCompatProvider, Provider, ProviderError,
    RetryConfig, RetryPolicy,
};

fn provider(server: &MockServer) -> OpenAiCompatProvider {
    let config = LlmProviderConfig::with_base_url("mock", server.uri());
    OpenAiCompatProvider::try_new(config, "sk-mock-key".into()).unwrap()
}

fn request() -> ChatRequest {
    let mut req = ChatRequest::new("test-model", vec![ChatMessage::user("Hello")]);
    req.temperature = Some(0.0);
    req
}

fn completion(content: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
    })
}

#[tokio::test]
async fn success_text_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer sk-mock-key"))
        .and(body_partial_json(serde_json::json!({
            "model": "test-model",
            "temperature": 0.0,
            "messages": [{"role": "user", "content": "Hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("Hi there".into())))
        .expect(1)
        .mount(&server)
        .await;

    let response = provider(&server).complete(&request()).await.unwrap();
    assert_eq!(response.id, "chatcmpl-1");
    assert_eq!(response.text(), Some("Hi there"));
    assert_eq!(response.usage.unwrap().total_tokens, 15);
}

#[tokio::test]
async fn success_with_content_parts() {
    let server = MockServer::start().await;
    let parts = serde_json::json!([{"type": "text", "text": "{\"a\": "}, {"type": "text", "text": "1}"}]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(parts)))
        .mount(&server)
        .await;

    let response = provider(&server).complete(&request()).await.unwrap();
    assert_eq!(response.text(), Some("{\"a\": 1}"));
}

#[tokio::test]
async fn status_401_is_auth_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(r#"{"error":{"message":"Invalid API key"}}"#),
        )
        .mount(&server)
        .await;

    let err = provider(&server).complete(&request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::AuthFailed(ref m) if m == "Invalid API key"));
    assert!(err.is_setup_rejection());
}

#[tokio::test]
async fn status_404_is_model_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such model"))
        .mount(&server)
        .await;

    let err = provider(&server).complete(&request()).await.unwrap_err();
    match err {
        ProviderError::ModelNotFound(msg) => assert!(msg.contains("test-model")),
        other => panic!("expected ModelNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn status_400_is_setup_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_string(
            r#"{"error":{"message":"model `test-model` is not a valid model id"}}"#,
        ))
        .mount(&server)
        .await;

    let err = provider(&server).complete(&request()).await.unwrap_err();
    assert!(err.is_setup_rejection());
    match err {
        ProviderError::InvalidConfig(msg) => {
            assert!(msg.contains("400"));
            assert!(msg.contains("not a valid model id"));
        }
        other => panic!("expected InvalidConfig, got {other:?}"),
    }
}

#[tokio::test]
async fn status_422_is_setup_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(422).set_body_string("unknown parameter top_k"))
        .mount(&server)
        .await;

    let err = provider(&server).complete(&request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidConfig(ref m) if m.contains("top_k")));
}

#[tokio::test]
async fn status_429_uses_retry_after_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "3")
                .set_body_string("slow down"),
        )
        .mount(&server)
        .await;

    let err = provider(&server).complete(&request()).await.unwrap_err();
    assert!(matches!(
        err,
        ProviderError::RateLimited {
            retry_after_ms: 3000
        }
    ));
}

#[tokio::test]
async fn status_429_quota_is_not_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).set_body_string(
            r#"{"error":{"message":"You exceeded your quota","code":"insufficient_quota"}}"#,
        ))
        .mount(&server)
        .await;

    let err = provider(&server).complete(&request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::RequestFailed(ref m) if m.contains("quota")));
}

#[tokio::test]
async fn status_503_is_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = provider(&server).complete(&request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::ServerError { status: 503, .. }));
}

#[tokio::test]
async fn malformed_body_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json {{{"))
        .mount(&server)
        .await;

    let err = provider(&server).complete(&request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(_)));
}

#[tokio::test]
async fn empty_choices_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"id": "x", "model": "m", "choices": []})),
        )
        .mount(&server)
        .await;

    let err = provider(&server).complete(&request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::InvalidResponse(ref m) if m.contains("no choices")));
}

#[tokio::test]
async fn client_timeout_maps_to_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("late".into()))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = LlmProviderConfig::with_base_url("mock", server.uri());
    config.timeout_secs = Some(1);
    let provider = OpenAiCompatProvider::try_new(config, "k".into()).unwrap();

    let err = provider.complete(&request()).await.unwrap_err();
    assert!(matches!(err, ProviderError::Timeout), "got {err:?}");
}

#[tokio::test]
async fn custom_headers_forwarded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("X-Client-Name", "firmaudit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok".into())))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = LlmProviderConfig::with_base_url("mock", server.uri());
    config
        .headers
        .insert("X-Client-Name".into(), "firmaudit".into());
    let provider = OpenAiCompatProvider::try_new(config, "k".into()).unwrap();
    assert_eq!(provider.complete(&request()).await.unwrap().text(), Some("ok"));
}

#[tokio::test]
async fn retry_policy_recovers_from_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("recovered".into())))
        .expect(1)
        .mount(&server)
        .await;

    let provider = provider(&server);
    let req = request();
    let policy = RetryPolicy::new(RetryConfig {
        max_retries: 2,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        jitter_fraction: 0.0,
    });
    let out = policy.run("mock", |_| provider.complete(&req)).await;
    assert_eq!(out.attempts, 2);
    assert_eq!(out.result.unwrap().text(), Some("recovered"));
}
