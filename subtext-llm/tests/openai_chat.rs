use serde_json::json;
use subtext_common::SubtextError;
use subtext_llm::openai::OpenAiClient;
use subtext_llm::traits::LlmClient;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "gpt-4.1-mini-2025-04-14",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
    })
}

async fn client_for(server: &MockServer) -> OpenAiClient {
    OpenAiClient::with_base_url(
        "sk-test".into(),
        "gpt-4.1-mini".into(),
        &format!("{}/v1", server.uri()),
    )
    .expect("client builds")
}

#[tokio::test]
async fn sends_system_and_user_messages_in_json_mode() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4.1-mini",
            "messages": [
                {"role": "system", "content": "SYS"},
                {"role": "user", "content": "USER"}
            ],
            "response_format": {"type": "json_object"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("{\"ok\":true}")))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let resp = client
        .generate("USER", Some("SYS"), None, Some(0.2))
        .await
        .expect("completion succeeds");

    assert_eq!(resp.text, "{\"ok\":true}");
    assert_eq!(resp.tokens_used, Some(17));
    assert_eq!(resp.finish_reason.as_deref(), Some("stop"));
    assert_eq!(resp.model.as_deref(), Some("gpt-4.1-mini-2025-04-14"));
}

#[tokio::test]
async fn rate_limit_is_reported_once_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(429)
                .set_body_json(json!({"error": {"message": "Rate limit reached"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.generate("x", None, None, None).await.unwrap_err();
    assert!(matches!(err, SubtextError::RateLimit), "{err}");
}

#[tokio::test]
async fn bad_key_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"error": {"message": "Incorrect API key provided"}})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    match client.generate("x", None, None, None).await {
        Err(SubtextError::Auth(msg)) => assert!(msg.contains("Incorrect API key")),
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_content_is_a_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("   ")))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.generate("x", None, None, None).await.unwrap_err();
    assert!(matches!(err, SubtextError::Provider(_)), "{err}");
}

#[tokio::test]
async fn json_mode_can_be_disabled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("plain")))
        .mount(&server)
        .await;

    let client = client_for(&server).await.with_json_mode(false);
    client.generate("x", None, None, None).await.unwrap();

    let received = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert!(body.get("response_format").is_none());
}
