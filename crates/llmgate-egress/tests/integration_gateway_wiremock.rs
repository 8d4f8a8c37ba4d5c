//! End-to-end gateway tests against mocked provider APIs
//!
//! Each test points one provider's base URL at a wiremock server and drives
//! the full build → send → aggregate/extract pipeline.

use llmgate_core::{
    CancelReason, CanonicalChatRequest, Error, Gateway, ProviderCredentials, ProviderId,
    RetryPolicy,
};
use llmgate_egress::{HttpClientConfig, HttpGateway, HttpTransport};
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path, query_param},
};

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 5,
        base_delay: Duration::from_millis(1),
        max_jitter: Duration::from_millis(2),
    }
}

fn gateway_for(provider: ProviderId, server: &MockServer) -> HttpGateway {
    let transport = HttpTransport::from_config(&HttpClientConfig::default(), fast_policy())
        .unwrap()
        .with_seed(7);
    let mut credentials = HashMap::new();
    credentials.insert(
        provider,
        ProviderCredentials::new("test-key").with_base_url(server.uri()),
    );
    HttpGateway::new(transport, credentials)
}

fn sse(frames: &[&str]) -> ResponseTemplate {
    let body: String = frames.iter().map(|f| format!("data: {}\n\n", f)).collect();
    ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/event-stream")
}

#[tokio::test]
async fn test_openai_streaming_generation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .and(header("accept", "text/event-stream"))
        .and(body_partial_json(json!({"model": "gpt-4o", "stream": true})))
        .respond_with(sse(&[
            r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
            r#"{"choices":[{"delta":{"content":"x = "}}]}"#,
            r#"{"choices":[{"delta":{"content":"4"}}]}"#,
            "[DONE]",
        ]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = gateway_for(ProviderId::OpenAI, &mock_server);
    let request = CanonicalChatRequest::new(ProviderId::OpenAI, "gpt-4o")
        .with_system("Be brief.")
        .with_user("Solve 2x = 8")
        .streaming(true);

    let response = gateway
        .generate(request, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.text, "x = 4");
    assert_eq!(response.provider, ProviderId::OpenAI);
    assert_eq!(response.model, "gpt-4o");
    assert!(!response.was_fallback_used);
}

#[tokio::test]
async fn test_openai_buffered_generation() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"stream": false, "max_tokens": 100})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello from mock API!"},
                "finish_reason": "stop"
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = gateway_for(ProviderId::OpenAI, &mock_server);
    let request = CanonicalChatRequest::new(ProviderId::OpenAI, "gpt-4o")
        .with_user("Hello!")
        .with_max_tokens(100);

    let response = gateway
        .generate(request, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.text, "Hello from mock API!");
}

#[tokio::test]
async fn test_gemini_streaming_uses_query_key() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-1.5-flash:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .and(query_param("key", "test-key"))
        .and(body_partial_json(json!({
            "contents": [
                {"role": "model", "parts": [{"text": "You are a tutor."}]},
                {"role": "user", "parts": [{"text": "Count apples"}]}
            ]
        })))
        .respond_with(sse(&[
            r#"{"candidates":[{"content":{"parts":[{"text":"Two "}],"role":"model"}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"text":"apples"}],"role":"model"},"finishReason":"STOP"}]}"#,
        ]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = gateway_for(ProviderId::Gemini, &mock_server);
    let request = CanonicalChatRequest::new(ProviderId::Gemini, "gemini-1.5-flash")
        .with_system("You are a tutor.")
        .with_user("Count apples")
        .streaming(true);

    let response = gateway
        .generate(request, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.text, "Two apples");
}

#[tokio::test]
async fn test_anthropic_buffered_even_when_streaming_requested() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-5-sonnet-20241022",
            "messages": [{"role": "user", "content": "Be brief.\n\nHi"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_123",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "Hello from Claude"}],
            "stop_reason": "end_turn"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = gateway_for(ProviderId::Anthropic, &mock_server);
    let request = CanonicalChatRequest::new(ProviderId::Anthropic, "claude-3-5-sonnet-20241022")
        .with_system("Be brief.")
        .with_user("Hi")
        .streaming(true);

    let response = gateway
        .generate(request, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(response.text, "Hello from Claude");
}

#[tokio::test]
async fn test_malformed_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "message",
            "content": []
        })))
        .mount(&mock_server)
        .await;

    let gateway = gateway_for(ProviderId::Anthropic, &mock_server);
    let request = CanonicalChatRequest::new(ProviderId::Anthropic, "claude-3-haiku").with_user("Hi");

    match gateway.generate(request, CancellationToken::new()).await {
        Err(Error::MalformedProviderResponse(msg)) => assert!(msg.contains("content[0]"), "{}", msg),
        other => panic!("expected MalformedProviderResponse, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rate_limited_then_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .up_to_n_times(3)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "finally"}}]
        })))
        .mount(&mock_server)
        .await;

    let gateway = gateway_for(ProviderId::DeepSeek, &mock_server);
    let request = CanonicalChatRequest::new(ProviderId::DeepSeek, "deepseek-chat").with_user("Hi");

    let response = gateway
        .generate(request, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(response.text, "finally");
    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 4);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {"message": "Invalid model", "type": "invalid_request_error"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let gateway = gateway_for(ProviderId::Grok, &mock_server);
    let request = CanonicalChatRequest::new(ProviderId::Grok, "grok-nope").with_user("Hi");

    match gateway.generate(request, CancellationToken::new()).await {
        Err(Error::ProviderCallFailed {
            status,
            body,
            attempts,
        }) => {
            assert_eq!(status, Some(400));
            assert!(body.contains("Invalid model"));
            assert_eq!(attempts, 1);
        }
        other => panic!("expected ProviderCallFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_errors_exhaust_attempts() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("x".repeat(10_000)))
        .expect(5)
        .mount(&mock_server)
        .await;

    let gateway = gateway_for(ProviderId::OpenAI, &mock_server);
    let request = CanonicalChatRequest::new(ProviderId::OpenAI, "gpt-4o").with_user("Hi");

    match gateway.generate(request, CancellationToken::new()).await {
        Err(Error::ProviderCallFailed {
            status,
            body,
            attempts,
        }) => {
            assert_eq!(status, Some(503));
            assert_eq!(attempts, 5);
            assert!(body.len() < 10_000);
        }
        other => panic!("expected ProviderCallFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_deadline_elapses() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "late"}}]}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let gateway =
        gateway_for(ProviderId::OpenAI, &mock_server).with_call_timeout(Duration::from_millis(100));
    let request = CanonicalChatRequest::new(ProviderId::OpenAI, "gpt-4o").with_user("Hi");

    match gateway.generate(request, CancellationToken::new()).await {
        Err(Error::Cancelled { reason }) => assert_eq!(reason, CancelReason::Deadline),
        other => panic!("expected deadline cancellation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_caller_cancellation_mid_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"choices": [{"message": {"content": "late"}}]}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let gateway = gateway_for(ProviderId::OpenAI, &mock_server);
    let request = CanonicalChatRequest::new(ProviderId::OpenAI, "gpt-4o").with_user("Hi");

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    match gateway.generate(request, cancel).await {
        Err(Error::Cancelled { reason }) => assert_eq!(reason, CancelReason::Caller),
        other => panic!("expected caller cancellation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_concurrent_calls_share_one_gateway() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "ok"}}]
        })))
        .expect(8)
        .mount(&mock_server)
        .await;

    let gateway = std::sync::Arc::new(gateway_for(ProviderId::OpenAI, &mock_server));
    let mut handles = Vec::new();
    for i in 0..8 {
        let gateway = gateway.clone();
        handles.push(tokio::spawn(async move {
            let request =
                CanonicalChatRequest::new(ProviderId::OpenAI, "gpt-4o").with_user(format!("q{}", i));
            gateway.generate(request, CancellationToken::new()).await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().text, "ok");
    }
}
