//! Integration tests for request dispatch

use ai_chat_bridge::adapters::AzureOpenAiAdapter;
use ai_chat_bridge::{
    AdapterRegistry, ChatMessage, ChatOutcome, Dispatcher, Error, FinishReason, NoopHooks,
    ProviderType, RequestOptions, UnifiedRequest,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::fake_transport::FakeTransport;
use crate::mock_server::MockServerFixture;
use crate::CountingHooks;

const CHAT_COMPLETION: &str = r#"{
    "id": "chatcmpl-42",
    "model": "test-model",
    "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hello there"}, "finish_reason": "stop"}],
    "usage": {"prompt_tokens": 5, "completion_tokens": 2, "total_tokens": 7}
}"#;

fn fake_dispatcher(transport: Arc<FakeTransport>) -> Dispatcher {
    Dispatcher::builder().transport(transport).build().unwrap()
}

#[tokio::test]
async fn test_non_streaming_openai_call() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_json_response(
            "/v1/chat/completions",
            json!({
                "model": "test-model",
                "stream": false,
                "messages": [{"role": "user", "content": "hi"}]
            }),
            200,
            CHAT_COMPLETION,
        )
        .await;

    let hooks = CountingHooks::default();
    let req = fixture.request(ProviderType::OpenAi, "hi").with_stream(false);
    let outcome = fixture
        .dispatcher()
        .unified_chat_request(&req, CancellationToken::new(), &hooks)
        .await
        .unwrap();

    let resp = outcome.into_response().expect("complete response");
    assert_eq!(resp.id, "chatcmpl-42");
    assert_eq!(resp.content, "Hello there");
    assert_eq!(resp.finish_reason, FinishReason::Stop);
    assert_eq!(resp.usage.unwrap().total_tokens, 7);
    assert_eq!(hooks.counts(), (1, 1));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_rate_limited_surfaces_body_and_status_text() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_error_response("/v1/chat/completions", 429, r#"{"error":"rate_limited"}"#)
        .await;

    let hooks = CountingHooks::default();
    let req = fixture.request(ProviderType::OpenAi, "hi");
    let err = fixture
        .dispatcher()
        .unified_chat_request(&req, CancellationToken::new(), &hooks)
        .await
        .unwrap_err();

    let text = err.to_string();
    assert!(text.contains("rate_limited"), "{}", text);
    assert!(text.contains("Too Many Requests"), "{}", text);
    match err {
        Error::Remote { status, body, .. } => {
            assert_eq!(status, 429);
            assert_eq!(body["error"], "rate_limited");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(hooks.counts(), (1, 1));
}

#[tokio::test]
async fn test_claude_messages_call_sends_vendor_headers() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .match_header("anthropic-version", "2023-06-01")
            .match_body(mockito::Matcher::PartialJson(json!({
                "system": "be brief",
                "max_tokens": 4096
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id":"msg_1","model":"claude-x","content":[{"type":"text","text":"Hi!"}],"stop_reason":"end_turn","usage":{"input_tokens":3,"output_tokens":2}}"#,
            )
            .create_async()
            .await
    };

    let req = fixture
        .request(ProviderType::Claude, "hello")
        .with_prompt("be brief")
        .with_stream(false);
    let resp = fixture
        .dispatcher()
        .unified_chat_request(&req, CancellationToken::new(), &NoopHooks)
        .await
        .unwrap()
        .into_response()
        .unwrap();

    assert_eq!(resp.content, "Hi!");
    assert_eq!(resp.usage.unwrap().total_tokens, 5);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_adapter_fails_before_any_hook() {
    let transport = Arc::new(FakeTransport::ok(&[CHAT_COMPLETION]));
    let dispatcher = fake_dispatcher(transport.clone());
    let hooks = CountingHooks::default();

    let req = UnifiedRequest::new(ProviderType::Claude, "http://localhost", "k", "m")
        .with_api_version("v3");
    let err = dispatcher
        .unified_chat_request(&req, CancellationToken::new(), &hooks)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Configuration { .. }));
    assert_eq!(hooks.counts(), (0, 0));
    assert!(transport.sent().is_empty());
}

#[tokio::test]
async fn test_cancelled_before_send() {
    let transport = Arc::new(FakeTransport::ok(&[CHAT_COMPLETION]));
    let dispatcher = fake_dispatcher(transport);
    let hooks = CountingHooks::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let req = UnifiedRequest::new(ProviderType::OpenAi, "http://localhost", "k", "m").with_stream(false);
    let err = dispatcher
        .unified_chat_request(&req, cancel, &hooks)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(hooks.counts(), (1, 1));
}

#[tokio::test]
async fn test_sent_body_uses_wire_casing_and_keeps_caller_request() {
    let transport = Arc::new(FakeTransport::ok(&[CHAT_COMPLETION]));
    let dispatcher = fake_dispatcher(transport.clone());

    let req = UnifiedRequest::new(ProviderType::OpenAi, "http://localhost:9/", "k", "m")
        .with_stream(false)
        .with_messages(vec![
            ChatMessage::user("weather?"),
            ChatMessage::assistant("").with_tool_calls(vec![ai_chat_bridge::ToolCall::new(
                "call_1", 0, "weather", "{}",
            )]),
            ChatMessage::tool("call_1", "sunny"),
        ]);
    let snapshot = req.clone();

    dispatcher
        .unified_chat_request(&req, CancellationToken::new(), &NoopHooks)
        .await
        .unwrap();

    assert_eq!(req, snapshot);
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].url, "http://localhost:9/v1/chat/completions");
    let msgs = sent[0].body["messages"].as_array().unwrap();
    assert_eq!(msgs[1]["tool_calls"][0]["function"]["name"], "weather");
    assert!(msgs[1].get("toolCalls").is_none());
    assert_eq!(msgs[2]["tool_call_id"], "call_1");
}

#[tokio::test]
async fn test_rejected_override_sends_unmodified_body() {
    let transport = Arc::new(FakeTransport::ok(&[CHAT_COMPLETION]));
    let dispatcher = fake_dispatcher(transport.clone());

    let base = UnifiedRequest::new(ProviderType::OpenAi, "http://localhost", "k", "m")
        .with_stream(false)
        .with_messages(vec![ChatMessage::user("hi")]);

    dispatcher
        .unified_chat_request(&base, CancellationToken::new(), &NoopHooks)
        .await
        .unwrap();
    let overridden = base
        .clone()
        .with_request_overrides(json!({"temperature": 0.0, "nested": [{"messages": []}]}));
    dispatcher
        .unified_chat_request(&overridden, CancellationToken::new(), &NoopHooks)
        .await
        .unwrap();

    let sent = transport.sent();
    assert_eq!(
        serde_json::to_string(&sent[0].body).unwrap(),
        serde_json::to_string(&sent[1].body).unwrap()
    );
}

#[tokio::test]
async fn test_azure_deployment_endpoint_and_key_header() {
    let transport = Arc::new(FakeTransport::ok(&[CHAT_COMPLETION]));
    let registry = Arc::new(AdapterRegistry::with_default_adapters());
    registry.register(AzureOpenAiAdapter::new("prod-gpt4o", "2024-06-01"));
    let dispatcher = Dispatcher::builder()
        .registry(registry)
        .transport(transport.clone())
        .build()
        .unwrap();

    let req = UnifiedRequest::new(
        ProviderType::AzureOpenAi,
        "https://contoso.openai.azure.com",
        "az-key",
        "gpt-4o",
    )
    .with_stream(false)
    .with_options(RequestOptions {
        max_tokens: Some(64),
        ..Default::default()
    })
    .with_messages(vec![ChatMessage::user("hi")]);

    let outcome = dispatcher
        .unified_chat_request(&req, CancellationToken::new(), &NoopHooks)
        .await
        .unwrap();
    assert!(matches!(outcome, ChatOutcome::Complete(_)));

    let sent = transport.sent();
    assert_eq!(
        sent[0].url,
        "https://contoso.openai.azure.com/openai/deployments/prod-gpt4o/chat/completions?api-version=2024-06-01"
    );
    assert_eq!(sent[0].headers["api-key"], "az-key");
    assert!(!sent[0].headers.contains_key("authorization"));
    assert_eq!(sent[0].body["max_tokens"], 64);
}

#[tokio::test]
async fn test_invalid_vendor_json_is_protocol_error() {
    let transport = Arc::new(FakeTransport::ok(&[r#"{"id":"x","choices":[]}"#]));
    let dispatcher = fake_dispatcher(transport);
    let hooks = CountingHooks::default();

    let req = UnifiedRequest::new(ProviderType::OpenAi, "http://localhost", "k", "m").with_stream(false);
    let err = dispatcher
        .unified_chat_request(&req, CancellationToken::new(), &hooks)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(hooks.counts(), (1, 1));
}

#[tokio::test]
async fn test_cancel_while_reading_error_body() {
    let transport = Arc::new(FakeTransport::status(500, "Internal Server Error", "partial").hanging());
    let dispatcher = fake_dispatcher(transport);
    let hooks = CountingHooks::default();
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let req = UnifiedRequest::new(ProviderType::OpenAi, "http://localhost", "k", "m");
    let err = tokio::time::timeout(
        Duration::from_secs(2),
        dispatcher.unified_chat_request(&req, cancel, &hooks),
    )
    .await
    .expect("cancellation should end the call")
    .unwrap_err();

    assert!(err.is_cancelled(), "{:?}", err);
    assert_eq!(hooks.counts(), (1, 1));
}

#[tokio::test]
async fn test_unreadable_error_body_still_reports_status() {
    let transport = Arc::new(FakeTransport::status(502, "Bad Gateway", "half a bo").failing());
    let dispatcher = fake_dispatcher(transport);

    let req = UnifiedRequest::new(ProviderType::OpenAi, "http://localhost", "k", "m");
    let err = dispatcher
        .unified_chat_request(&req, CancellationToken::new(), &NoopHooks)
        .await
        .unwrap_err();

    match err {
        Error::Remote { status, status_text, body, .. } => {
            assert_eq!(status, 502);
            assert_eq!(status_text, "Bad Gateway");
            assert_eq!(body, serde_json::Value::String(String::new()));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}
