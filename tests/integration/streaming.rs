//! Integration tests for streaming responses

use ai_chat_bridge::{ChatOutcome, Dispatcher, FinishReason, NoopHooks, ProviderType, UnifiedRequest};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::fake_transport::FakeTransport;
use crate::mock_server::MockServerFixture;
use crate::CountingHooks;

#[tokio::test]
async fn test_openai_sse_stream_collects_text() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_sse_stream(
            "/v1/chat/completions",
            vec![
                r#"{"id":"c1","model":"test-model","choices":[{"index":0,"delta":{"role":"assistant"}}]}"#,
                r#"{"id":"c1","model":"test-model","choices":[{"index":0,"delta":{"content":"Hello"}}]}"#,
                r#"{"id":"c1","model":"test-model","choices":[{"index":0,"delta":{"content":" World"}}]}"#,
                r#"{"id":"c1","model":"test-model","choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#,
                "[DONE]",
            ],
        )
        .await;

    let hooks = CountingHooks::default();
    let req = fixture.request(ProviderType::OpenAi, "hi");
    let outcome = fixture
        .dispatcher()
        .unified_chat_request(&req, CancellationToken::new(), &hooks)
        .await
        .unwrap();

    // after_call fires once the stream is handed back, not when it ends
    assert_eq!(hooks.counts(), (1, 1));

    let increments: Vec<_> = outcome
        .into_stream()
        .expect("stream outcome")
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .collect::<ai_chat_bridge::Result<_>>()
        .unwrap();

    let text: String = increments.iter().filter_map(|i| i.content.as_deref()).collect();
    assert_eq!(text, "Hello World");
    assert_eq!(increments.len(), 3);
    assert_eq!(increments.last().unwrap().finish_reason, Some(FinishReason::Stop));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_claude_event_stream() {
    let fixture = MockServerFixture::new().await;
    let _mock = fixture
        .mock_sse_stream(
            "/v1/messages",
            vec![
                "event: message_start",
                r#"data: {"type":"message_start","message":{"id":"msg_1","model":"claude-x","usage":{"input_tokens":12,"output_tokens":1}}}"#,
                "event: content_block_delta",
                r#"data: {"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Bonjour"}}"#,
                "event: message_delta",
                r#"data: {"type":"message_delta","delta":{"stop_reason":"end_turn"},"usage":{"output_tokens":4}}"#,
                "event: message_stop",
                r#"data: {"type":"message_stop"}"#,
            ],
        )
        .await;

    let req = fixture.request(ProviderType::Claude, "salut");
    let stream = fixture
        .dispatcher()
        .unified_chat_request(&req, CancellationToken::new(), &NoopHooks)
        .await
        .unwrap()
        .into_stream()
        .unwrap();

    let increments: Vec<_> = stream.map(|r| r.unwrap()).collect().await;
    let text: String = increments.iter().filter_map(|i| i.content.as_deref()).collect();
    assert_eq!(text, "Bonjour");
    let last = increments.last().unwrap();
    assert_eq!(last.finish_reason, Some(FinishReason::Stop));
    let usage = last.usage.unwrap();
    assert_eq!((usage.prompt_tokens, usage.completion_tokens, usage.total_tokens), (12, 4, 16));
}

#[tokio::test]
async fn test_remote_error_on_streaming_call() {
    let transport = Arc::new(FakeTransport::status(
        503,
        "Service Unavailable",
        "upstream overloaded",
    ));
    let dispatcher = Dispatcher::builder().transport(transport).build().unwrap();
    let hooks = CountingHooks::default();

    let req = UnifiedRequest::new(ProviderType::OpenAi, "http://localhost", "k", "m");
    let err = dispatcher
        .unified_chat_request(&req, CancellationToken::new(), &hooks)
        .await
        .unwrap_err();

    let text = err.to_string();
    assert!(text.contains("upstream overloaded"), "{}", text);
    assert!(text.contains("Service Unavailable"), "{}", text);
    assert_eq!(hooks.counts(), (1, 1));
}

#[tokio::test]
async fn test_cancel_mid_stream_ends_it() {
    let transport = Arc::new(
        FakeTransport::ok(&[
            "data: {\"id\":\"c1\",\"model\":\"m\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"partial\"}}]}\n\n",
        ])
        .hanging(),
    );
    let dispatcher = Dispatcher::builder().transport(transport).build().unwrap();
    let cancel = CancellationToken::new();

    let req = UnifiedRequest::new(ProviderType::OpenAi, "http://localhost", "k", "m");
    let outcome = dispatcher
        .unified_chat_request(&req, cancel.clone(), &NoopHooks)
        .await
        .unwrap();
    let ChatOutcome::Stream(mut stream) = outcome else {
        panic!("expected a stream");
    };

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(first.content.as_deref(), Some("partial"));

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let next = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("cancellation should end the stream");
    assert!(next.is_none());
}

#[tokio::test]
async fn test_stream_split_across_chunks_and_malformed_lines() {
    let transport = Arc::new(FakeTransport::ok(&[
        "data: {\"id\":\"c1\",\"model\":\"m\",\"choices\":[{\"index\":0,\"delta\":{\"con",
        "tent\":\"A\"}}]}\r\n\r\ndata: {not json}\n\n: keep-alive\n\n",
        "data: {\"id\":\"c1\",\"model\":\"m\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"B\"},\"finish_reason\":\"length\"}]}\n",
        "data: [DONE]\n\ndata: {\"id\":\"late\",\"model\":\"m\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"ignored\"}}]}\n",
    ]));
    let dispatcher = Dispatcher::builder().transport(transport).build().unwrap();

    let req = UnifiedRequest::new(ProviderType::OpenAi, "http://localhost", "k", "m");
    let increments: Vec<_> = dispatcher
        .unified_chat_request(&req, CancellationToken::new(), &NoopHooks)
        .await
        .unwrap()
        .into_stream()
        .unwrap()
        .map(|r| r.unwrap())
        .collect()
        .await;

    let text: String = increments.iter().filter_map(|i| i.content.as_deref()).collect();
    assert_eq!(text, "AB");
    assert_eq!(increments[1].finish_reason, Some(FinishReason::Length));
}
