//! Mock HTTP server setup for integration tests

use ai_chat_bridge::{ChatMessage, Dispatcher, ProviderType, TransportConfig, UnifiedRequest};
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    /// Dispatcher with the built-in adapters and a real HTTP transport.
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::builder()
            .transport_config(TransportConfig::default())
            .build()
            .expect("dispatcher")
    }

    /// A one-message request aimed at the mock server.
    pub fn request(&self, provider: ProviderType, text: &str) -> UnifiedRequest {
        UnifiedRequest::new(provider, &self.base_url, "test-key", "test-model")
            .with_messages(vec![ChatMessage::user(text)])
    }

    /// Create a mock for a successful streaming response (SSE)
    pub async fn mock_sse_stream(&self, path: &str, chunks: Vec<&str>) -> Mock {
        let mut server = self.server.lock().await;
        let body = chunks
            .iter()
            .map(|chunk| {
                if chunk.starts_with("data:") || chunk.starts_with("event:") {
                    format!("{}\n\n", chunk)
                } else {
                    format!("data: {}\n\n", chunk)
                }
            })
            .collect::<Vec<_>>()
            .join("");

        server
            .mock("POST", path)
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a mock for a JSON response, matching the request body partially.
    pub async fn mock_json_response(
        &self,
        path: &str,
        expected_body: serde_json::Value,
        status: usize,
        body: &str,
    ) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", path)
            .match_body(Matcher::PartialJson(expected_body))
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a mock for an error response
    pub async fn mock_error_response(&self, path: &str, status: usize, error_body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", path)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(error_body)
            .create_async()
            .await
    }
}
