//! Adapter abstraction layer: one trait, one concrete type per provider and api version.
//!
//! Adapters are held as `Arc<dyn ChatAdapter>` in the
//! [`AdapterRegistry`](crate::registry::AdapterRegistry), so the same
//! dispatcher code drives OpenAI, Azure OpenAI, Claude and image generation
//! endpoints. There is no inheritance; shared mapping logic lives in
//! [`helpers`] as free functions.

pub mod claude;
pub mod helpers;
pub mod image;
pub mod openai;

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::overrides::is_forbidden_key;
use crate::pipeline::decode::{IncrementStream, StreamDecoder};
use crate::registry::AdapterKey;
use crate::transport::ByteStream;
use crate::types::{ProviderType, UnifiedRequest, UnifiedResponse, UnifiedStreamIncrement};
use crate::Result;

pub use claude::{ClaudeChatAdapter, ClaudeLegacyAdapter, ClaudeMessagesAdapter};
pub use image::OpenAiImageAdapter;
pub use openai::{AzureOpenAiAdapter, OpenAiChatAdapter, OpenAiResponseAdapter};

/// Sampling defaults applied when the request leaves them unset.
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_TOP_P: f64 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Core trait for provider-specific API adaptation.
///
/// Object safe; the registry stores `Arc<dyn ChatAdapter>`. Adapters are
/// stateless with respect to calls: everything call-specific lives in the
/// request, the produced body, or the decoder state.
pub trait ChatAdapter: Send + Sync + std::fmt::Debug + 'static {
    fn provider_type(&self) -> ProviderType;

    fn api_version(&self) -> &str;

    /// Registration key of this adapter.
    fn key(&self) -> AdapterKey {
        AdapterKey::new(self.provider_type(), self.api_version())
    }

    /// Default headers: `content-type` plus the auth header picked by the
    /// request's provider type. Adapter specific additions come from
    /// [`get_headers`](Self::get_headers) and are merged on top by the dispatcher.
    fn build_headers(&self, req: &UnifiedRequest) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());
        match req.provider_type {
            ProviderType::Claude => {
                headers.insert("x-api-key".to_string(), req.api_key.clone());
            }
            ProviderType::AzureOpenAi => {
                headers.insert("api-key".to_string(), req.api_key.clone());
            }
            ProviderType::OpenAi | ProviderType::Other(_) => {
                headers.insert(
                    "authorization".to_string(),
                    format!("Bearer {}", req.api_key),
                );
            }
        }
        headers
    }

    /// Optional adapter specific headers, merged over [`build_headers`](Self::build_headers).
    fn get_headers(&self, _req: &UnifiedRequest) -> Option<HashMap<String, String>> {
        None
    }

    /// Build the vendor JSON payload. Always returns a fresh value.
    fn transform_request(&self, req: &UnifiedRequest) -> Result<Value>;

    /// Full request URL for this adapter's API shape.
    fn get_endpoint(&self, base_url: &str) -> Result<String>;

    /// Parse a non-streaming vendor response.
    fn transform_not_stream_response(&self, body: &Value) -> Result<UnifiedResponse>;

    /// Parse one framing unit (a single line) of a streaming response.
    ///
    /// `Ok(None)` for lines that carry no payload; `Err` for malformed payloads,
    /// which the decoder reports and skips.
    fn parse_stream_chunk(&self, line: &str) -> Result<Option<UnifiedStreamIncrement>>;

    /// Whether `line` is the vendor's end-of-stream sentinel.
    fn is_stream_done(&self, line: &str) -> bool {
        let t = line.trim();
        t == "data: [DONE]" || t == "data:[DONE]" || t == "[DONE]"
    }

    /// Lazily decode a streaming body into unified increments.
    fn transform_stream_response(
        self: Arc<Self>,
        body: ByteStream,
        cancel: CancellationToken,
    ) -> IncrementStream {
        StreamDecoder::new(self).decode(body, cancel)
    }
}

/// Copy `options.extra` passthrough keys into `body`, skipping protocol-critical keys.
pub(crate) fn apply_extra_options(body: &mut Value, extra: &Map<String, Value>) {
    if let Value::Object(map) = body {
        for (k, v) in extra {
            if is_forbidden_key(k) {
                tracing::warn!(key = k.as_str(), "ignoring protocol-critical key in request options");
                continue;
            }
            map.insert(k.clone(), v.clone());
        }
    }
}

/// The request's system prompt followed by its messages, serialized in the
/// internal (camelCase) message representation.
pub(crate) fn chat_messages_with_prompt(req: &UnifiedRequest) -> Result<Vec<Value>> {
    let mut messages = Vec::with_capacity(req.messages.len() + 1);
    if let Some(prompt) = req.prompt.as_deref().filter(|p| !p.is_empty()) {
        messages.push(serde_json::json!({ "role": "system", "content": prompt }));
    }
    for m in &req.messages {
        messages.push(serde_json::to_value(m)?);
    }
    Ok(messages)
}

/// Built-in adapters, in registration order.
pub fn default_adapters() -> Vec<Arc<dyn ChatAdapter>> {
    vec![
        Arc::new(OpenAiChatAdapter::new()),
        Arc::new(OpenAiResponseAdapter::new()),
        Arc::new(AzureOpenAiAdapter::default()),
        Arc::new(OpenAiImageAdapter::new()),
        Arc::new(ClaudeMessagesAdapter::new()),
        Arc::new(ClaudeChatAdapter::new()),
        Arc::new(ClaudeLegacyAdapter::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    fn request(provider: ProviderType) -> UnifiedRequest {
        UnifiedRequest::new(provider, "https://example.test", "secret", "m")
    }

    #[test]
    fn test_default_auth_header_by_provider_type() {
        let adapter = OpenAiChatAdapter::new();

        let h = adapter.build_headers(&request(ProviderType::OpenAi));
        assert_eq!(h["authorization"], "Bearer secret");
        assert_eq!(h["content-type"], "application/json");

        let h = adapter.build_headers(&request(ProviderType::Claude));
        assert_eq!(h["x-api-key"], "secret");
        assert!(!h.contains_key("authorization"));

        let h = adapter.build_headers(&request(ProviderType::AzureOpenAi));
        assert_eq!(h["api-key"], "secret");

        let h = adapter.build_headers(&request(ProviderType::Other("deepseek".into())));
        assert_eq!(h["authorization"], "Bearer secret");
    }

    #[test]
    fn test_default_sentinel_detection() {
        let adapter = OpenAiChatAdapter::new();
        assert!(adapter.is_stream_done("data: [DONE]"));
        assert!(adapter.is_stream_done("data:[DONE]"));
        assert!(!adapter.is_stream_done(r#"data: {"choices":[]}"#));
    }

    #[test]
    fn test_extra_options_skip_protocol_keys() {
        let mut body = serde_json::json!({"model": "m"});
        let mut extra = Map::new();
        extra.insert("model".into(), Value::String("other".into()));
        extra.insert("seed".into(), Value::from(7));
        apply_extra_options(&mut body, &extra);
        assert_eq!(body["model"], "m");
        assert_eq!(body["seed"], 7);
    }

    #[test]
    fn test_prompt_becomes_leading_system_message() {
        let req = request(ProviderType::OpenAi)
            .with_prompt("be brief")
            .with_messages(vec![ChatMessage::user("hi")]);
        let msgs = chat_messages_with_prompt(&req).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[0]["content"], "be brief");
        assert_eq!(msgs[1]["content"], "hi");
    }

    #[test]
    fn test_default_adapter_keys_are_unique() {
        let mut keys: Vec<_> = default_adapters().iter().map(|a| a.key()).collect();
        let before = keys.len();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), before);
    }
}
