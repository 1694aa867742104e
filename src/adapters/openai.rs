//! OpenAI-family adapters.
//!
//! - [`OpenAiChatAdapter`]: `/v1/chat/completions`, `choices[0].delta` SSE
//!   terminated by `data: [DONE]`. Also covers OpenAI-compatible vendors.
//! - [`OpenAiResponseAdapter`]: the flat `/v1/response` shape (`text`,
//!   `response_id`, nested `parameters`).
//! - [`AzureOpenAiAdapter`]: chat completions behind an Azure deployment URL
//!   with the `api-key` header.

use serde_json::{json, Value};
use std::collections::HashMap;

use crate::error::ProtocolError;
use crate::types::{ProviderType, Role, UnifiedRequest, UnifiedResponse, UnifiedStreamIncrement};
use crate::Result;

use super::helpers::{
    extract_usage, join_endpoint, map_finish_reason, non_empty_str, sse_data,
    stream_finish_reason, transform_tool_calls, transform_tools,
};
use super::{
    apply_extra_options, chat_messages_with_prompt, ChatAdapter, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE, DEFAULT_TOP_P,
};

const FREQUENCY_PENALTY: f64 = 0.5;

/// OpenAI chat completions adapter (`openai` / `v1`).
#[derive(Debug, Clone, Default)]
pub struct OpenAiChatAdapter;

impl OpenAiChatAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ChatAdapter for OpenAiChatAdapter {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAi
    }

    fn api_version(&self) -> &str {
        "v1"
    }

    fn transform_request(&self, req: &UnifiedRequest) -> Result<Value> {
        let mut body = json!({
            "model": req.model,
            "messages": chat_messages_with_prompt(req)?,
            "stream": req.stream,
            "temperature": req.options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            "max_tokens": req.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "top_p": req.options.top_p.unwrap_or(DEFAULT_TOP_P),
            "frequency_penalty": FREQUENCY_PENALTY,
            "n": 1,
        });
        if !req.tools.is_empty() {
            body["tools"] = serde_json::to_value(transform_tools(&req.tools))?;
        }
        apply_extra_options(&mut body, &req.options.extra);
        Ok(body)
    }

    fn get_endpoint(&self, base_url: &str) -> Result<String> {
        join_endpoint(base_url, "/v1/chat/completions")
    }

    fn transform_not_stream_response(&self, body: &Value) -> Result<UnifiedResponse> {
        parse_chat_completion("openai-v1", body)
    }

    fn parse_stream_chunk(&self, line: &str) -> Result<Option<UnifiedStreamIncrement>> {
        parse_chat_completion_chunk("openai-v1", line, "stream", "unknown")
    }
}

/// Parse a `chat.completion` body. Shared by every chat-completions shaped adapter.
pub(crate) fn parse_chat_completion(adapter: &str, body: &Value) -> Result<UnifiedResponse> {
    let choice = body
        .pointer("/choices/0")
        .ok_or_else(|| ProtocolError::InvalidResponse {
            adapter: adapter.to_string(),
            reason: "no choices".to_string(),
        })?;
    let message = choice.get("message").unwrap_or(&Value::Null);

    Ok(UnifiedResponse {
        id: body
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
        model: body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string(),
        role: Role::Assistant,
        content: message
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        reasoning: non_empty_str(message, "/reasoning_content").map(String::from),
        tool_calls: transform_tool_calls(message.get("tool_calls")),
        finish_reason: map_finish_reason(choice.get("finish_reason").and_then(Value::as_str)),
        usage: extract_usage(body),
        raw: body.clone(),
    })
}

/// Parse one `chat.completion.chunk` SSE line.
///
/// Chunks with no choices still yield an increment when they carry usage
/// (the `stream_options.include_usage` trailer).
pub(crate) fn parse_chat_completion_chunk(
    adapter: &str,
    line: &str,
    default_id: &str,
    default_model: &str,
) -> Result<Option<UnifiedStreamIncrement>> {
    let Some(payload) = sse_data(line) else {
        return Ok(None);
    };
    if payload.is_empty() || payload == "[DONE]" {
        return Ok(None);
    }
    let data: Value = serde_json::from_str(payload).map_err(|e| ProtocolError::MalformedChunk {
        adapter: adapter.to_string(),
        reason: e.to_string(),
    })?;

    let mut inc = UnifiedStreamIncrement::new(
        data.get("id").and_then(Value::as_str).unwrap_or(default_id),
        data.get("model").and_then(Value::as_str).unwrap_or(default_model),
    );
    inc.usage = extract_usage(&data);

    if let Some(choice) = data.pointer("/choices/0") {
        let delta = choice.get("delta").unwrap_or(&Value::Null);
        inc.content = non_empty_str(delta, "/content").map(String::from);
        inc.reasoning = non_empty_str(delta, "/reasoning_content")
            .or_else(|| non_empty_str(delta, "/reasoning"))
            .map(String::from);
        inc.tool_calls = transform_tool_calls(delta.get("tool_calls"));
        inc.finish_reason = stream_finish_reason(choice.get("finish_reason"));
    }

    if inc.is_empty() {
        return Ok(None);
    }
    inc.raw = data;
    Ok(Some(inc))
}

/// Flat response-style adapter (`openai` / `v2`).
#[derive(Debug, Clone, Default)]
pub struct OpenAiResponseAdapter;

impl OpenAiResponseAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ChatAdapter for OpenAiResponseAdapter {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAi
    }

    fn api_version(&self) -> &str {
        "v2"
    }

    fn transform_request(&self, req: &UnifiedRequest) -> Result<Value> {
        let mut body = json!({
            "model": req.model,
            "messages": chat_messages_with_prompt(req)?,
            "stream": req.stream,
            "parameters": {
                "temperature": req.options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
                "max_tokens": req.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
                "top_p": req.options.top_p.unwrap_or(DEFAULT_TOP_P),
                "frequency_penalty": FREQUENCY_PENALTY,
            },
        });
        if !req.tools.is_empty() {
            body["tools"] = serde_json::to_value(transform_tools(&req.tools))?;
        }
        apply_extra_options(&mut body, &req.options.extra);
        Ok(body)
    }

    fn get_endpoint(&self, base_url: &str) -> Result<String> {
        join_endpoint(base_url, "/v1/response")
    }

    fn transform_not_stream_response(&self, body: &Value) -> Result<UnifiedResponse> {
        if !body.is_object() {
            return Err(ProtocolError::InvalidResponse {
                adapter: "openai-v2".to_string(),
                reason: "response is not a JSON object".to_string(),
            }
            .into());
        }
        let content = non_empty_str(body, "/text")
            .or_else(|| non_empty_str(body, "/content"))
            .unwrap_or_default();
        let reason = non_empty_str(body, "/finish_reason").or_else(|| non_empty_str(body, "/stop_reason"));

        Ok(UnifiedResponse {
            id: body
                .get("response_id")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            model: body
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            role: Role::Assistant,
            content: content.to_string(),
            reasoning: None,
            tool_calls: transform_tool_calls(body.get("tool_calls")),
            finish_reason: map_finish_reason(reason),
            usage: extract_usage(body),
            raw: body.clone(),
        })
    }

    fn parse_stream_chunk(&self, line: &str) -> Result<Option<UnifiedStreamIncrement>> {
        let Some(payload) = sse_data(line) else {
            return Ok(None);
        };
        if payload.is_empty() || payload == "[DONE]" {
            return Ok(None);
        }
        let data: Value =
            serde_json::from_str(payload).map_err(|e| ProtocolError::MalformedChunk {
                adapter: "openai-v2".to_string(),
                reason: e.to_string(),
            })?;

        let mut inc = UnifiedStreamIncrement::new(
            data.get("response_id").and_then(Value::as_str).unwrap_or("stream"),
            data.get("model").and_then(Value::as_str).unwrap_or("unknown"),
        );
        inc.content = non_empty_str(&data, "/text")
            .or_else(|| non_empty_str(&data, "/delta/content"))
            .map(String::from);
        inc.tool_calls = transform_tool_calls(data.get("tool_calls"))
            .or_else(|| transform_tool_calls(data.pointer("/delta/tool_calls")));
        inc.finish_reason = stream_finish_reason(data.get("finish_reason"))
            .or_else(|| stream_finish_reason(data.get("stop_reason")));
        inc.usage = extract_usage(&data);

        if inc.is_empty() {
            return Ok(None);
        }
        inc.raw = data;
        Ok(Some(inc))
    }
}

/// Azure OpenAI adapter (`azure-openai` / `v1`).
///
/// Payload and responses are the OpenAI chat completions shape; only the
/// endpoint and the auth header differ.
#[derive(Debug, Clone)]
pub struct AzureOpenAiAdapter {
    inner: OpenAiChatAdapter,
    deployment: String,
    rest_api_version: String,
}

impl AzureOpenAiAdapter {
    pub const DEFAULT_DEPLOYMENT: &'static str = "gpt-4";
    pub const DEFAULT_REST_API_VERSION: &'static str = "2024-02-15-preview";

    pub fn new(deployment: impl Into<String>, rest_api_version: impl Into<String>) -> Self {
        Self {
            inner: OpenAiChatAdapter::new(),
            deployment: deployment.into(),
            rest_api_version: rest_api_version.into(),
        }
    }
}

impl Default for AzureOpenAiAdapter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DEPLOYMENT, Self::DEFAULT_REST_API_VERSION)
    }
}

impl ChatAdapter for AzureOpenAiAdapter {
    fn provider_type(&self) -> ProviderType {
        ProviderType::AzureOpenAi
    }

    fn api_version(&self) -> &str {
        "v1"
    }

    fn get_headers(&self, req: &UnifiedRequest) -> Option<HashMap<String, String>> {
        Some(HashMap::from([("api-key".to_string(), req.api_key.clone())]))
    }

    fn transform_request(&self, req: &UnifiedRequest) -> Result<Value> {
        self.inner.transform_request(req)
    }

    fn get_endpoint(&self, base_url: &str) -> Result<String> {
        let path = format!("/openai/deployments/{}/chat/completions", self.deployment);
        let joined = join_endpoint(base_url, &path)?;
        let mut url = url::Url::parse(&joined).map_err(|e| {
            crate::Error::configuration_with_context(
                format!("invalid azure endpoint '{}': {}", joined, e),
                crate::ErrorContext::new().with_source("azure-openai-v1"),
            )
        })?;
        url.query_pairs_mut()
            .append_pair("api-version", &self.rest_api_version);
        Ok(url.to_string())
    }

    fn transform_not_stream_response(&self, body: &Value) -> Result<UnifiedResponse> {
        parse_chat_completion("azure-openai-v1", body)
    }

    fn parse_stream_chunk(&self, line: &str) -> Result<Option<UnifiedStreamIncrement>> {
        parse_chat_completion_chunk("azure-openai-v1", line, "stream", "unknown")
    }
}
