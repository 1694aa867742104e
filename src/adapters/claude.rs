//! Anthropic Claude adapters.
//!
//! Three API shapes are served under the `claude` provider type:
//! - `v1`: the Messages API. System text is a top-level `system` parameter,
//!   content uses typed blocks and streaming is event-typed SSE.
//! - `chat`: an OpenAI-compatible chat completions gateway in front of Claude,
//!   with Claude-shaped tool descriptors.
//! - `legacy`: the text completions API with a `Human:`/`Assistant:` transcript.

use serde_json::{json, Value};
use std::collections::HashMap;

use crate::error::ProtocolError;
use crate::types::{
    ChatMessage, ContentPart, MessageContent, ProviderType, Role, ToolCall, UnifiedRequest,
    UnifiedResponse, UnifiedStreamIncrement,
};
use crate::Result;

use super::helpers::{
    extract_usage, fallback_tool_id, join_endpoint, map_finish_reason, non_empty_str, now_millis,
    sse_data, stream_finish_reason, transform_claude_tools, transform_tool_calls,
};
use super::openai::{parse_chat_completion, parse_chat_completion_chunk};
use super::{
    apply_extra_options, chat_messages_with_prompt, ChatAdapter, DEFAULT_MAX_TOKENS,
    DEFAULT_TEMPERATURE, DEFAULT_TOP_P,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

fn anthropic_version_header() -> HashMap<String, String> {
    HashMap::from([(
        "anthropic-version".to_string(),
        ANTHROPIC_VERSION.to_string(),
    )])
}

/// Claude Messages API adapter (`claude` / `v1`).
#[derive(Debug, Clone, Default)]
pub struct ClaudeMessagesAdapter;

impl ClaudeMessagesAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Split the conversation into the top-level `system` text and the
    /// Messages API turns. The request prompt comes first in `system`.
    fn split_system_messages(req: &UnifiedRequest) -> (Option<String>, Vec<Value>) {
        let mut system_parts: Vec<String> = Vec::new();
        if let Some(prompt) = req.prompt.as_deref().filter(|p| !p.is_empty()) {
            system_parts.push(prompt.to_string());
        }

        let mut turns = Vec::with_capacity(req.messages.len());
        for m in &req.messages {
            match m.role {
                Role::System => system_parts.push(m.content.plain_text()),
                Role::Tool => turns.push(json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": m.tool_call_id.clone().unwrap_or_default(),
                        "content": m.content.as_text(),
                    }],
                })),
                Role::User | Role::Assistant => turns.push(json!({
                    "role": m.role.as_str(),
                    "content": Self::content_blocks(m),
                })),
            }
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };
        (system, turns)
    }

    fn content_blocks(m: &ChatMessage) -> Value {
        let tool_calls = m.tool_calls.as_deref().unwrap_or_default();
        if tool_calls.is_empty() {
            if let MessageContent::Text(text) = &m.content {
                return Value::String(text.clone());
            }
        }

        let mut blocks: Vec<Value> = match &m.content {
            MessageContent::Text(text) if text.is_empty() => Vec::new(),
            MessageContent::Text(text) => vec![json!({ "type": "text", "text": text })],
            MessageContent::Parts(parts) => parts.iter().map(part_block).collect(),
        };
        for call in tool_calls {
            let input = serde_json::from_str::<Value>(&call.function.arguments)
                .ok()
                .filter(Value::is_object)
                .unwrap_or_else(|| json!({}));
            blocks.push(json!({
                "type": "tool_use",
                "id": call.id,
                "name": call.function.name,
                "input": input,
            }));
        }
        Value::Array(blocks)
    }
}

fn part_block(part: &ContentPart) -> Value {
    match part {
        ContentPart::Text { text } => json!({ "type": "text", "text": text }),
        ContentPart::ImageUrl { image_url } => {
            // data:<media type>;base64,<payload>
            let inline = image_url
                .url
                .strip_prefix("data:")
                .and_then(|rest| rest.split_once(";base64,"));
            match inline {
                Some((media_type, data)) => json!({
                    "type": "image",
                    "source": { "type": "base64", "media_type": media_type, "data": data },
                }),
                None => json!({
                    "type": "image",
                    "source": { "type": "url", "url": image_url.url },
                }),
            }
        }
    }
}

impl ChatAdapter for ClaudeMessagesAdapter {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Claude
    }

    fn api_version(&self) -> &str {
        "v1"
    }

    fn get_headers(&self, _req: &UnifiedRequest) -> Option<HashMap<String, String>> {
        Some(anthropic_version_header())
    }

    fn transform_request(&self, req: &UnifiedRequest) -> Result<Value> {
        let (system, messages) = Self::split_system_messages(req);

        let mut body = json!({
            "model": req.model,
            "messages": messages,
            "max_tokens": req.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": req.options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            "top_p": req.options.top_p.unwrap_or(DEFAULT_TOP_P),
            "stream": req.stream,
        });
        if let Some(sys) = system {
            body["system"] = Value::String(sys);
        }
        if !req.tools.is_empty() {
            body["tools"] = Value::Array(transform_claude_tools(&req.tools));
        }
        apply_extra_options(&mut body, &req.options.extra);
        Ok(body)
    }

    fn get_endpoint(&self, base_url: &str) -> Result<String> {
        join_endpoint(base_url, "/v1/messages")
    }

    fn transform_not_stream_response(&self, body: &Value) -> Result<UnifiedResponse> {
        if body.get("type").and_then(Value::as_str) == Some("error") {
            let reason = non_empty_str(body, "/error/message").unwrap_or("error response");
            return Err(ProtocolError::InvalidResponse {
                adapter: "claude-v1".to_string(),
                reason: reason.to_string(),
            }
            .into());
        }
        let blocks = body
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| ProtocolError::InvalidResponse {
                adapter: "claude-v1".to_string(),
                reason: "missing content blocks".to_string(),
            })?;

        let mut content = String::new();
        let mut reasoning = String::new();
        let mut tool_uses = Vec::new();
        for block in blocks {
            match block.get("type").and_then(Value::as_str) {
                Some("text") => content.push_str(non_empty_str(block, "/text").unwrap_or_default()),
                Some("thinking") => {
                    reasoning.push_str(non_empty_str(block, "/thinking").unwrap_or_default())
                }
                Some("tool_use") => tool_uses.push(block.clone()),
                _ => {}
            }
        }

        Ok(UnifiedResponse {
            id: body
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            model: body
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or("claude")
                .to_string(),
            role: Role::Assistant,
            content,
            reasoning: (!reasoning.is_empty()).then_some(reasoning),
            tool_calls: transform_tool_calls(Some(&Value::Array(tool_uses))),
            finish_reason: map_finish_reason(body.get("stop_reason").and_then(Value::as_str)),
            usage: extract_usage(body),
            raw: body.clone(),
        })
    }

    fn parse_stream_chunk(&self, line: &str) -> Result<Option<UnifiedStreamIncrement>> {
        // `event:` lines only repeat the `type` carried by the data payload.
        let Some(payload) = sse_data(line) else {
            return Ok(None);
        };
        if payload.is_empty() {
            return Ok(None);
        }
        let data: Value =
            serde_json::from_str(payload).map_err(|e| ProtocolError::MalformedChunk {
                adapter: "claude-v1".to_string(),
                reason: e.to_string(),
            })?;

        let mut inc = UnifiedStreamIncrement::new("claude-stream", "claude");
        let index = data.get("index").and_then(Value::as_u64).unwrap_or(0) as u32;

        match data.get("type").and_then(Value::as_str).unwrap_or_default() {
            // Input tokens are only reported here; `message_delta` carries output tokens.
            "message_start" => {
                let message = data.get("message").unwrap_or(&Value::Null);
                if let Some(id) = non_empty_str(message, "/id") {
                    inc.id = id.to_string();
                }
                if let Some(model) = non_empty_str(message, "/model") {
                    inc.model = model.to_string();
                }
                inc.usage = extract_usage(message);
            }
            "content_block_start" => {
                let block = data.get("content_block").unwrap_or(&Value::Null);
                if block.get("type").and_then(Value::as_str) == Some("tool_use") {
                    let id = non_empty_str(block, "/id")
                        .map(String::from)
                        .unwrap_or_else(fallback_tool_id);
                    let name = non_empty_str(block, "/name").unwrap_or_default();
                    inc.tool_calls = Some(vec![ToolCall::new(id, index, name, "")]);
                }
            }
            "content_block_delta" => {
                let delta = data.get("delta").unwrap_or(&Value::Null);
                match delta.get("type").and_then(Value::as_str) {
                    Some("input_json_delta") => {
                        let fragment = non_empty_str(delta, "/partial_json").unwrap_or_default();
                        inc.tool_calls =
                            Some(vec![ToolCall::new(fallback_tool_id(), index, "", fragment)]);
                    }
                    Some("thinking_delta") => {
                        inc.reasoning = non_empty_str(delta, "/thinking").map(String::from);
                    }
                    _ => inc.content = non_empty_str(delta, "/text").map(String::from),
                }
            }
            "message_delta" => {
                inc.finish_reason = stream_finish_reason(data.pointer("/delta/stop_reason"));
                inc.usage = extract_usage(&data);
            }
            "error" => {
                let message = non_empty_str(&data, "/error/message").unwrap_or("stream error");
                return Err(ProtocolError::StreamError(message.to_string()).into());
            }
            _ => return Ok(None),
        }

        if inc.is_empty() {
            return Ok(None);
        }
        inc.raw = data;
        Ok(Some(inc))
    }

    fn is_stream_done(&self, line: &str) -> bool {
        let line = line.trim();
        if line == "event: message_stop" || line == "event:message_stop" {
            return true;
        }
        match sse_data(line) {
            Some(payload) if payload.contains("message_stop") => {
                serde_json::from_str::<Value>(payload)
                    .ok()
                    .and_then(|v| v.get("type").and_then(Value::as_str).map(|t| t == "message_stop"))
                    .unwrap_or(false)
            }
            _ => false,
        }
    }
}

/// Claude behind an OpenAI-compatible chat completions endpoint (`claude` / `chat`).
#[derive(Debug, Clone, Default)]
pub struct ClaudeChatAdapter;

impl ClaudeChatAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ChatAdapter for ClaudeChatAdapter {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Claude
    }

    fn api_version(&self) -> &str {
        "chat"
    }

    fn get_headers(&self, _req: &UnifiedRequest) -> Option<HashMap<String, String>> {
        Some(anthropic_version_header())
    }

    fn transform_request(&self, req: &UnifiedRequest) -> Result<Value> {
        let mut body = json!({
            "model": req.model,
            "messages": chat_messages_with_prompt(req)?,
            "stream": req.stream,
            "max_tokens": req.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": req.options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            "top_p": req.options.top_p.unwrap_or(DEFAULT_TOP_P),
        });
        if !req.tools.is_empty() {
            body["tools"] = Value::Array(transform_claude_tools(&req.tools));
        }
        apply_extra_options(&mut body, &req.options.extra);
        Ok(body)
    }

    fn get_endpoint(&self, base_url: &str) -> Result<String> {
        join_endpoint(base_url, "/v1/chat/completions")
    }

    fn transform_not_stream_response(&self, body: &Value) -> Result<UnifiedResponse> {
        parse_chat_completion("claude-chat", body)
    }

    fn parse_stream_chunk(&self, line: &str) -> Result<Option<UnifiedStreamIncrement>> {
        parse_chat_completion_chunk("claude-chat", line, "claude-chat-stream", "claude")
    }
}

/// Claude text completions API (`claude` / `legacy`).
#[derive(Debug, Clone, Default)]
pub struct ClaudeLegacyAdapter;

impl ClaudeLegacyAdapter {
    pub fn new() -> Self {
        Self
    }

    fn build_prompt(req: &UnifiedRequest) -> String {
        let mut prompt = match req.prompt.as_deref().filter(|p| !p.is_empty()) {
            Some(sys) => format!("{}\n\n", sys),
            None => String::new(),
        };
        for m in &req.messages {
            let speaker = match m.role {
                Role::User => "Human",
                Role::Assistant | Role::System => "Assistant",
                Role::Tool => continue,
            };
            prompt.push_str(&format!("{}: {}\n\n", speaker, m.content.as_text()));
        }
        prompt.push_str("Assistant:");
        prompt
    }
}

impl ChatAdapter for ClaudeLegacyAdapter {
    fn provider_type(&self) -> ProviderType {
        ProviderType::Claude
    }

    fn api_version(&self) -> &str {
        "legacy"
    }

    fn transform_request(&self, req: &UnifiedRequest) -> Result<Value> {
        let mut body = json!({
            "model": req.model,
            "prompt": Self::build_prompt(req),
            "max_tokens_to_sample": req.options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "temperature": req.options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            "top_p": req.options.top_p.unwrap_or(DEFAULT_TOP_P),
            "stream": req.stream,
        });
        apply_extra_options(&mut body, &req.options.extra);
        Ok(body)
    }

    fn get_endpoint(&self, base_url: &str) -> Result<String> {
        join_endpoint(base_url, "/v1/complete")
    }

    fn transform_not_stream_response(&self, body: &Value) -> Result<UnifiedResponse> {
        let completion = body
            .get("completion")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::InvalidResponse {
                adapter: "claude-legacy".to_string(),
                reason: "missing completion".to_string(),
            })?;

        Ok(UnifiedResponse {
            id: non_empty_str(body, "/id")
                .map(String::from)
                .unwrap_or_else(|| format!("claude-legacy-{}", now_millis())),
            model: body
                .get("model")
                .and_then(Value::as_str)
                .unwrap_or("claude")
                .to_string(),
            role: Role::Assistant,
            content: completion.to_string(),
            reasoning: None,
            tool_calls: None,
            finish_reason: map_finish_reason(body.get("stop_reason").and_then(Value::as_str)),
            usage: extract_usage(body),
            raw: body.clone(),
        })
    }

    fn parse_stream_chunk(&self, line: &str) -> Result<Option<UnifiedStreamIncrement>> {
        let line = line.trim();
        if line.starts_with("event:") {
            return Ok(None);
        }
        let payload = sse_data(line).unwrap_or(line);
        if payload.is_empty() || payload == "[DONE]" {
            return Ok(None);
        }
        let data: Value =
            serde_json::from_str(payload).map_err(|e| ProtocolError::MalformedChunk {
                adapter: "claude-legacy".to_string(),
                reason: e.to_string(),
            })?;
        if data.get("type").and_then(Value::as_str) == Some("error") {
            let message = non_empty_str(&data, "/error/message").unwrap_or("stream error");
            return Err(ProtocolError::StreamError(message.to_string()).into());
        }

        let mut inc = UnifiedStreamIncrement::new(
            "claude-legacy-stream",
            data.get("model").and_then(Value::as_str).unwrap_or("claude"),
        );
        inc.content = non_empty_str(&data, "/completion").map(String::from);
        inc.finish_reason = stream_finish_reason(data.get("stop_reason"));

        if inc.is_empty() {
            return Ok(None);
        }
        inc.raw = data;
        Ok(Some(inc))
    }
}
