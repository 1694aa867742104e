//! OpenAI image generation adapter (`openai` / `gpt-image-1`).
//!
//! Generated images are surfaced as text content: a `data:` URL for base64
//! payloads, or the hosted URL, one image per line.

use serde_json::{json, Value};

use crate::error::{Error, ErrorContext, ProtocolError};
use crate::types::{
    FinishReason, ProviderType, Role, UnifiedRequest, UnifiedResponse, UnifiedStreamIncrement,
};
use crate::Result;

use super::helpers::{extract_usage, join_endpoint, non_empty_str, sse_data};
use super::{apply_extra_options, ChatAdapter};

const DEFAULT_SIZE: &str = "1024x1024";
const DEFAULT_OUTPUT_FORMAT: &str = "png";

#[derive(Debug, Clone, Default)]
pub struct OpenAiImageAdapter;

impl OpenAiImageAdapter {
    pub fn new() -> Self {
        Self
    }

    /// The text to render: the latest user message, falling back to the system prompt.
    fn image_prompt(req: &UnifiedRequest) -> Option<String> {
        req.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.plain_text())
            .filter(|t| !t.trim().is_empty())
            .or_else(|| req.prompt.clone().filter(|p| !p.trim().is_empty()))
    }
}

fn image_ref(item: &Value, output_format: &str) -> Option<String> {
    if let Some(b64) = non_empty_str(item, "/b64_json") {
        let format = non_empty_str(item, "/output_format").unwrap_or(output_format);
        return Some(format!("data:image/{};base64,{}", format, b64));
    }
    non_empty_str(item, "/url").map(String::from)
}

impl ChatAdapter for OpenAiImageAdapter {
    fn provider_type(&self) -> ProviderType {
        ProviderType::OpenAi
    }

    fn api_version(&self) -> &str {
        "gpt-image-1"
    }

    fn transform_request(&self, req: &UnifiedRequest) -> Result<Value> {
        let prompt = Self::image_prompt(req).ok_or_else(|| {
            Error::configuration_with_context(
                "image generation needs a user message or prompt",
                ErrorContext::new()
                    .with_field_path("request.messages")
                    .with_source("openai-gpt-image-1"),
            )
        })?;

        let mut body = json!({
            "model": req.model,
            "prompt": prompt,
            "n": 1,
            "size": DEFAULT_SIZE,
            "stream": req.stream,
        });
        apply_extra_options(&mut body, &req.options.extra);
        Ok(body)
    }

    fn get_endpoint(&self, base_url: &str) -> Result<String> {
        join_endpoint(base_url, "/v1/images/generations")
    }

    fn transform_not_stream_response(&self, body: &Value) -> Result<UnifiedResponse> {
        let items = body
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| ProtocolError::InvalidResponse {
                adapter: "openai-gpt-image-1".to_string(),
                reason: "missing data array".to_string(),
            })?;
        let output_format = non_empty_str(body, "/output_format").unwrap_or(DEFAULT_OUTPUT_FORMAT);
        let images: Vec<String> = items
            .iter()
            .filter_map(|item| image_ref(item, output_format))
            .collect();

        Ok(UnifiedResponse {
            id: body
                .get("created")
                .and_then(Value::as_u64)
                .map(|c| format!("image-{}", c))
                .unwrap_or_else(|| "image".to_string()),
            model: self.api_version().to_string(),
            role: Role::Assistant,
            content: images.join("\n"),
            reasoning: None,
            tool_calls: None,
            finish_reason: FinishReason::Stop,
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
                adapter: "openai-gpt-image-1".to_string(),
                reason: e.to_string(),
            })?;

        let mut inc = UnifiedStreamIncrement::new("image-stream", self.api_version());
        match data.get("type").and_then(Value::as_str).unwrap_or_default() {
            "image_generation.partial_image" => {
                inc.content = image_ref(&data, DEFAULT_OUTPUT_FORMAT);
            }
            "image_generation.completed" => {
                inc.content = image_ref(&data, DEFAULT_OUTPUT_FORMAT);
                inc.finish_reason = Some(FinishReason::Stop);
                inc.usage = extract_usage(&data);
            }
            "error" => {
                let message = non_empty_str(&data, "/error/message").unwrap_or("image generation failed");
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
}
