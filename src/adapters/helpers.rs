//! Mapping helpers shared by every adapter.
//!
//! Pure functions: finish-reason normalization, tool descriptor and tool-call
//! shaping, usage extraction, endpoint joining.

use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, ErrorContext};
use crate::types::{FinishReason, TokenUsage, ToolCall, ToolDefinition};

/// Map a vendor completion reason into the unified vocabulary.
///
/// Case-insensitive. Unknown and missing reasons map to [`FinishReason::Stop`].
pub fn map_finish_reason(raw: Option<&str>) -> FinishReason {
    let Some(raw) = raw else {
        return FinishReason::Stop;
    };
    match raw.to_ascii_lowercase().as_str() {
        "stop" | "stop_sequence" | "end_turn" | "complete" => FinishReason::Stop,
        "length" | "max_tokens" | "length_limit" => FinishReason::Length,
        "tool_calls" | "tool_use" => FinishReason::ToolCalls,
        "content_filter" => FinishReason::ContentFilter,
        _ => FinishReason::Stop,
    }
}

/// Finish reason for a stream chunk: only set when the vendor actually sent one.
pub(crate) fn stream_finish_reason(raw: Option<&Value>) -> Option<FinishReason> {
    raw.and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(|s| map_finish_reason(Some(s)))
}

/// Normalize tool descriptors into the function-call shape.
///
/// Accepts both an already wrapped `{type: "function", function: {...}}`
/// descriptor and the flat `{name, description, inputSchema | parameters}`
/// shape produced by tool registries that do not know the target vendor.
pub fn transform_tools(tools: &[Value]) -> Vec<ToolDefinition> {
    tools
        .iter()
        .filter(|tool| tool.is_object())
        .map(|tool| {
            let wrapped = tool.get("type").and_then(Value::as_str) == Some("function")
                && tool.get("function").map_or(false, Value::is_object);
            let src = if wrapped { &tool["function"] } else { tool };
            ToolDefinition::function(
                str_field(src, "name").unwrap_or_default(),
                str_field(src, "description"),
                schema_field(src),
            )
        })
        .collect()
}

/// Claude's tool shape: `{name, description, input_schema}`.
pub fn transform_claude_tools(tools: &[Value]) -> Vec<Value> {
    transform_tools(tools)
        .into_iter()
        .map(|t| {
            let mut obj = json!({ "name": t.function.name });
            if let Some(desc) = t.function.description {
                obj["description"] = Value::String(desc);
            }
            obj["input_schema"] = t
                .function
                .parameters
                .unwrap_or_else(|| json!({ "type": "object", "properties": {} }));
            obj
        })
        .collect()
}

/// Map a vendor tool-call list into unified [`ToolCall`]s.
///
/// Returns `None` for a missing or empty list. Missing ids are synthesized as
/// `tool_<millis>`, missing indices default to the list position. Accepts both
/// `{function: {name, arguments}}` and Claude's `{name, input}`.
pub fn transform_tool_calls(raw: Option<&Value>) -> Option<Vec<ToolCall>> {
    let list = raw?.as_array()?;
    if list.is_empty() {
        return None;
    }
    Some(
        list.iter()
            .enumerate()
            .map(|(pos, tc)| {
                let id = str_field(tc, "id")
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(fallback_tool_id);
                let index = tc
                    .get("index")
                    .and_then(Value::as_u64)
                    .map(|i| i as u32)
                    .unwrap_or(pos as u32);
                let function = tc.get("function");
                let name = function
                    .and_then(|f| str_field(f, "name"))
                    .or_else(|| str_field(tc, "name"))
                    .unwrap_or_default();
                let arguments = function
                    .and_then(|f| f.get("arguments"))
                    .or_else(|| tc.get("input"))
                    .map(raw_arguments)
                    .unwrap_or_default();
                ToolCall::new(id, index, name, arguments)
            })
            .collect(),
    )
}

/// Read `usage` in either OpenAI (`prompt_tokens`) or Claude (`input_tokens`)
/// naming. `total_tokens` is computed when the vendor omits it.
pub fn extract_usage(raw: &Value) -> Option<TokenUsage> {
    let usage = raw.get("usage").filter(|u| u.is_object())?;
    let pick = |a: &str, b: &str| {
        usage
            .get(a)
            .and_then(Value::as_u64)
            .or_else(|| usage.get(b).and_then(Value::as_u64))
    };
    let prompt = pick("prompt_tokens", "input_tokens");
    let completion = pick("completion_tokens", "output_tokens");
    let total = usage.get("total_tokens").and_then(Value::as_u64);
    if prompt.is_none() && completion.is_none() && total.is_none() {
        return None;
    }
    let prompt_tokens = prompt.unwrap_or(0);
    let completion_tokens = completion.unwrap_or(0);
    Some(TokenUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens: total.unwrap_or(prompt_tokens + completion_tokens),
    })
}

/// `tool_<unix millis>`, the id used when a vendor omits one.
pub fn fallback_tool_id() -> String {
    format!("tool_{}", now_millis())
}

pub(crate) fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Append `path` to `base_url`, tolerating a trailing slash on the base.
pub(crate) fn join_endpoint(base_url: &str, path: &str) -> crate::Result<String> {
    let base = base_url.trim().trim_end_matches('/');
    url::Url::parse(base).map_err(|e| {
        Error::configuration_with_context(
            format!("invalid base url '{}': {}", base_url, e),
            ErrorContext::new().with_field_path("request.base_url"),
        )
    })?;
    Ok(format!("{}{}", base, path))
}

/// Strip an SSE `data:` field prefix; `None` for lines that are not data lines.
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

pub(crate) fn str_field(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(String::from)
}

pub(crate) fn non_empty_str<'a>(v: &'a Value, pointer: &str) -> Option<&'a str> {
    v.pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn schema_field(src: &Value) -> Option<Value> {
    ["parameters", "inputSchema", "input_schema"]
        .iter()
        .find_map(|k| src.get(*k).filter(|v| !v.is_null()).cloned())
}

fn raw_arguments(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
