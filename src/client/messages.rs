//! Wire casing for outgoing messages.
//!
//! Messages are built in the internal camelCase representation (`toolCalls`,
//! `toolCallId`). Right before sending, every `messages[*]` entry of the
//! vendor body is rebuilt with snake_case keys, keeping only `role`,
//! `content`, `name`, `tool_calls` and `tool_call_id`.

use serde_json::{Map, Value};

/// Rewrite `body.messages` in place. Bodies without a `messages` array are untouched.
pub fn normalize_message_fields(body: &mut Value) {
    let Some(messages) = body.get_mut("messages").and_then(Value::as_array_mut) else {
        return;
    };
    for message in messages.iter_mut() {
        if let Value::Object(fields) = message {
            *fields = normalize_message(fields);
        }
    }
}

fn normalize_message(fields: &Map<String, Value>) -> Map<String, Value> {
    let pick = |camel: &str, snake: &str| {
        fields
            .get(snake)
            .filter(|v| !v.is_null())
            .or_else(|| fields.get(camel).filter(|v| !v.is_null()))
            .cloned()
    };

    let mut out = Map::new();
    for key in ["role", "content", "name"] {
        if let Some(v) = fields.get(key).filter(|v| !v.is_null()) {
            out.insert(key.to_string(), v.clone());
        }
    }
    if let Some(calls) = pick("toolCalls", "tool_calls") {
        out.insert("tool_calls".to_string(), wire_tool_calls(calls));
    }
    if let Some(id) = pick("toolCallId", "tool_call_id") {
        out.insert("tool_call_id".to_string(), id);
    }
    out
}

/// Request-side tool calls carry `{id, type, function}`; the stream
/// reassembly `index` is dropped.
fn wire_tool_calls(mut calls: Value) -> Value {
    if let Some(list) = calls.as_array_mut() {
        for call in list.iter_mut().filter_map(Value::as_object_mut) {
            call.remove("index");
        }
    }
    calls
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_camel_case_fields_become_snake_case() {
        let mut body = json!({
            "model": "m",
            "messages": [
                {"role": "assistant", "content": "", "toolCalls": [
                    {"id": "call_1", "index": 0, "type": "function", "function": {"name": "f", "arguments": "{}"}}
                ]},
                {"role": "tool", "content": "42", "toolCallId": "call_1"},
                {"role": "user", "content": "hi", "name": null, "timestamp": 1}
            ]
        });
        normalize_message_fields(&mut body);

        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs[0]["tool_calls"][0]["id"], "call_1");
        assert!(msgs[0]["tool_calls"][0].get("index").is_none());
        assert!(msgs[0].get("toolCalls").is_none());
        assert_eq!(msgs[1]["tool_call_id"], "call_1");
        assert!(msgs[1].get("toolCallId").is_none());
        assert_eq!(msgs[2], json!({"role": "user", "content": "hi"}));
        assert_eq!(body["model"], "m");
    }

    #[test]
    fn test_body_without_messages_is_untouched() {
        let mut body = json!({"model": "gpt-image-1", "prompt": "fox"});
        let before = body.clone();
        normalize_message_fields(&mut body);
        assert_eq!(body, before);
    }

    #[test]
    fn test_block_content_is_preserved() {
        let mut body = json!({"messages": [
            {"role": "user", "content": [{"type": "tool_result", "tool_use_id": "t1", "content": "ok"}]}
        ]});
        let before = body.clone();
        normalize_message_fields(&mut body);
        assert_eq!(body, before);
    }
}
