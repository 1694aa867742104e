//! Unified responses and stream increments

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::Role;
use super::tool::ToolCall;

/// Why a completion stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    #[default]
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolCalls => "tool_calls",
            FinishReason::ContentFilter => "content_filter",
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Fill counters left at zero from an earlier report for the same call,
    /// as when input and output tokens arrive in separate stream events.
    pub fn carry_forward(&mut self, earlier: &TokenUsage) {
        if self.prompt_tokens == 0 {
            self.prompt_tokens = earlier.prompt_tokens;
        }
        if self.completion_tokens == 0 {
            self.completion_tokens = earlier.completion_tokens;
        }
        self.total_tokens = self.total_tokens.max(self.prompt_tokens + self.completion_tokens);
    }
}

/// Terminal result of a non-streaming call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedResponse {
    pub id: String,
    pub model: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    pub finish_reason: FinishReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    /// Raw vendor response for debugging.
    #[serde(default)]
    pub raw: Value,
}

/// One step of a streaming result.
///
/// Content and tool-call fields are fragments; tool-call fragments carry an
/// `index` so the caller can reassemble them. `finish_reason` is only set on
/// the terminal increment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UnifiedStreamIncrement {
    pub id: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(default)]
    pub raw: Value,
}

impl UnifiedStreamIncrement {
    pub fn new(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.finish_reason.is_some()
    }

    /// True when the increment carries nothing a caller could act on.
    pub fn is_empty(&self) -> bool {
        self.content.as_deref().map_or(true, str::is_empty)
            && self.reasoning.as_deref().map_or(true, str::is_empty)
            && self.tool_calls.is_none()
            && self.finish_reason.is_none()
            && self.usage.is_none()
    }
}
