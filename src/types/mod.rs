//! Unified type system shared by callers and every adapter.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`UnifiedRequest`] | Vendor-agnostic call description supplied by the caller |
//! | [`ChatMessage`] | Chat message with role, content and optional tool linkage |
//! | [`UnifiedResponse`] | Terminal non-streaming result |
//! | [`UnifiedStreamIncrement`] | One step of a streaming result |
//! | [`ToolCall`] | Tool invocation emitted by a model |
//! | [`ToolDefinition`] | Function-call shaped tool descriptor sent to vendors |
//!
//! ## Submodules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`request`] | Request, provider and model-type types |
//! | [`message`] | Messages with multimodal content support |
//! | [`response`] | Responses, increments, finish reasons and usage |
//! | [`tool`] | Tool/function calling types |
//!
//! ## Example
//!
//! ```rust
//! use ai_chat_bridge::types::{ChatMessage, ProviderType, UnifiedRequest};
//!
//! let request = UnifiedRequest::new(ProviderType::Claude, "https://api.anthropic.com", "key", "claude-sonnet-4")
//!     .with_prompt("You are a helpful assistant")
//!     .with_messages(vec![ChatMessage::user("What's the weather?")])
//!     .with_stream(false);
//! assert!(!request.stream);
//! ```

pub mod message;
pub mod request;
pub mod response;
pub mod tool;

pub use message::{ChatMessage, ContentPart, MessageContent, Role};
pub use request::{ModelType, ProviderType, RequestOptions, UnifiedRequest};
pub use response::{FinishReason, TokenUsage, UnifiedResponse, UnifiedStreamIncrement};
pub use tool::{FunctionCall, FunctionDefinition, ToolCall, ToolDefinition};
