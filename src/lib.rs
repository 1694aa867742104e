//! # ai-chat-bridge
//!
//! Client-side protocol normalization for chat-completion APIs.
//!
//! OpenAI-style, Azure OpenAI, Claude (messages, chat-compatible and legacy
//! completion) and OpenAI image generation endpoints all differ in auth
//! scheme, payload shape and streaming framing. This crate hides those
//! differences behind one contract: a [`UnifiedRequest`] goes in, and either a
//! [`UnifiedResponse`] or a lazy stream of [`UnifiedStreamIncrement`]s comes
//! out.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`adapters::ChatAdapter`] | Per provider×version translator between unified and vendor shapes |
//! | [`registry::AdapterRegistry`] | Adapters keyed by `(provider_type, api_version)` |
//! | [`overrides`] | Guarded deep merge of caller supplied payload overrides |
//! | [`client::Dispatcher`] | Single entry point that resolves, builds, sends and decodes |
//! | [`pipeline::decode::StreamDecoder`] | Line-framing state machine for streaming bodies |
//! | [`transport`] | HTTP seam (reqwest implementation plus a substitutable trait) |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_chat_bridge::{ChatMessage, ChatOutcome, Dispatcher, NoopHooks, ProviderType, UnifiedRequest};
//! use futures::StreamExt;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> ai_chat_bridge::Result<()> {
//!     let dispatcher = Dispatcher::builder().build()?;
//!
//!     let request = UnifiedRequest::new(
//!         ProviderType::OpenAi,
//!         "https://api.openai.com",
//!         "sk-...",
//!         "gpt-4o-mini",
//!     )
//!     .with_messages(vec![ChatMessage::user("Hello!")]);
//!
//!     let outcome = dispatcher
//!         .unified_chat_request(&request, CancellationToken::new(), &NoopHooks)
//!         .await?;
//!
//!     if let ChatOutcome::Stream(mut stream) = outcome {
//!         while let Some(increment) = stream.next().await {
//!             print!("{}", increment?.content.unwrap_or_default());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod client;
pub mod config;
pub mod overrides;
pub mod pipeline;
pub mod registry;
pub mod telemetry;
pub mod transport;
pub mod types;

pub use adapters::ChatAdapter;
pub use client::{CallHooks, ChatOutcome, Dispatcher, DispatcherBuilder, FnHooks, NoopHooks};
pub use config::TransportConfig;
pub use registry::{AdapterKey, AdapterRegistry};
pub use types::{
    message::{ChatMessage, ContentPart, MessageContent, Role},
    request::{ModelType, ProviderType, RequestOptions, UnifiedRequest},
    response::{FinishReason, TokenUsage, UnifiedResponse, UnifiedStreamIncrement},
    tool::{FunctionCall, ToolCall},
};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext, ProtocolError};
