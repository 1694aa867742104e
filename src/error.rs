use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or key that caused the error (e.g., "request.api_version", "choices[0]")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected shape, offending value)
    pub details: Option<String>,
    /// Source of the error (e.g., "adapter_registry", "openai-v1")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Vendor payload errors: a response or stream line that does not have the
/// shape the adapter expects.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid {adapter} response: {reason}")]
    InvalidResponse { adapter: String, reason: String },

    #[error("Malformed {adapter} stream chunk: {reason}")]
    MalformedChunk { adapter: String, reason: String },

    #[error("Vendor reported a stream error: {0}")]
    StreamError(String),
}

/// Unified error type for the adapter layer.
///
/// Configuration, transport and remote errors are surfaced to the caller as-is.
/// Decode warnings and override violations never appear here; they are
/// recovered locally and only logged.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Remote error: HTTP {status} {status_text}: {message}")]
    Remote {
        status: u16,
        status_text: String,
        /// Parsed JSON body when the vendor sent JSON, otherwise the raw text as a JSON string.
        body: serde_json::Value,
        message: String,
    },
}

fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Build the error for a non-2xx vendor response.
    ///
    /// The message embeds both the body (JSON if it parses, raw text otherwise)
    /// and the HTTP status text so vendor diagnostics survive.
    pub fn remote(status: u16, status_text: impl Into<String>, raw_body: &str) -> Self {
        let status_text = status_text.into();
        let body = serde_json::from_str::<serde_json::Value>(raw_body)
            .unwrap_or_else(|_| serde_json::Value::String(raw_body.to_string()));
        let message = format!("Error={}, Text={}", body, status_text);
        Error::Remote {
            status,
            status_text,
            body,
            message,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// True when the call was stopped by the caller's cancellation token.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            Error::Transport(crate::transport::TransportError::Cancelled)
        )
    }
}
