//! Unified request format supplied by callers

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::message::ChatMessage;

/// Normalized provider family. Selects the default auth header and, together
/// with an api version, the adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderType {
    OpenAi,
    Claude,
    AzureOpenAi,
    /// Any other vendor id; treated as OpenAI-compatible for auth purposes.
    Other(String),
}

impl ProviderType {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderType::OpenAi => "openai",
            ProviderType::Claude => "claude",
            ProviderType::AzureOpenAi => "azure-openai",
            ProviderType::Other(s) => s.as_str(),
        }
    }
}

impl From<&str> for ProviderType {
    fn from(s: &str) -> Self {
        match s {
            "openai" => ProviderType::OpenAi,
            "claude" => ProviderType::Claude,
            "azure-openai" => ProviderType::AzureOpenAi,
            other => ProviderType::Other(other.to_string()),
        }
    }
}

impl From<String> for ProviderType {
    fn from(s: String) -> Self {
        ProviderType::from(s.as_str())
    }
}

impl From<ProviderType> for String {
    fn from(p: ProviderType) -> Self {
        p.as_str().to_string()
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What kind of generation the call performs; picks the default api version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelType {
    #[default]
    #[serde(rename = "t2t")]
    TextChat,
    #[serde(rename = "t2i")]
    TextToImage,
}

impl ModelType {
    /// Api version used when the request leaves `api_version` unset.
    pub fn default_api_version(&self) -> &'static str {
        match self {
            ModelType::TextChat => "v1",
            ModelType::TextToImage => "gpt-image-1",
        }
    }
}

/// Sampling knobs plus free-form vendor passthrough keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_stream() -> bool {
    true
}

/// Unified chat request.
///
/// Built per call by the caller and never mutated by the adapter layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnifiedRequest {
    pub provider_type: ProviderType,
    /// User-facing provider label, used only for logging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub model_type: ModelType,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Tool descriptors, flat (`name`/`inputSchema`) or already function-shaped.
    #[serde(default)]
    pub tools: Vec<Value>,
    /// System prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default)]
    pub options: RequestOptions,
    /// Partial payload deep-merged into the vendor body; only JSON objects are honored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_overrides: Option<Value>,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

impl UnifiedRequest {
    pub fn new(
        provider_type: ProviderType,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider_type,
            provider_name: None,
            api_version: None,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
            model_type: ModelType::TextChat,
            messages: Vec::new(),
            tools: Vec::new(),
            prompt: None,
            options: RequestOptions::default(),
            request_overrides: None,
            stream: default_stream(),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    pub fn with_model_type(mut self, model_type: ModelType) -> Self {
        self.model_type = model_type;
        self
    }

    pub fn with_messages(mut self, messages: Vec<ChatMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_tools(mut self, tools: Vec<Value>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_request_overrides(mut self, overrides: Value) -> Self {
        self.request_overrides = Some(overrides);
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// The api version the dispatcher resolves adapters with.
    pub fn effective_api_version(&self) -> &str {
        self.api_version
            .as_deref()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.model_type.default_api_version())
    }
}
