use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::adapters::ChatAdapter;
use crate::overrides::{apply_request_overrides, OverrideOutcome};
use crate::pipeline::IncrementStream;
use crate::registry::AdapterRegistry;
use crate::transport::{Transport, TransportError};
use crate::types::{UnifiedRequest, UnifiedResponse};
use crate::{Error, Result};

use super::builder::DispatcherBuilder;
use super::hooks::{AfterCallGuard, CallHooks};
use super::messages::normalize_message_fields;

/// Result of a dispatched call.
pub enum ChatOutcome {
    /// Lazy increments; nothing is read from the body until polled.
    Stream(IncrementStream),
    Complete(UnifiedResponse),
}

impl ChatOutcome {
    pub fn is_stream(&self) -> bool {
        matches!(self, ChatOutcome::Stream(_))
    }

    pub fn into_stream(self) -> Option<IncrementStream> {
        match self {
            ChatOutcome::Stream(s) => Some(s),
            ChatOutcome::Complete(_) => None,
        }
    }

    pub fn into_response(self) -> Option<UnifiedResponse> {
        match self {
            ChatOutcome::Complete(r) => Some(r),
            ChatOutcome::Stream(_) => None,
        }
    }
}

impl std::fmt::Debug for ChatOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatOutcome::Stream(_) => f.write_str("ChatOutcome::Stream(..)"),
            ChatOutcome::Complete(r) => f.debug_tuple("ChatOutcome::Complete").field(r).finish(),
        }
    }
}

/// Everything needed to send one call, before anything touches the network.
#[derive(Clone)]
pub struct PreparedCall {
    pub adapter: Arc<dyn ChatAdapter>,
    pub endpoint: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
    pub stream: bool,
}

/// Header values are credentials; only their names are printed.
impl std::fmt::Debug for PreparedCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut header_names: Vec<&str> = self.headers.keys().map(String::as_str).collect();
        header_names.sort_unstable();
        f.debug_struct("PreparedCall")
            .field("adapter", &self.adapter.key().to_string())
            .field("endpoint", &self.endpoint)
            .field("headers", &header_names)
            .field("body", &loggable_payload(&self.body))
            .field("stream", &self.stream)
            .finish()
    }
}

/// Resolves the adapter, builds the vendor request, sends it and decodes the
/// answer.
///
/// Holds no per-call state; one instance serves concurrent calls.
#[derive(Clone)]
pub struct Dispatcher {
    pub(crate) registry: Arc<AdapterRegistry>,
    pub(crate) transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    pub fn new(registry: Arc<AdapterRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
        }
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    /// Resolve the adapter and build endpoint, headers and body.
    ///
    /// Pure apart from logging; `req` is never modified.
    pub fn prepare(&self, req: &UnifiedRequest) -> Result<PreparedCall> {
        let adapter = self
            .registry
            .get_adapter(&req.provider_type, req.effective_api_version())?;

        let mut headers = adapter.build_headers(req);
        if let Some(extra) = adapter.get_headers(req) {
            headers.extend(extra);
        }

        let endpoint = adapter.get_endpoint(&req.base_url)?;
        let mut body = adapter.transform_request(req)?;

        if let Some(overrides) = req.request_overrides.as_ref() {
            match apply_request_overrides(&mut body, overrides) {
                OverrideOutcome::Applied => {}
                OverrideOutcome::Rejected { key_path } => {
                    debug!(adapter = %adapter.key(), key = key_path.as_str(), "sending body without overrides");
                }
                OverrideOutcome::Ignored => {
                    debug!(adapter = %adapter.key(), "ignoring request overrides that are not a JSON object");
                }
            }
        }

        normalize_message_fields(&mut body);

        Ok(PreparedCall {
            adapter,
            endpoint,
            headers,
            body,
            stream: req.stream,
        })
    }

    /// Run one unified chat call.
    ///
    /// `hooks.before_call` runs right before the request is sent and
    /// `hooks.after_call` exactly once after it, whatever the outcome.
    /// Cancelling `cancel` aborts the request, or ends the returned stream.
    /// Non-2xx answers become [`Error::Remote`]; nothing is retried.
    pub async fn unified_chat_request(
        &self,
        req: &UnifiedRequest,
        cancel: CancellationToken,
        hooks: &dyn CallHooks,
    ) -> Result<ChatOutcome> {
        let call = self.prepare(req)?;
        let call_id = Uuid::new_v4().to_string();
        let provider = req
            .provider_name
            .as_deref()
            .unwrap_or_else(|| req.provider_type.as_str());

        info!(
            call_id = call_id.as_str(),
            provider,
            adapter = %call.adapter.key(),
            model = req.model.as_str(),
            endpoint = call.endpoint.as_str(),
            stream = call.stream,
            "dispatching chat request"
        );
        debug!(call_id = call_id.as_str(), payload = %loggable_payload(&call.body), "request payload");

        hooks.before_call();
        let _after_call = AfterCallGuard::new(hooks);
        let start = Instant::now();

        let resp = with_cancel(
            &cancel,
            self.transport.post_json(&call.endpoint, &call.headers, &call.body),
        )
        .await?;

        if !resp.is_success() {
            let status = resp.status;
            let status_text = resp.status_text.clone();
            let raw = match with_cancel(&cancel, resp.text()).await {
                Ok(raw) => raw,
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    debug!(call_id = call_id.as_str(), error = %e, "could not read error body");
                    String::new()
                }
            };
            info!(
                call_id = call_id.as_str(),
                http_status = status,
                endpoint = call.endpoint.as_str(),
                duration_ms = start.elapsed().as_millis() as u64,
                "chat request failed"
            );
            return Err(Error::remote(status, status_text, &raw));
        }

        if call.stream {
            debug!(call_id = call_id.as_str(), "streaming response");
            return Ok(ChatOutcome::Stream(
                call.adapter.transform_stream_response(resp.body, cancel),
            ));
        }

        let json = with_cancel(&cancel, resp.json()).await?;
        let response = call.adapter.transform_not_stream_response(&json)?;
        debug!(
            call_id = call_id.as_str(),
            duration_ms = start.elapsed().as_millis() as u64,
            finish_reason = response.finish_reason.as_str(),
            "chat request completed"
        );
        Ok(ChatOutcome::Complete(response))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// Race `fut` against the cancellation token.
async fn with_cancel<T>(
    cancel: &CancellationToken,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(TransportError::Cancelled.into()),
        out = fut => out,
    }
}

/// The body with `messages` and `tools` elided.
fn loggable_payload(body: &Value) -> Value {
    let mut payload = body.clone();
    if let Value::Object(map) = &mut payload {
        for key in ["messages", "tools"] {
            if let Some(v) = map.get_mut(key) {
                let n = v.as_array().map_or(0, Vec::len);
                *v = Value::String(format!("<{} elided>", n));
            }
        }
    }
    payload
}
