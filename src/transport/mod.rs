//! HTTP seam.
//!
//! The dispatcher only needs "POST this JSON, give me status and a byte
//! stream". [`Transport`] captures exactly that so tests can substitute an
//! in-memory implementation; [`HttpTransport`] is the reqwest-backed one.

mod http;

pub use http::HttpTransport;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use serde_json::Value;
use std::collections::HashMap;

use crate::{BoxStream, Result};

/// Raw response body, yielded chunk by chunk.
pub type ByteStream = BoxStream<'static, Bytes>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    #[error("Transport error: {0}")]
    Other(String),
}

/// Status line plus an unread body.
pub struct TransportResponse {
    pub status: u16,
    /// Canonical reason phrase for `status`, e.g. `Too Many Requests`.
    pub status_text: String,
    pub body: ByteStream,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Drain the body into a string (lossy UTF-8).
    pub async fn text(self) -> Result<String> {
        let mut body = self.body;
        let mut buf = Vec::new();
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    pub async fn json(self) -> Result<Value> {
        let text = self.text().await?;
        Ok(serde_json::from_str(&text)?)
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("status", &self.status)
            .field("status_text", &self.status_text)
            .finish_non_exhaustive()
    }
}

/// One POST per call. Implementations must not retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> Result<TransportResponse>;
}
