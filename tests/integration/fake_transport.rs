//! In-memory transport that records what the dispatcher sends.

use ai_chat_bridge::transport::{ByteStream, Transport, TransportError, TransportResponse};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{stream, StreamExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct SentRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

pub struct FakeTransport {
    status: u16,
    status_text: String,
    chunks: Vec<String>,
    /// Keep the body open after the last chunk instead of ending it.
    hang: bool,
    /// End the body with a transport error after the last chunk.
    fail: bool,
    sent: Mutex<Vec<SentRequest>>,
}

impl FakeTransport {
    pub fn ok(chunks: &[&str]) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            hang: false,
            fail: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn status(status: u16, status_text: &str, body: &str) -> Self {
        Self {
            status,
            status_text: status_text.to_string(),
            ..Self::ok(&[body])
        }
    }

    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn sent(&self) -> Vec<SentRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> ai_chat_bridge::Result<TransportResponse> {
        self.sent.lock().unwrap().push(SentRequest {
            url: url.to_string(),
            headers: headers.clone(),
            body: body.clone(),
        });

        let mut items: Vec<ai_chat_bridge::Result<Bytes>> = self
            .chunks
            .iter()
            .map(|c| Ok(Bytes::from(c.clone())))
            .collect();
        if self.fail {
            items.push(Err(TransportError::Other("connection reset".to_string()).into()));
        }
        let body: ByteStream = if self.hang {
            Box::pin(stream::iter(items).chain(stream::pending()))
        } else {
            Box::pin(stream::iter(items))
        };

        Ok(TransportResponse {
            status: self.status,
            status_text: self.status_text.clone(),
            body,
        })
    }
}
