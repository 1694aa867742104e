use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Proxy;
use serde_json::Value;
use std::collections::HashMap;

use super::{Transport, TransportError, TransportResponse};
use crate::config::TransportConfig;
use crate::Result;

/// reqwest-backed [`Transport`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(config.pool_idle_timeout))
            .http2_adaptive_window(true);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(proxy_url) = config.proxy_url.as_deref() {
            let proxy = Proxy::all(proxy_url).map_err(TransportError::Http)?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(headers.len());
        for (k, v) in headers {
            let name = HeaderName::from_bytes(k.as_bytes())
                .map_err(|_| TransportError::InvalidHeader(k.clone()))?;
            let value = HeaderValue::from_str(v)
                .map_err(|_| TransportError::InvalidHeader(k.clone()))?;
            map.insert(name, value);
        }
        Ok(map)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> Result<TransportResponse> {
        let resp = self
            .client
            .post(url)
            .headers(Self::header_map(headers)?)
            .json(body)
            .send()
            .await
            .map_err(TransportError::Http)?;

        let status = resp.status();
        let body = resp
            .bytes_stream()
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)));

        Ok(TransportResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body: Box::pin(body),
        })
    }
}
