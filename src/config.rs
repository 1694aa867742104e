//! HTTP transport configuration.
//!
//! Defaults suit long-lived streaming calls: no whole-request timeout unless
//! one is asked for, a bounded connect timeout, and a warm connection pool.
//! Every knob can be overridden from the environment.

use std::env;
use std::time::Duration;

/// Settings for [`HttpTransport`](crate::transport::HttpTransport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Whole-request timeout. `None` leaves streams open as long as the vendor keeps sending.
    pub timeout: Option<Duration>,
    pub connect_timeout: Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub proxy_url: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            connect_timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 32,
            pool_idle_timeout: Duration::from_secs(90),
            proxy_url: None,
        }
    }
}

impl TransportConfig {
    /// Defaults overridden by `AI_HTTP_TIMEOUT_SECS`, `AI_HTTP_CONNECT_TIMEOUT_SECS`,
    /// `AI_HTTP_POOL_MAX_IDLE_PER_HOST`, `AI_HTTP_POOL_IDLE_TIMEOUT_SECS` and `AI_PROXY_URL`.
    /// Unparseable values fall back to the default.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str| {
            lookup(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs)
        };

        Self {
            timeout: secs("AI_HTTP_TIMEOUT_SECS").or(defaults.timeout),
            connect_timeout: secs("AI_HTTP_CONNECT_TIMEOUT_SECS").unwrap_or(defaults.connect_timeout),
            pool_max_idle_per_host: lookup("AI_HTTP_POOL_MAX_IDLE_PER_HOST")
                .and_then(|s| s.trim().parse::<usize>().ok())
                .unwrap_or(defaults.pool_max_idle_per_host),
            pool_idle_timeout: secs("AI_HTTP_POOL_IDLE_TIMEOUT_SECS")
                .unwrap_or(defaults.pool_idle_timeout),
            proxy_url: lookup("AI_PROXY_URL").filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_proxy(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = Some(url.into());
        self
    }
}
