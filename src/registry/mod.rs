//! Adapter registry keyed by `(provider_type, api_version)`.
//!
//! The registry is an explicit object handed to the dispatcher behind an
//! `Arc`. Registration may race with lookups from in-flight calls, so the map
//! sits behind a `RwLock`; adapters themselves are immutable once registered.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::adapters::{default_adapters, ChatAdapter};
use crate::error::{Error, ErrorContext};
use crate::types::ProviderType;
use crate::Result;

/// Registration key of an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdapterKey {
    pub provider_type: ProviderType,
    pub api_version: String,
}

impl AdapterKey {
    pub fn new(provider_type: ProviderType, api_version: impl Into<String>) -> Self {
        Self {
            provider_type,
            api_version: api_version.into(),
        }
    }
}

impl fmt::Display for AdapterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.provider_type, self.api_version)
    }
}

/// Thread-safe map from [`AdapterKey`] to adapter instance.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: RwLock<HashMap<AdapterKey, Arc<dyn ChatAdapter>>>,
}

impl AdapterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in adapter.
    pub fn with_default_adapters() -> Self {
        let registry = Self::new();
        for adapter in default_adapters() {
            registry.register_arc(adapter);
        }
        registry
    }

    /// Register an adapter under its own key.
    ///
    /// Last write wins: a previous adapter with the same key is replaced and
    /// returned.
    pub fn register<A: ChatAdapter>(&self, adapter: A) -> Option<Arc<dyn ChatAdapter>> {
        self.register_arc(Arc::new(adapter))
    }

    pub fn register_arc(&self, adapter: Arc<dyn ChatAdapter>) -> Option<Arc<dyn ChatAdapter>> {
        let key = adapter.key();
        let mut adapters = self
            .adapters
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let replaced = adapters.insert(key.clone(), adapter);
        debug!(adapter = %key, replaced = replaced.is_some(), "registered adapter");
        replaced
    }

    /// Exact-match lookup. A missing key is a configuration error; there is no
    /// fallback to another version.
    pub fn get_adapter(
        &self,
        provider_type: &ProviderType,
        api_version: &str,
    ) -> Result<Arc<dyn ChatAdapter>> {
        let key = AdapterKey::new(provider_type.clone(), api_version);
        let adapters = self
            .adapters
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        adapters.get(&key).cloned().ok_or_else(|| {
            let mut available: Vec<String> = adapters.keys().map(ToString::to_string).collect();
            available.sort();
            Error::configuration_with_context(
                format!("no adapter registered for {}", key),
                ErrorContext::new()
                    .with_field_path("request.api_version")
                    .with_details(format!("available: {}", available.join(", ")))
                    .with_source("adapter_registry"),
            )
        })
    }

    /// Every registered key, sorted.
    pub fn list_adapters(&self) -> Vec<AdapterKey> {
        let adapters = self
            .adapters
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<AdapterKey> = adapters.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn supported_provider_types(&self) -> Vec<ProviderType> {
        self.list_adapters()
            .into_iter()
            .map(|k| k.provider_type)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn supported_versions(&self, provider_type: &ProviderType) -> Vec<String> {
        self.list_adapters()
            .into_iter()
            .filter(|k| &k.provider_type == provider_type)
            .map(|k| k.api_version)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.adapters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.list_adapters())
            .finish()
    }
}
