use std::sync::Arc;

use crate::adapters::ChatAdapter;
use crate::client::core::Dispatcher;
use crate::config::TransportConfig;
use crate::registry::AdapterRegistry;
use crate::transport::{HttpTransport, Transport};
use crate::Result;

/// Builder for creating dispatchers with custom configuration.
///
/// Keep this surface area small and predictable. With no settings it yields
/// a dispatcher over every built-in adapter and a reqwest transport configured
/// from the environment.
pub struct DispatcherBuilder {
    registry: Option<Arc<AdapterRegistry>>,
    transport: Option<Arc<dyn Transport>>,
    transport_config: Option<TransportConfig>,
    extra_adapters: Vec<Arc<dyn ChatAdapter>>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            transport: None,
            transport_config: None,
            extra_adapters: Vec::new(),
        }
    }

    /// Share an existing registry instead of building one with the default adapters.
    pub fn registry(mut self, registry: Arc<AdapterRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Register an additional adapter. Replaces a built-in one with the same key.
    pub fn adapter<A: ChatAdapter>(mut self, adapter: A) -> Self {
        self.extra_adapters.push(Arc::new(adapter));
        self
    }

    /// Use a custom transport (for tests or a pre-configured client).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Configure the default reqwest transport. Ignored when a custom transport is set.
    ///
    /// Defaults to [`TransportConfig::from_env`].
    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = Some(config);
        self
    }

    pub fn build(self) -> Result<Dispatcher> {
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(AdapterRegistry::with_default_adapters()));
        for adapter in self.extra_adapters {
            registry.register_arc(adapter);
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(t) => t,
            None => {
                let config = self.transport_config.unwrap_or_else(TransportConfig::from_env);
                Arc::new(HttpTransport::new(&config)?)
            }
        };

        Ok(Dispatcher::new(registry, transport))
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
