//! Logging setup.
//!
//! The library itself only emits `tracing` events: request dispatch at
//! `info`, payloads and stream lifecycle at `debug`, skipped stream lines and
//! rejected overrides at `warn`. Applications that do not install their own
//! subscriber can call [`init_tracing`].

use tracing_subscriber::EnvFilter;

/// Directive used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

/// Install a fmt subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; returns `false` when a global subscriber was
/// already installed.
pub fn init_tracing() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
