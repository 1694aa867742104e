//! Dispatcher: the single entry point for a unified chat call.
//!
//! Keep the public surface small and predictable. Implementation details are
//! split into submodules under `src/client/`.

pub mod builder;
pub mod core;
pub mod hooks;
pub mod messages;

pub use builder::DispatcherBuilder;
pub use core::{ChatOutcome, Dispatcher, PreparedCall};
pub use hooks::{CallHooks, FnHooks, NoopHooks};
