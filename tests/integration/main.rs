//! Integration tests with mock HTTP server and in-memory transport

mod dispatch;
mod fake_transport;
mod mock_server;
mod streaming;

use ai_chat_bridge::CallHooks;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Hooks that count their invocations.
#[derive(Default)]
pub struct CountingHooks {
    pub before: AtomicUsize,
    pub after: AtomicUsize,
}

impl CountingHooks {
    pub fn counts(&self) -> (usize, usize) {
        (
            self.before.load(Ordering::SeqCst),
            self.after.load(Ordering::SeqCst),
        )
    }
}

impl CallHooks for CountingHooks {
    fn before_call(&self) {
        self.before.fetch_add(1, Ordering::SeqCst);
    }

    fn after_call(&self) {
        self.after.fetch_add(1, Ordering::SeqCst);
    }
}
