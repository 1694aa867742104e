//! Call lifecycle hooks.

/// Callbacks around the network phase of a call.
///
/// `before_call` runs right before the request is sent. `after_call` runs
/// exactly once afterwards on every exit path (success, remote error,
/// transport error, cancellation), when the dispatcher returns. For streaming
/// calls that is when the stream is handed to the caller, not when it ends.
pub trait CallHooks: Send + Sync {
    fn before_call(&self) {}

    fn after_call(&self) {}
}

/// Hooks that do nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl CallHooks for NoopHooks {}

/// Hooks backed by two closures.
pub struct FnHooks<B, A> {
    before: B,
    after: A,
}

impl<B, A> FnHooks<B, A>
where
    B: Fn() + Send + Sync,
    A: Fn() + Send + Sync,
{
    pub fn new(before: B, after: A) -> Self {
        Self { before, after }
    }
}

impl<B, A> CallHooks for FnHooks<B, A>
where
    B: Fn() + Send + Sync,
    A: Fn() + Send + Sync,
{
    fn before_call(&self) {
        (self.before)()
    }

    fn after_call(&self) {
        (self.after)()
    }
}

/// Fires `after_call` when dropped.
pub(crate) struct AfterCallGuard<'a> {
    hooks: &'a dyn CallHooks,
}

impl<'a> AfterCallGuard<'a> {
    pub(crate) fn new(hooks: &'a dyn CallHooks) -> Self {
        Self { hooks }
    }
}

impl Drop for AfterCallGuard<'_> {
    fn drop(&mut self) {
        self.hooks.after_call();
    }
}
