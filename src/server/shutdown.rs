use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

use std::sync::{Arc, OnceLock};

/// A node-wide cancellation signal that remembers why it was raised.
///
/// Clones share the same signal. The first cause recorded wins; later calls to
/// [Shutdown::cancel] are no-ops.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
    cause: Arc<OnceLock<String>>,
}

impl Shutdown {
    pub fn new() -> Self {
        Shutdown::default()
    }

    pub fn cancel(&self, cause: impl Into<String>) {
        let _ = self.cause.set(cause.into());
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal has been raised.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn cause(&self) -> Option<String> {
        self.cause.get().cloned()
    }
}
