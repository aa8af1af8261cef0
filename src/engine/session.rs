//! Scoped terminal session
//!
//! Wraps an initialized backend and guarantees it is torn down exactly once:
//! either explicitly through `release`, or on drop if the render loop exits
//! abnormally.

use tracing::{debug, warn};

use crate::backend::TerminalBackend;
use crate::error::BackendError;

pub struct TerminalSession<B: TerminalBackend> {
    backend: Option<B>,
}

impl<B: TerminalBackend> TerminalSession<B> {
    /// Take ownership of a backend that has already been initialized
    pub fn new(backend: B) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    pub fn backend(&mut self) -> Result<&mut B, BackendError> {
        self.backend.as_mut().ok_or(BackendError::NotInitialized)
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    /// Flush, clear, sync and close the backend, then hand it back.
    ///
    /// Every step is best-effort: failures are logged, never escalated.
    /// Returns `None` if the session was already released.
    pub fn release(&mut self) -> Option<B> {
        let mut backend = self.backend.take()?;

        best_effort("flush", backend.flush());
        best_effort("clear", backend.clear());
        best_effort("sync", backend.sync());
        best_effort("close", backend.close());

        debug!("Terminal session released");
        Some(backend)
    }
}

impl<B: TerminalBackend> Drop for TerminalSession<B> {
    fn drop(&mut self) {
        if self.is_open() {
            warn!("Terminal session dropped without release; closing");
            self.release();
        }
    }
}

fn best_effort(step: &str, result: Result<(), BackendError>) {
    if let Err(e) = result {
        warn!("Shutdown {} failed: {}", step, e);
    }
}
