//! A cloneable handle for cancelling a session from another task.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A cloneable handle for poking a running session from external code.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) cancel: CancellationToken,
    pub(crate) session_id: Arc<str>,
}

impl SessionHandle {
    pub(crate) fn new(session_id: &str) -> Self {
        Self {
            cancel: CancellationToken::new(),
            session_id: Arc::from(session_id),
        }
    }

    /// Request cancellation. Idempotent; the session tears down on its next poll.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}
