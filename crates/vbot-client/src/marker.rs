//! Cancellation marker tying a poll loop to one submission.

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

/// Cancellable handle shared by a submission and its poll loop.
///
/// Once cancelled the loop performs no further requests and renders nothing,
/// including for a request already in flight. Render calls happen while the
/// render gate is held, and [`PollMarker::supersede`] waits for the gate, so
/// after it returns no render of this loop is running or will start.
#[derive(Debug, Clone, Default)]
pub struct PollMarker {
    token: CancellationToken,
    render_gate: Arc<Mutex<()>>,
}

impl PollMarker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel without waiting. Safe to call from inside a render callback.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel, then wait until any render in progress has finished.
    pub async fn supersede(&self) {
        self.token.cancel();
        drop(self.render_gate.lock().await);
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the marker has been cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }

    /// Hold the render gate. Check [`PollMarker::is_cancelled`] under it
    /// before every render call.
    pub(crate) async fn render_gate(&self) -> MutexGuard<'_, ()> {
        self.render_gate.lock().await
    }
}
