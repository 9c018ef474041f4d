// Per-request watchdog — races each pipeline stage against the deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time;
use tracing::warn;

use crate::error::EngineError;
use crate::transport::traits::AbortHandle;

/// Deadline enforcement for one request. Each call to [`watch`] is an
/// independent registration with the same configured duration, so a request
/// with both a send and a receive phase is bounded by 2 × timeout.
///
/// [`watch`]: TimeoutGuard::watch
pub(crate) struct TimeoutGuard {
    timeout: Duration,
    abort: AbortHandle,
}

impl TimeoutGuard {
    pub(crate) fn new(timeout: Duration, abort: AbortHandle) -> Self {
        Self { timeout, abort }
    }

    /// Race one stage against the deadline. If the stage wins the guard is
    /// inert. If the deadline fires first the request is aborted once and
    /// the stage is then polled to completion, so the failure surfaces
    /// through the stage's own error path rather than a synthesized one.
    /// Drivers guarantee prompt resolution after abort.
    pub(crate) async fn watch<T, F>(&self, stage: &'static str, fut: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, EngineError>>,
    {
        tokio::pin!(fut);
        tokio::select! {
            res = &mut fut => res,
            _ = time::sleep(self.timeout) => {
                warn!(
                    stage,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "deadline elapsed, aborting request"
                );
                self.abort.abort();
                fut.await
            }
        }
    }
}
