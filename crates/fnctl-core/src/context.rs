//! Per-call deadline and cancellation

use crate::config::DEFAULT_HTTP_TIMEOUT;
use crate::error::{FnError, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Deadline plus cancellation token carried by every network operation.
///
/// Child contexts share the token, so cancelling the parent aborts any
/// nested retry loop as well.
#[derive(Debug, Clone)]
pub struct CallContext {
    deadline: Instant,
    timeout: Duration,
    cancel: CancellationToken,
}

impl CallContext {
    pub fn new(timeout: Duration) -> Self {
        Self::with_token(timeout, CancellationToken::new())
    }

    pub fn with_token(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            timeout,
            cancel,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Drive `fut` until it completes, the deadline passes, or the token fires.
    ///
    /// On deadline or cancellation the future is dropped, which aborts the
    /// in-flight request and closes its connection.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.cancel.is_cancelled() {
            return Err(FnError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FnError::Cancelled),
            _ = tokio::time::sleep_until(self.deadline) => Err(FnError::Timeout(format!(
                "deadline of {:?} exceeded",
                self.timeout
            ))),
            result = fut => result,
        }
    }

    /// Sleep for `delay`, returning early with an error if the context ends first.
    pub async fn sleep(&self, delay: Duration) -> Result<()> {
        self.run(async {
            tokio::time::sleep(delay).await;
            Ok(())
        })
        .await
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new(DEFAULT_HTTP_TIMEOUT)
    }
}
