//! Exponential backoff for transient failures

use crate::context::CallContext;
use crate::error::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

/// Retry configuration for idempotent control-plane calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,

    /// Delay cap before the first retry
    pub initial_delay: Duration,

    /// Upper bound for any single delay
    pub max_delay: Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,

    /// Hard cap on total time spent across attempts
    pub max_elapsed: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            max_elapsed: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_elapsed(mut self, max_elapsed: Duration) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    /// Upper bound of the jittered delay before retry number `retry` (1-based)
    pub fn delay_ceiling(&self, retry: u32) -> Duration {
        let exp = self
            .backoff_multiplier
            .powi(retry.saturating_sub(1) as i32);
        let ceiling = self.initial_delay.as_secs_f64() * exp;
        Duration::from_secs_f64(ceiling.min(self.max_delay.as_secs_f64()))
    }

    /// Full jitter: uniform in `[0, delay_ceiling(retry)]`
    pub fn jittered_delay(&self, retry: u32) -> Duration {
        let ceiling = self.delay_ceiling(retry).as_millis() as u64;
        if ceiling == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::thread_rng().gen_range(0..=ceiling))
    }

    /// Run `op` until it succeeds, fails with a non-transient error, or the
    /// attempt or elapsed budget is spent. Sleeps honor `ctx`.
    pub async fn run<T, F, Fut>(&self, ctx: &CallContext, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let mut attempt = 1;
        loop {
            let err = match op().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.kind().is_transient() || attempt >= self.max_attempts {
                return Err(err);
            }

            let delay = self.jittered_delay(attempt);
            if started.elapsed() + delay >= self.max_elapsed {
                return Err(err);
            }

            warn!(
                operation = what,
                attempt,
                max_attempts = self.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying after transient failure"
            );
            ctx.sleep(delay).await?;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FnError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> FnError {
        FnError::Internal {
            status: 503,
            message: "unavailable".into(),
        }
    }

    #[test]
    fn test_delay_ceiling_grows_and_caps() {
        let policy = RetryPolicy {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(3),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.delay_ceiling(1), Duration::from_secs(1));
        assert_eq!(policy.delay_ceiling(2), Duration::from_secs(2));
        assert_eq!(policy.delay_ceiling(3), Duration::from_secs(3));
        assert_eq!(policy.delay_ceiling(10), Duration::from_secs(3));
        assert!(policy.jittered_delay(2) <= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_until_budget() {
        let calls = AtomicU32::new(0);
        let ctx = CallContext::new(Duration::from_secs(300));
        let result: Result<()> = RetryPolicy::default()
            .with_max_attempts(4)
            .run(&ctx, "get app", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        assert!(matches!(result, Err(FnError::Internal { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient() {
        let calls = AtomicU32::new(0);
        let ctx = CallContext::new(Duration::from_secs(300));
        let value = RetryPolicy::default()
            .run(&ctx, "list apps", || async {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(FnError::Transport("connection reset".into()))
                } else {
                    Ok("ok")
                }
            })
            .await
            .unwrap();

        assert_eq!(value, "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_bad_request_is_not_retried() {
        let calls = AtomicU32::new(0);
        let ctx = CallContext::default();
        let result: Result<()> = RetryPolicy::default()
            .run(&ctx, "update app", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(FnError::BadRequest("invalid".into()))
            })
            .await;

        assert!(matches!(result, Err(FnError::BadRequest(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_cap_stops_retrying() {
        let calls = AtomicU32::new(0);
        let ctx = CallContext::new(Duration::from_secs(300));
        let policy = RetryPolicy::default()
            .with_max_attempts(100)
            .with_initial_delay(Duration::from_secs(5))
            .with_max_elapsed(Duration::ZERO);
        let result: Result<()> = policy
            .run(&ctx, "delete app", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
