//! Conditional retry operator.
//!
//! [`retry_if`] re-runs an async operation from scratch while a predicate
//! accepts the failure and the retry budget lasts. [`retry`] applies a
//! request's [`RetryPolicy`] the same way.

use crate::error::FetchError;
use std::{error::Error, fmt, future::Future, sync::Arc, time::Duration};
use tracing::debug;

/// The error type retry predicates inspect.
pub type DynError = dyn Error + Send + Sync + 'static;

type Predicate = Arc<dyn Fn(&DynError) -> bool + Send + Sync>;

/// How often, and for which failures, a source fetch is retried.
#[derive(Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    should_retry: Predicate,
    backoff: Duration,
}

impl RetryPolicy {
    /// Retry up to `max_retries` times while `should_retry` accepts the error.
    pub fn new<F>(max_retries: u32, should_retry: F) -> Self
    where
        F: Fn(&DynError) -> bool + Send + Sync + 'static,
    {
        Self {
            max_retries,
            should_retry: Arc::new(should_retry),
            backoff: Duration::ZERO,
        }
    }

    /// Retry any failure up to `max_retries` times.
    pub fn always(max_retries: u32) -> Self {
        Self::new(max_retries, |_| true)
    }

    /// Retry only failures classified as [`FetchError::Transient`].
    pub fn transient(max_retries: u32) -> Self {
        Self::new(max_retries, |err| {
            err.downcast_ref::<FetchError>()
                .is_some_and(FetchError::is_transient)
        })
    }

    /// Wait `backoff` before each retry.
    #[must_use]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Maximum number of retries after the first attempt.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay between attempts.
    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    /// Whether `err` qualifies for a retry, budget aside.
    pub fn should_retry(&self, err: &DynError) -> bool {
        (self.should_retry)(err)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .finish_non_exhaustive()
    }
}

/// Run `operation`, retrying failures accepted by `should_retry`.
///
/// At most `max_retries` retries follow the first attempt. When the budget
/// runs out or the predicate rejects a failure, that failure is returned
/// unchanged.
pub async fn retry_if<T, E, F, Fut, P>(
    max_retries: u32,
    backoff: Duration,
    mut should_retry: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: FnMut(&E) -> bool,
{
    let mut remaining = max_retries;
    let mut attempt: u32 = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if remaining > 0 && should_retry(&err) => {
                remaining -= 1;
                debug!(attempt, remaining, "attempt failed, retrying");
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Run `operation` under an optional [`RetryPolicy`].
///
/// Without a policy the first failure propagates.
pub async fn retry<T, E, F, Fut>(policy: Option<&RetryPolicy>, operation: F) -> Result<T, E>
where
    E: Error + Send + Sync + 'static,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    match policy {
        Some(policy) => {
            retry_if(
                policy.max_retries,
                policy.backoff,
                |err: &E| policy.should_retry(err),
                operation,
            )
            .await
        }
        None => retry_if(0, Duration::ZERO, |_: &E| false, operation).await,
    }
}
