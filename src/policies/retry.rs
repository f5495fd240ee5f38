//! # Retry policy.
//!
//! [`RetryPolicy`] is the seam through which connections and receive loops
//! repeat an operation: `run(attempt)` calls the attempt until it succeeds, the
//! policy gives up, or it is cancelled.
//!
//! [`BackoffRetry`] is the built-in implementation:
//! ```text
//! loop {
//!   ├─► attempt() ── Ok ──────────────────────────► return Ok
//!   │       └─ Err(e)
//!   │            ├─ !retry_on(e)              ─────► return Err(e)
//!   │            ├─ attempts exhausted        ─────► return Err(e)
//!   │            └─ sleep(backoff.next(n)) (cancellable)
//!   │                   └─ token cancelled    ─────► return Err(Canceled)
//! }
//! ```
//!
//! ## Defaults
//! Retries forever, 100ms constant delay, on [`ConnectionError::is_retryable`].

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ConnectionError;
use crate::policies::BackoffPolicy;

/// One invocation of the operation being retried.
pub type Attempt = Box<dyn FnMut() -> BoxFuture<'static, Result<(), ConnectionError>> + Send>;

/// Predicate selecting the errors that are retried.
pub type RetryOn = Arc<dyn Fn(&ConnectionError) -> bool + Send + Sync>;

/// Runs an operation under a retry discipline.
#[async_trait]
pub trait RetryPolicy: Send + Sync + 'static {
    /// Calls `attempt` until it succeeds or the policy stops retrying.
    async fn run(&self, attempt: Attempt) -> Result<(), ConnectionError>;
}

/// Retry with a [`BackoffPolicy`] delay between attempts.
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::time::Duration;
/// use futures::FutureExt;
/// use tokio_util::sync::CancellationToken;
/// use streamkeeper::{BackoffPolicy, BackoffRetry, ConnectionError, RetryPolicy, TransportError};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let policy = BackoffRetry::new(BackoffPolicy::constant(Duration::from_millis(1)), CancellationToken::new());
/// let calls = Arc::new(AtomicU32::new(0));
/// let c = Arc::clone(&calls);
///
/// let res = policy
///     .run(Box::new(move || {
///         let n = c.fetch_add(1, Ordering::SeqCst);
///         async move {
///             if n < 2 {
///                 Err(ConnectionError::Transport { endpoint: "demo".into(), source: TransportError::Closed })
///             } else {
///                 Ok(())
///             }
///         }
///         .boxed()
///     }))
///     .await;
///
/// assert!(res.is_ok());
/// assert_eq!(calls.load(Ordering::SeqCst), 3);
/// # }
/// ```
#[derive(Clone)]
pub struct BackoffRetry {
    backoff: BackoffPolicy,
    max_attempts: Option<u32>,
    retry_on: RetryOn,
    token: CancellationToken,
}

impl BackoffRetry {
    /// Retries forever on retryable errors; the delay sleep is cancelled by `token`.
    pub fn new(backoff: BackoffPolicy, token: CancellationToken) -> Self {
        Self {
            backoff,
            max_attempts: None,
            retry_on: Arc::new(ConnectionError::is_retryable),
            token,
        }
    }

    /// Gives up after `n` attempts (`n` is clamped to at least 1).
    #[must_use]
    pub fn with_max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = Some(n.max(1));
        self
    }

    /// Replaces the predicate selecting retried errors.
    #[must_use]
    pub fn with_retry_on<F>(mut self, f: F) -> Self
    where
        F: Fn(&ConnectionError) -> bool + Send + Sync + 'static,
    {
        self.retry_on = Arc::new(f);
        self
    }

    /// Backoff schedule in use.
    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }
}

#[async_trait]
impl RetryPolicy for BackoffRetry {
    async fn run(&self, mut attempt: Attempt) -> Result<(), ConnectionError> {
        let mut failures: u32 = 0;

        loop {
            let err = match attempt().await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            if !(self.retry_on)(&err) {
                return Err(err);
            }
            failures = failures.saturating_add(1);
            if self.max_attempts.is_some_and(|max| failures >= max) {
                return Err(err);
            }

            let delay = self.backoff.next(failures - 1);
            debug!(error = %err, attempt = failures, delay = ?delay, "retry scheduled");

            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = self.token.cancelled() => return Err(ConnectionError::Canceled),
            }
        }
    }
}
