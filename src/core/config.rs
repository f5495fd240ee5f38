//! # Host configuration.
//!
//! [`HostConfig`] holds the settings the [`Host`](crate::Host) applies to the
//! whole process: shutdown grace, the retry schedule shared by reconnects and
//! receive loops, and the pause after a failed receive.
//!
//! ## Sentinel values
//! - `grace = 0s` → do not wait: stop listeners and receive loops are abandoned immediately.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::policies::{BackoffPolicy, BackoffRetry};

/// Process-wide settings for the host runtime.
///
/// ## Field semantics
/// - `grace`: bound for the `ApplicationStop` listeners, and again for receive loops to exit
/// - `retry`: delay schedule for reconnects and receive retries
/// - `receive_pause`: pause before a receive loop continues after a non-retryable failure
#[derive(Clone, Debug)]
pub struct HostConfig {
    /// Maximum time to wait at each shutdown step.
    ///
    /// When shutdown is requested:
    /// - `ApplicationStop` listeners run, bounded by `grace`
    /// - the shutdown token is cancelled
    /// - receive loops get up to `grace` to exit, otherwise
    ///   `RuntimeError::GraceExceeded` is returned
    pub grace: Duration,

    /// Backoff between connect attempts and between receive retries.
    pub retry: BackoffPolicy,

    /// Pause before a receive loop continues after an error the retry policy gave up on.
    pub receive_pause: Duration,
}

impl HostConfig {
    /// Retry policy built from `retry`, cancelled by `token`.
    pub fn retry_policy(&self, token: CancellationToken) -> BackoffRetry {
        BackoffRetry::new(self.retry, token)
    }
}

impl Default for HostConfig {
    /// - `grace = 30s`
    /// - `retry = BackoffPolicy::default()` (100ms constant, retry forever)
    /// - `receive_pause = 100ms`
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(30),
            retry: BackoffPolicy::default(),
            receive_pause: Duration::from_millis(100),
        }
    }
}
