//! Retry policies.
//!
//! ## Contents
//! - [`BackoffPolicy`] how delays between attempts evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization to avoid reconnect storms
//! - [`RetryPolicy`]   seam used by connections and receive loops; [`BackoffRetry`] implements it
//!
//! ## Quick wiring
//! ```text
//! ReconnectBehavior::open() ──► RetryPolicy::run(|| Connection::connect(token))
//! run_receiver()            ──► RetryPolicy::run(|| MessageReceiver::receive_message(token))
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=100ms, factor=1.0 (constant), max=30s, jitter=None.
//! - `BackoffRetry::new(..)` → retry forever on retryable [`ConnectionError`](crate::ConnectionError)s.

mod backoff;
mod jitter;
mod retry;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use retry::{Attempt, BackoffRetry, RetryOn, RetryPolicy};
