//! # Message receive loops.
//!
//! A [`MessageReceiver`] handles one message per call. The host drives each
//! receiver with [`run_receiver`]:
//!
//! ```text
//! loop {
//!   policy.run(|| receiver.receive_message(token))
//!     ├─ Ok                     → next message
//!     ├─ Err(Canceled)          → exit
//!     ├─ Err(Disposed)          → exit
//!     └─ Err(e)                 → warn!, pause (cancellable), next message
//! }
//! ```
//!
//! A single bad message never ends the loop; only cancellation or a disposed
//! connection does.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::{Connection, Received};
use crate::error::ConnectionError;
use crate::policies::RetryPolicy;

/// Handles incoming messages, one per call.
#[async_trait]
pub trait MessageReceiver: Send + Sync + 'static {
    /// Name used in logs and in `RuntimeError::GraceExceeded`.
    fn name(&self) -> &str;

    /// Receives and handles one message.
    ///
    /// Should return [`ConnectionError::Canceled`] promptly once `token` fires.
    async fn receive_message(&self, token: &CancellationToken) -> Result<(), ConnectionError>;
}

/// Calls `receiver` until `token` is cancelled.
pub async fn run_receiver(
    receiver: Arc<dyn MessageReceiver>,
    policy: Arc<dyn RetryPolicy>,
    pause: Duration,
    token: CancellationToken,
) {
    debug!(receiver = %receiver.name(), "receive loop started");

    while !token.is_cancelled() {
        let r = Arc::clone(&receiver);
        let t = token.clone();
        let res = policy
            .run(Box::new(move || {
                let r = Arc::clone(&r);
                let t = t.clone();
                async move { r.receive_message(&t).await }.boxed()
            }))
            .await;

        match res {
            Ok(()) => {}
            Err(ConnectionError::Canceled) => break,
            Err(err @ ConnectionError::Disposed { .. }) => {
                info!(receiver = %receiver.name(), reason = %err, "receive loop ends");
                break;
            }
            Err(err) => {
                warn!(receiver = %receiver.name(), error = %err, label = err.as_label(), "receive failed");
                tokio::select! {
                    _ = tokio::time::sleep(pause) => {}
                    _ = token.cancelled() => break,
                }
            }
        }
    }

    debug!(receiver = %receiver.name(), "receive loop stopped");
}

/// Reads messages from a connection and logs them at `debug`.
pub struct LogReceiver {
    name: String,
    connection: Arc<Connection>,
}

impl LogReceiver {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self {
            name: format!("log:{}", connection.endpoint().name()),
            connection,
        }
    }
}

#[async_trait]
impl MessageReceiver for LogReceiver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn receive_message(&self, token: &CancellationToken) -> Result<(), ConnectionError> {
        let endpoint = self.connection.endpoint().name();
        match self.connection.receive(token).await? {
            Received::Text(message) => {
                debug!(endpoint = %endpoint, message = %message, "message received");
            }
            Received::Closed => debug!(endpoint = %endpoint, "peer closed the stream"),
        }
        Ok(())
    }
}
