//! # Keep a connection open.
//!
//! ```text
//! ApplicationStart ──► open()
//! ConnectionLost   ──► lost_count += 1 ──► open()
//! ApplicationStop  ──► unsubscribe ConnectionLost ──► close()
//!
//! open() = RetryPolicy::run(|| Connection::connect(shutdown))
//! ```
//!
//! The `ConnectionLost` listener is removed and the behavior's stop token is
//! cancelled before `close()` starts: an intentional close ends in a lost
//! transition, and a retry loop already running must not reconnect either.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::behaviors::Behavior;
use crate::connection::Connection;
use crate::error::{ConnectionError, ListenerError};
use crate::events::{ApplicationStart, ApplicationStop, Bus, ConnectionLost, Listener};
use crate::policies::RetryPolicy;

struct Shared {
    connection: Arc<Connection>,
    policy: Arc<dyn RetryPolicy>,
    /// Process-wide shutdown; bounds the graceful close.
    shutdown: CancellationToken,
    /// Child of `shutdown`, cancelled on `ApplicationStop`; bounds connect attempts.
    stop: CancellationToken,
    lost: AtomicU64,
}

impl Shared {
    async fn open(&self) -> Result<(), ConnectionError> {
        let connection = Arc::clone(&self.connection);
        let token = self.stop.clone();
        self.policy
            .run(Box::new(move || {
                let connection = Arc::clone(&connection);
                let token = token.clone();
                async move { connection.connect(&token).await }.boxed()
            }))
            .await
    }
}

/// Reconnects its connection on start and after every lost transition.
pub struct ReconnectBehavior {
    name: String,
    bus: Bus,
    shared: Arc<Shared>,
    enabled: AtomicBool,
}

impl ReconnectBehavior {
    /// Connect attempts end on `ApplicationStop` or on the bus shutdown token.
    pub fn new(connection: Arc<Connection>, policy: Arc<dyn RetryPolicy>, bus: &Bus) -> Self {
        let name = format!("reconnect:{}", connection.endpoint().name());
        let shutdown = bus.shutdown_token();
        Self {
            name,
            bus: bus.clone(),
            shared: Arc::new(Shared {
                connection,
                policy,
                stop: shutdown.child_token(),
                shutdown,
                lost: AtomicU64::new(0),
            }),
            enabled: AtomicBool::new(false),
        }
    }

    /// Connects under the retry policy.
    pub async fn open(&self) -> Result<(), ConnectionError> {
        self.shared.open().await
    }

    /// Number of `ConnectionLost` events handled.
    pub fn lost_count(&self) -> u64 {
        self.shared.lost.load(Ordering::Relaxed)
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.shared.connection
    }
}

impl Behavior for ReconnectBehavior {
    fn name(&self) -> &str {
        &self.name
    }

    fn enable(&self) {
        if self.enabled.swap(true, Ordering::SeqCst) {
            return;
        }
        let endpoint = self.shared.connection.endpoint().name().to_owned();

        let start = Listener::<ApplicationStart>::new(format!("{}:start", self.name), {
            let shared = Arc::clone(&self.shared);
            move |()| {
                let shared = Arc::clone(&shared);
                async move {
                    debug!(endpoint = %shared.connection.endpoint().name(), "connecting on startup");
                    shared.open().await.map_err(ListenerError::from)
                }
            }
        });

        let lost_condition = self.bus.condition_for::<ConnectionLost>(&endpoint);
        let lost = Listener::<ConnectionLost>::new(format!("{}:lost", self.name), {
            let shared = Arc::clone(&self.shared);
            move |_| {
                let shared = Arc::clone(&shared);
                async move {
                    let n = shared.lost.fetch_add(1, Ordering::Relaxed) + 1;
                    info!(
                        endpoint = %shared.connection.endpoint().name(),
                        lost = n,
                        "connection lost, reconnecting"
                    );
                    shared.open().await.map_err(ListenerError::from)
                }
            }
        });

        let stop = Listener::<ApplicationStop>::new(format!("{}:stop", self.name), {
            let shared = Arc::clone(&self.shared);
            let lost_condition = lost_condition.clone();
            let lost = lost.clone();
            move |()| {
                let shared = Arc::clone(&shared);
                let lost_condition = lost_condition.clone();
                let lost = lost.clone();
                async move {
                    let name = shared.connection.endpoint().name().to_owned();
                    debug!(endpoint = %name, "closing on shutdown");
                    lost_condition.remove(&lost);
                    shared.stop.cancel();
                    shared.connection.close(&shared.shutdown).await;
                    info!(
                        endpoint = %name,
                        lost_total = shared.lost.load(Ordering::Relaxed),
                        "connection closed"
                    );
                    Ok(())
                }
            }
        });

        self.bus.condition::<ApplicationStart>().add(start);
        lost_condition.add(lost);
        self.bus.condition::<ApplicationStop>().add(stop);

        info!(behavior = %self.name, "keeping '{endpoint}' connected");
    }
}
