//! # Host: drives the process lifecycle.
//!
//! The [`Host`] owns the bus and everything registered on it. [`Host::run`]
//! walks the lifecycle once:
//!
//! ```text
//! run()
//!   ├─► Behavior::enable()                         (each behavior, once)
//!   ├─► ApplicationStart.invoke_detached()
//!   ├─► spawn run_receiver() per MessageReceiver
//!   │
//!   ├─► wait: OS termination signal | Host::shutdown()
//!   │
//!   ├─► ApplicationStop.invoke()                   (joined, bounded by grace)
//!   ├─► bus shutdown token.cancel()                → retries, waits, detached dispatch
//!   ├─► wait receive loops                         (bounded by grace)
//!   │      └─ timeout → RuntimeError::GraceExceeded { stuck }
//!   └─► Connection::dispose()                      (each connection)
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use streamkeeper::{Endpoint, Host, HostConfig, LogReceiver, WsTransportFactory};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut builder = Host::builder(HostConfig::default());
//!
//!     let conn = builder.connection(
//!         Endpoint::parse("ticker", "ws://127.0.0.1:9001/stream")?,
//!         Arc::new(WsTransportFactory),
//!     );
//!     builder.keep_connected(&conn);
//!     builder.receiver(Arc::new(LogReceiver::new(conn)));
//!
//!     builder.build().run().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::behaviors::Behavior;
use crate::connection::Connection;
use crate::core::{HostBuilder, HostConfig, MessageReceiver, run_receiver, shutdown};
use crate::error::RuntimeError;
use crate::events::{ApplicationStart, ApplicationStop, Bus};
use crate::policies::RetryPolicy;

/// Runs behaviors and receive loops between `ApplicationStart` and `ApplicationStop`.
pub struct Host {
    pub(crate) cfg: HostConfig,
    pub(crate) bus: Bus,
    pub(crate) policy: Arc<dyn RetryPolicy>,
    pub(crate) connections: Vec<Arc<Connection>>,
    pub(crate) behaviors: Vec<Arc<dyn Behavior>>,
    pub(crate) receivers: Vec<Arc<dyn MessageReceiver>>,
    pub(crate) stop: CancellationToken,
}

impl Host {
    pub fn builder(cfg: HostConfig) -> HostBuilder {
        HostBuilder::new(cfg)
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn config(&self) -> &HostConfig {
        &self.cfg
    }

    /// Requests shutdown; [`Host::run`] proceeds as if a signal arrived.
    pub fn shutdown(&self) {
        self.stop.cancel();
    }

    /// Runs until a termination signal or [`Host::shutdown`], then stops gracefully.
    ///
    /// # Errors
    /// - [`RuntimeError::GraceExceeded`] if receive loops outlive the grace period.
    /// - [`RuntimeError::Signal`] if signal handlers could not be registered
    ///   (the host still stops gracefully first).
    pub async fn run(&self) -> Result<(), RuntimeError> {
        info!(
            behaviors = self.behaviors.len(),
            receivers = self.receivers.len(),
            "host starting"
        );

        self.enable_behaviors();
        self.bus
            .trigger::<ApplicationStart>()
            .invoke_detached("application start", ());
        let loops = self.spawn_receivers();

        let signal = shutdown::wait_for_shutdown(&self.stop).await;
        match &signal {
            Ok(reason) => info!(reason = ?reason, "host stopping"),
            Err(err) => error!(error = %err, "signal registration failed, stopping"),
        }

        self.stop_application().await;
        self.bus.shutdown_token().cancel();
        let res = self.wait_receivers(loops).await;

        for conn in &self.connections {
            conn.dispose();
        }
        info!("host stopped");

        signal?;
        res
    }

    fn enable_behaviors(&self) {
        for behavior in &self.behaviors {
            debug!(behavior = %behavior.name(), "enabling");
            behavior.enable();
        }
    }

    fn spawn_receivers(&self) -> Vec<(String, JoinHandle<()>)> {
        self.receivers
            .iter()
            .map(|r| {
                let handle = tokio::spawn(run_receiver(
                    Arc::clone(r),
                    Arc::clone(&self.policy),
                    self.cfg.receive_pause,
                    self.bus.shutdown_token(),
                ));
                (r.name().to_owned(), handle)
            })
            .collect()
    }

    async fn stop_application(&self) {
        let stop = self.bus.trigger::<ApplicationStop>();
        match tokio::time::timeout(self.cfg.grace, stop.invoke("application stop", ())).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(error = %err, "application stop listeners failed"),
            Err(_) => warn!(grace = ?self.cfg.grace, "application stop listeners exceeded grace"),
        }
    }

    /// Waits for receive loops within the grace period; aborts the stragglers.
    async fn wait_receivers(&self, loops: Vec<(String, JoinHandle<()>)>) -> Result<(), RuntimeError> {
        let grace = self.cfg.grace;
        let deadline = tokio::time::Instant::now() + grace;

        let mut stuck = Vec::new();
        for (name, mut handle) in loops {
            match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!(receiver = %name, error = %err, "receive loop panicked"),
                Err(_) => {
                    handle.abort();
                    stuck.push(name);
                }
            }
        }

        if stuck.is_empty() {
            Ok(())
        } else {
            warn!(grace = ?grace, stuck = ?stuck, "receive loops exceeded grace");
            Err(RuntimeError::GraceExceeded { grace, stuck })
        }
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("cfg", &self.cfg)
            .field("connections", &self.connections.len())
            .field("behaviors", &self.behaviors.len())
            .field("receivers", &self.receivers.len())
            .finish()
    }
}
