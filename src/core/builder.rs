use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::behaviors::{Behavior, ReconnectBehavior};
use crate::connection::{Connection, Endpoint, TransportFactory};
use crate::core::{Host, HostConfig, MessageReceiver};
use crate::events::Bus;
use crate::policies::RetryPolicy;

/// Builder for a [`Host`].
///
/// Owns the [`Bus`] every registered component is wired to.
pub struct HostBuilder {
    cfg: HostConfig,
    bus: Bus,
    policy: Arc<dyn RetryPolicy>,
    connections: Vec<Arc<Connection>>,
    behaviors: Vec<Arc<dyn Behavior>>,
    receivers: Vec<Arc<dyn MessageReceiver>>,
}

impl HostBuilder {
    pub fn new(cfg: HostConfig) -> Self {
        let bus = Bus::new();
        let policy: Arc<dyn RetryPolicy> = Arc::new(cfg.retry_policy(bus.shutdown_token()));
        Self {
            cfg,
            bus,
            policy,
            connections: Vec::new(),
            behaviors: Vec::new(),
            receivers: Vec::new(),
        }
    }

    /// Bus shared by the host and everything registered on it.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Retry policy built from [`HostConfig::retry`], cancelled at shutdown.
    pub fn retry_policy(&self) -> Arc<dyn RetryPolicy> {
        Arc::clone(&self.policy)
    }

    /// Replaces the retry policy used by reconnects and receive loops.
    ///
    /// Receive loops pick the policy up at [`build`](Self::build). A
    /// [`ReconnectBehavior`] takes it when registered, so call this before
    /// [`keep_connected`](Self::keep_connected).
    pub fn with_retry_policy(&mut self, policy: Arc<dyn RetryPolicy>) -> &mut Self {
        self.policy = policy;
        self
    }

    /// Creates a connection on the host bus; it is disposed when the host stops.
    pub fn connection(&mut self, endpoint: Endpoint, factory: Arc<dyn TransportFactory>) -> Arc<Connection> {
        let conn = Arc::new(Connection::new(endpoint, factory, &self.bus));
        self.connections.push(Arc::clone(&conn));
        conn
    }

    /// Registers a [`ReconnectBehavior`] for `connection`.
    pub fn keep_connected(&mut self, connection: &Arc<Connection>) -> Arc<ReconnectBehavior> {
        let behavior = Arc::new(ReconnectBehavior::new(
            Arc::clone(connection),
            Arc::clone(&self.policy),
            &self.bus,
        ));
        self.behaviors.push(behavior.clone());
        behavior
    }

    pub fn behavior(&mut self, behavior: Arc<dyn Behavior>) -> &mut Self {
        self.behaviors.push(behavior);
        self
    }

    /// Registers a receiver; the host runs one receive loop per receiver.
    pub fn receiver(&mut self, receiver: Arc<dyn MessageReceiver>) -> &mut Self {
        self.receivers.push(receiver);
        self
    }

    pub fn build(self) -> Host {
        Host {
            cfg: self.cfg,
            bus: self.bus,
            policy: self.policy,
            connections: self.connections,
            behaviors: self.behaviors,
            receivers: self.receivers,
            stop: CancellationToken::new(),
        }
    }
}
