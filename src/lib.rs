//! # streamkeeper
//!
//! **Streamkeeper** keeps long-lived streaming connections (WebSocket by
//! default) open and lets the rest of a program react to their lifecycle
//! through a typed event bus, without components knowing about each other.
//!
//! Two pieces form a self-healing loop: the [`Connection`] state machine
//! publishes `Connected` / `ConnectionLost`, and the [`ReconnectBehavior`]
//! subscribes to them and calls back into the connection.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                 ┌───────────────────────────────────────────────┐
//!                 │ Host                                          │
//!                 │  - enables behaviors                          │
//!                 │  - fires ApplicationStart / ApplicationStop   │
//!                 │  - runs one receive loop per MessageReceiver  │
//!                 └──────┬─────────────────────────────┬──────────┘
//!                        ▼                             ▼
//! ┌──────────────────────────────────────┐  ┌──────────────────────┐
//! │ Bus (typed registry of slots)        │  │ run_receiver()       │
//! │  (event kind, scope) ─► Slot<E>      │  │  RetryPolicy::run(   │
//! │  Condition<E>: add / remove          │  │   receive_message)   │
//! │  Trigger<E>:   invoke / detached     │  └──────────┬───────────┘
//! └───────┬───────────────────▲──────────┘             │
//!         │ ApplicationStart  │ Connected              │ receive()
//!         │ ConnectionLost    │ ConnectionLost         ▼
//!         ▼ ApplicationStop   │             ┌──────────────────────┐
//! ┌──────────────────────┐    └─────────────┤ Connection           │
//! │ ReconnectBehavior    │                  │  transport (fresh    │
//! │  open() = RetryPolicy├─── connect() ───►│    per connect)      │
//! │   ::run(connect)     │                  │  readiness Gate      │
//! └──────────────────────┘                  │  reconnect_count     │
//!                                           └──────────┬───────────┘
//!                                                      ▼
//!                                           Transport (WsTransport)
//! ```
//!
//! ### Lost connection
//! ```text
//! receive()/send()/close()
//!   └─► observe transport state
//!         └─ Open → Aborted | Closed | CloseReceived
//!               ├─► cancel gate, install fresh pending gate
//!               ├─► reconnect_count += 1
//!               └─► ConnectionLost.invoke_detached()
//!                         └─► ReconnectBehavior: RetryPolicy::run(connect)
//!                                  └─► gate fulfilled ─► waiting callers proceed
//! ```
//!
//! ## Features
//! | Area            | Description                                              | Key types / traits                                 |
//! |-----------------|----------------------------------------------------------|----------------------------------------------------|
//! | **Events**      | Typed listener slots with joined and detached dispatch.  | [`Bus`], [`Trigger`], [`Condition`], [`Filter`]    |
//! | **Connections** | Readiness-gated connection over a pluggable transport.   | [`Connection`], [`Transport`], [`WsTransport`]     |
//! | **Behaviors**   | Business logic wired to lifecycle events.                | [`Behavior`], [`ReconnectBehavior`]                |
//! | **Policies**    | Retry with backoff and jitter.                           | [`RetryPolicy`], [`BackoffRetry`], [`BackoffPolicy`] |
//! | **Hosting**     | Lifecycle, receive loops, graceful shutdown.             | [`Host`], [`MessageReceiver`], [`HostConfig`]      |
//! | **Errors**      | Typed errors with stable log labels.                     | [`ConnectionError`], [`RuntimeError`]              |
//!
//! ## Optional features
//! - `tls` (default): enables `wss://` endpoints for [`WsTransport`] through rustls.
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use streamkeeper::{Endpoint, Host, HostConfig, Listener, LogReceiver, Connected, WsTransportFactory};
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
//!     builder.receiver(Arc::new(LogReceiver::new(Arc::clone(&conn))));
//!
//!     // React to the connection coming up.
//!     builder.bus().condition_for::<Connected>("ticker").add(Listener::new("hello", |ep: Endpoint| async move {
//!         println!("connected to {ep}");
//!         Ok(())
//!     }));
//!
//!     builder.build().run().await?;
//!     Ok(())
//! }
//! ```
mod behaviors;
mod connection;
mod core;
mod error;
mod events;
mod policies;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use behaviors::{Behavior, ReconnectBehavior};
pub use connection::{
    Connection, Endpoint, Frame, FrameKind, Gate, Readiness, Received, Transport, TransportFactory,
    TransportState, WsTransport, WsTransportFactory,
};
pub use core::{Host, HostBuilder, HostConfig, LogReceiver, MessageReceiver, run_receiver};
pub use error::{ConnectionError, ListenerError, RuntimeError, TransportError, TriggerError};
pub use events::{
    ApplicationStart, ApplicationStop, Bus, Condition, Connected, ConnectionLost, Dedup, Event,
    Filter, GLOBAL, Identity, Listener, ListenerFuture, Listeners, Slot, Trigger,
};
pub use policies::{Attempt, BackoffPolicy, BackoffRetry, JitterPolicy, RetryOn, RetryPolicy};
