//! # Event kinds.
//!
//! An event kind is a zero-sized marker type implementing [`Event`]. The marker
//! names the slot on the [`Bus`](crate::Bus); its `Args` type is what every
//! listener receives when the event is triggered.
//!
//! ## Built-in kinds
//! | Kind                 | Scope          | Args        | Triggered by                  |
//! |----------------------|----------------|-------------|-------------------------------|
//! | [`ApplicationStart`] | global         | `()`        | [`Host`](crate::Host) (detached) |
//! | [`ApplicationStop`]  | global         | `()`        | [`Host`](crate::Host) (joined)   |
//! | [`Connected`]        | endpoint name  | [`Endpoint`] | [`Connection::connect`](crate::Connection::connect) (joined) |
//! | [`ConnectionLost`]   | endpoint name  | [`Endpoint`] | lost transition (detached)    |
//!
//! ## Example
//! ```rust
//! use streamkeeper::Event;
//!
//! struct CacheFlushed;
//!
//! impl Event for CacheFlushed {
//!     type Args = u64;
//!     const NAME: &'static str = "cache_flushed";
//! }
//!
//! assert_eq!(CacheFlushed::NAME, "cache_flushed");
//! ```

use crate::connection::Endpoint;

/// Marker trait for an event kind.
pub trait Event: Send + Sync + 'static {
    /// Value passed to every listener; cloned once per listener.
    type Args: Clone + Send + Sync + 'static;

    /// Stable name used in logs and errors.
    const NAME: &'static str;
}

/// Process start, fired once by the host after behaviors are enabled.
pub struct ApplicationStart;

impl Event for ApplicationStart {
    type Args = ();
    const NAME: &'static str = "application_start";
}

/// Process stop, fired once by the host before the shutdown token is cancelled.
pub struct ApplicationStop;

impl Event for ApplicationStop {
    type Args = ();
    const NAME: &'static str = "application_stop";
}

/// A connection finished its handshake and the readiness gate is fulfilled.
pub struct Connected;

impl Event for Connected {
    type Args = Endpoint;
    const NAME: &'static str = "connected";
}

/// A connection observed its transport in a closed or aborted state.
pub struct ConnectionLost;

impl Event for ConnectionLost {
    type Args = Endpoint;
    const NAME: &'static str = "connection_lost";
}
