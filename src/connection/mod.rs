//! # Connections.
//!
//! - [`Endpoint`] name + address of a remote streaming endpoint.
//! - [`TransportState`] observed state of a transport.
//! - [`Transport`] / [`TransportFactory`] the duplex channel seam; [`WsTransport`] implements it over WebSocket.
//! - [`Connection`] per-endpoint state machine gating data operations behind readiness.

mod connection;
mod endpoint;
mod gate;
mod state;
mod transport;
mod ws;

pub use connection::{Connection, Received};
pub use endpoint::Endpoint;
pub use gate::{Gate, Readiness};
pub use state::TransportState;
pub use transport::{Frame, FrameKind, Transport, TransportFactory};
pub use ws::{WsTransport, WsTransportFactory};
