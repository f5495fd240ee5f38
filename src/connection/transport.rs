//! # Transport seam.
//!
//! A [`Transport`] is a message-oriented duplex channel with an observable
//! [`TransportState`]. A [`TransportFactory`] produces fresh, unopened
//! instances; a [`Connection`](crate::Connection) discards its transport and
//! asks for a new one on every reconnect.
//!
//! Implementations must be cancel-safe at `.await` points: the connection
//! drops in-flight `connect`/`receive` futures when the caller's token fires.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::connection::TransportState;
use crate::error::TransportError;

/// Kind of a received frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    Text,
    Binary,
    /// Peer started the closing handshake.
    Close,
}

/// One received frame. A logical message is one or more frames, the last
/// one with `end_of_message` set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Vec<u8>,
    pub end_of_message: bool,
}

impl Frame {
    /// Complete text message in a single frame.
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Text,
            payload: s.into().into_bytes(),
            end_of_message: true,
        }
    }

    pub fn close() -> Self {
        Self {
            kind: FrameKind::Close,
            payload: Vec::new(),
            end_of_message: true,
        }
    }
}

/// Message-oriented duplex transport.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Live state; cheap, never blocks on I/O.
    fn state(&self) -> TransportState;

    /// Performs the opening handshake. Valid only on an `Unopened` transport.
    async fn connect(&self, address: &Url) -> Result<(), TransportError>;

    /// Writes one complete text message.
    async fn send(&self, text: &str) -> Result<(), TransportError>;

    /// Reads the next frame.
    async fn receive(&self) -> Result<Frame, TransportError>;

    /// Starts the graceful closing handshake.
    async fn close_output(&self) -> Result<(), TransportError>;

    /// Tears the transport down immediately; state becomes `Aborted`.
    fn abort(&self);
}

/// Produces fresh, unopened transports.
pub trait TransportFactory: Send + Sync + 'static {
    fn create(&self) -> Arc<dyn Transport>;
}

impl<F> TransportFactory for F
where
    F: Fn() -> Arc<dyn Transport> + Send + Sync + 'static,
{
    fn create(&self) -> Arc<dyn Transport> {
        self()
    }
}
