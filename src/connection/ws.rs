//! # WebSocket transport (tokio-tungstenite).
//!
//! [`WsTransport`] adapts a client `WebSocketStream` to [`Transport`]. The
//! stream is split so a pending `receive` never blocks `send`.
//!
//! Ping/pong frames are answered by tungstenite and never surface as frames.
//! `wss://` addresses need the `tls` cargo feature (on by default).

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::trace;
use url::Url;

use crate::connection::{Frame, FrameKind, Transport, TransportFactory, TransportState};
use crate::error::TransportError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Client-side WebSocket transport. Single use: create a new one per connect.
pub struct WsTransport {
    state: Mutex<TransportState>,
    sink: tokio::sync::Mutex<Option<SplitSink<WsStream, Message>>>,
    stream: tokio::sync::Mutex<Option<SplitStream<WsStream>>>,
    aborted: CancellationToken,
}

impl WsTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TransportState::Unopened),
            sink: tokio::sync::Mutex::new(None),
            stream: tokio::sync::Mutex::new(None),
            aborted: CancellationToken::new(),
        }
    }

    fn set_state(&self, to: TransportState) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        // Aborted is sticky.
        if *state != TransportState::Aborted {
            *state = to;
        }
    }

    /// Records the failure and maps it.
    fn failed(&self, err: WsError) -> TransportError {
        let mapped = map_ws_error(err);
        self.set_state(match mapped {
            TransportError::Closed => TransportState::Closed,
            _ => TransportState::Aborted,
        });
        mapped
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        match self.state() {
            TransportState::Open => Ok(()),
            _ => Err(TransportError::Closed),
        }
    }
}

impl Default for WsTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for WsTransport {
    fn state(&self) -> TransportState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn connect(&self, address: &Url) -> Result<(), TransportError> {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state != TransportState::Unopened {
                return Err(TransportError::Invalid {
                    error: format!("connect on a {} transport", state.as_str()),
                });
            }
            *state = TransportState::Connecting;
        }

        #[cfg(feature = "tls")]
        install_crypto_provider();

        let res = tokio::select! {
            res = tokio_tungstenite::connect_async(address.as_str()) => res,
            _ = self.aborted.cancelled() => return Err(TransportError::Closed),
        };
        let (ws, _response) = res.map_err(|e| self.failed(e))?;

        let (sink, stream) = ws.split();
        *self.sink.lock().await = Some(sink);
        *self.stream.lock().await = Some(stream);

        self.set_state(TransportState::Open);
        if self.state() == TransportState::Aborted {
            return Err(TransportError::Closed);
        }
        trace!(address = %address, "websocket open");
        Ok(())
    }

    async fn send(&self, text: &str) -> Result<(), TransportError> {
        self.ensure_open()?;
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(TransportError::Closed)?;

        tokio::select! {
            res = sink.send(Message::Text(text.to_owned())) => res.map_err(|e| self.failed(e)),
            _ = self.aborted.cancelled() => Err(TransportError::Closed),
        }
    }

    async fn receive(&self) -> Result<Frame, TransportError> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(TransportError::Closed)?;

        loop {
            let next = tokio::select! {
                next = stream.next() => next,
                _ = self.aborted.cancelled() => return Err(TransportError::Closed),
            };

            match next {
                Some(Ok(Message::Text(text))) => return Ok(Frame::text(text)),
                Some(Ok(Message::Binary(payload))) => {
                    return Ok(Frame {
                        kind: FrameKind::Binary,
                        payload,
                        end_of_message: true,
                    });
                }
                Some(Ok(Message::Close(_))) => {
                    let next = match self.state() {
                        TransportState::CloseSent => TransportState::Closed,
                        _ => TransportState::CloseReceived,
                    };
                    self.set_state(next);
                    return Ok(Frame::close());
                }
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(self.failed(e)),
                None => {
                    self.set_state(TransportState::Closed);
                    return Err(TransportError::Closed);
                }
            }
        }
    }

    async fn close_output(&self) -> Result<(), TransportError> {
        match self.state() {
            TransportState::Open => {}
            TransportState::Connecting => {
                self.abort();
                return Ok(());
            }
            _ => return Ok(()),
        }

        let mut guard = self.sink.lock().await;
        let Some(sink) = guard.as_mut() else {
            return Ok(());
        };
        self.set_state(TransportState::CloseSent);
        sink.close().await.map_err(|e| self.failed(e))
    }

    fn abort(&self) {
        self.set_state(TransportState::Aborted);
        self.aborted.cancel();
    }
}

/// Creates a fresh [`WsTransport`] per call.
#[derive(Clone, Copy, Debug, Default)]
pub struct WsTransportFactory;

impl TransportFactory for WsTransportFactory {
    fn create(&self) -> Arc<dyn Transport> {
        Arc::new(WsTransport::new())
    }
}

fn map_ws_error(err: WsError) -> TransportError {
    match err {
        WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
        WsError::Io(e) => TransportError::Io {
            error: e.to_string(),
        },
        WsError::Protocol(e) => TransportError::Protocol {
            error: e.to_string(),
        },
        WsError::Http(resp) => TransportError::Protocol {
            error: format!("handshake rejected with HTTP {}", resp.status()),
        },
        e @ (WsError::Url(_) | WsError::HttpFormat(_) | WsError::Capacity(_)) => {
            TransportError::Invalid {
                error: e.to_string(),
            }
        }
        other => TransportError::Io {
            error: other.to_string(),
        },
    }
}

/// Installs the ring provider as the process default unless one is set.
#[cfg(feature = "tls")]
fn install_crypto_provider() {
    static INSTALL: std::sync::Once = std::sync::Once::new();
    INSTALL.call_once(|| {
        // Err means another provider is already the default.
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
