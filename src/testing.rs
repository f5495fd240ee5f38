//! Scripted in-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::connection::{Frame, FrameKind, Transport, TransportFactory, TransportState};
use crate::error::TransportError;

/// How the next created transport answers `connect`.
#[derive(Clone, Debug)]
pub(crate) enum Outcome {
    Open,
    Fail(TransportError),
    /// Never completes (until aborted).
    Hang,
}

pub(crate) struct MockTransport {
    state: Mutex<TransportState>,
    outcome: Outcome,
    echo: bool,
    tx: mpsc::UnboundedSender<Frame>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Frame>>,
    sent: Mutex<Vec<String>>,
    aborted: CancellationToken,
}

impl MockTransport {
    fn new(outcome: Outcome, echo: bool) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(TransportState::Unopened),
            outcome,
            echo,
            tx,
            rx: tokio::sync::Mutex::new(rx),
            sent: Mutex::new(Vec::new()),
            aborted: CancellationToken::new(),
        }
    }

    fn set(&self, s: TransportState) {
        *self.state.lock().unwrap() = s;
    }

    /// Queues a frame for `receive`.
    pub(crate) fn push(&self, frame: Frame) {
        let _ = self.tx.send(frame);
    }

    pub(crate) fn push_text(&self, s: &str) {
        self.push(Frame::text(s));
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Simulates an abrupt drop of the underlying socket.
    pub(crate) fn kill(&self) {
        self.abort();
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn state(&self) -> TransportState {
        *self.state.lock().unwrap()
    }

    async fn connect(&self, _address: &Url) -> Result<(), TransportError> {
        self.set(TransportState::Connecting);
        match &self.outcome {
            Outcome::Open => {
                self.set(TransportState::Open);
                Ok(())
            }
            Outcome::Fail(err) => {
                self.set(TransportState::Aborted);
                Err(err.clone())
            }
            Outcome::Hang => {
                self.aborted.cancelled().await;
                Err(TransportError::Closed)
            }
        }
    }

    async fn send(&self, text: &str) -> Result<(), TransportError> {
        if self.state() != TransportState::Open {
            return Err(TransportError::Closed);
        }
        self.sent.lock().unwrap().push(text.to_owned());
        if self.echo {
            self.push_text(text);
        }
        Ok(())
    }

    async fn receive(&self) -> Result<Frame, TransportError> {
        let mut rx = self.rx.lock().await;
        let frame = tokio::select! {
            f = rx.recv() => f,
            _ = self.aborted.cancelled() => None,
        };
        match frame {
            Some(f) if f.kind == FrameKind::Close => {
                self.set(TransportState::CloseReceived);
                Ok(f)
            }
            Some(f) => Ok(f),
            None => {
                self.set(TransportState::Aborted);
                Err(TransportError::Io {
                    error: "connection reset".into(),
                })
            }
        }
    }

    async fn close_output(&self) -> Result<(), TransportError> {
        if self.state() == TransportState::Open {
            self.set(TransportState::CloseSent);
        }
        Ok(())
    }

    fn abort(&self) {
        self.set(TransportState::Aborted);
        self.aborted.cancel();
    }
}

/// Hands out [`MockTransport`]s following a script; `Open` once the script runs out.
#[derive(Default)]
pub(crate) struct MockFactory {
    script: Mutex<VecDeque<Outcome>>,
    created: Mutex<Vec<Arc<MockTransport>>>,
    echo: bool,
}

impl MockFactory {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn echo() -> Arc<Self> {
        Arc::new(Self {
            echo: true,
            ..Self::default()
        })
    }

    pub(crate) fn script(&self, outcomes: impl IntoIterator<Item = Outcome>) {
        self.script.lock().unwrap().extend(outcomes);
    }

    pub(crate) fn created(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub(crate) fn last(&self) -> Arc<MockTransport> {
        self.created.lock().unwrap().last().cloned().unwrap()
    }
}

impl TransportFactory for MockFactory {
    fn create(&self) -> Arc<dyn Transport> {
        let outcome = self.script.lock().unwrap().pop_front().unwrap_or(Outcome::Open);
        let t = Arc::new(MockTransport::new(outcome, self.echo));
        self.created.lock().unwrap().push(Arc::clone(&t));
        t
    }
}

pub(crate) fn refused() -> TransportError {
    TransportError::Io {
        error: "connection refused".into(),
    }
}
