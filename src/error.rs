//! Error types used by connections, the event bus and the host runtime.
//!
//! - [`TransportError`] failures reported by a [`Transport`](crate::Transport).
//! - [`ConnectionError`] failures of [`Connection`](crate::Connection) operations.
//! - [`ListenerError`] failures of a single event listener.
//! - [`TriggerError`] aggregate failure of a joined event invocation.
//! - [`RuntimeError`] failures of the [`Host`](crate::Host) itself.
//!
//! Every enum provides `as_label` (stable snake_case label for logs) and the
//! classification helpers the retry and dispatch paths rely on.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// # Errors produced by a transport handle.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// Socket-level failure (refused, reset, broken pipe, TLS).
    #[error("i/o failure: {error}")]
    Io {
        /// The underlying error message.
        error: String,
    },

    /// The peer violated the wire protocol or rejected the handshake.
    #[error("protocol violation: {error}")]
    Protocol {
        /// The underlying error message.
        error: String,
    },

    /// The transport is closed or was aborted.
    #[error("transport closed")]
    Closed,

    /// The request can never succeed as issued (bad address, unsupported scheme, oversize payload).
    #[error("invalid request: {error}")]
    Invalid {
        /// The underlying error message.
        error: String,
    },
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Io { .. } => "transport_io",
            TransportError::Protocol { .. } => "transport_protocol",
            TransportError::Closed => "transport_closed",
            TransportError::Invalid { .. } => "transport_invalid",
        }
    }

    /// True for refused/reset/protocol failures that a later attempt may not hit.
    pub fn is_transport_level(&self) -> bool {
        !matches!(self, TransportError::Invalid { .. })
    }
}

/// # Errors produced by connection operations.
///
/// Retryable: [`ConnectionError::Transport`] and [`ConnectionError::Interrupted`].
/// [`ConnectionError::Canceled`] is a clean-stop signal, never a failure.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ConnectionError {
    /// Transport-level failure; the attempt may be repeated.
    #[error("transport failure on '{endpoint}': {source}")]
    Transport {
        /// Endpoint name.
        endpoint: Arc<str>,
        /// What the transport reported.
        #[source]
        source: TransportError,
    },

    /// Failure outside the retryable class.
    #[error("unexpected failure on '{endpoint}': {error}")]
    Unexpected {
        /// Endpoint name.
        endpoint: Arc<str>,
        /// The underlying error message.
        error: String,
    },

    /// The readiness gate this call waited on was canceled before it became ready.
    #[error("readiness wait on '{endpoint}' interrupted")]
    Interrupted {
        /// Endpoint name.
        endpoint: Arc<str>,
    },

    /// The last connect attempt recorded a failure on the readiness gate.
    #[error("'{endpoint}' unavailable: {reason}")]
    Unavailable {
        /// Endpoint name.
        endpoint: Arc<str>,
        /// Failure recorded on the gate.
        reason: Arc<str>,
    },

    /// The connection was disposed.
    #[error("connection to '{endpoint}' disposed")]
    Disposed {
        /// Endpoint name.
        endpoint: Arc<str>,
    },

    /// The caller's cancellation token fired.
    #[error("operation canceled")]
    Canceled,
}

impl ConnectionError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use streamkeeper::ConnectionError;
    ///
    /// assert_eq!(ConnectionError::Canceled.as_label(), "connection_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConnectionError::Transport { .. } => "connection_transport",
            ConnectionError::Unexpected { .. } => "connection_unexpected",
            ConnectionError::Interrupted { .. } => "connection_interrupted",
            ConnectionError::Unavailable { .. } => "connection_unavailable",
            ConnectionError::Disposed { .. } => "connection_disposed",
            ConnectionError::Canceled => "connection_canceled",
        }
    }

    /// Indicates whether repeating the operation may succeed.
    ///
    /// # Example
    /// ```
    /// use streamkeeper::ConnectionError;
    ///
    /// let interrupted = ConnectionError::Interrupted { endpoint: "demo".into() };
    /// assert!(interrupted.is_retryable());
    /// assert!(!ConnectionError::Canceled.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ConnectionError::Transport { .. } | ConnectionError::Interrupted { .. }
        )
    }

    /// True when the caller's own cancellation ended the operation.
    pub fn is_canceled(&self) -> bool {
        matches!(self, ConnectionError::Canceled)
    }
}

/// # Errors returned by one event listener.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ListenerError {
    /// The listener failed.
    #[error("listener failed: {error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// The listener observed cancellation and stopped.
    #[error("listener canceled")]
    Canceled,

    /// The listener panicked.
    #[error("listener panicked: {info}")]
    Panicked {
        /// Panic payload, if printable.
        info: String,
    },
}

impl ListenerError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ListenerError::Failed { .. } => "listener_failed",
            ListenerError::Canceled => "listener_canceled",
            ListenerError::Panicked { .. } => "listener_panicked",
        }
    }

    /// Builds a [`ListenerError::Failed`] from anything printable.
    pub fn failed(error: impl std::fmt::Display) -> Self {
        ListenerError::Failed {
            error: error.to_string(),
        }
    }
}

impl From<ConnectionError> for ListenerError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::Canceled => ListenerError::Canceled,
            other => ListenerError::failed(other),
        }
    }
}

/// # Aggregate failure of a joined trigger invocation.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum TriggerError {
    /// One or more listeners failed; every listener still ran to completion.
    #[error("{} of {total} listeners of '{event}' failed ({label})", .failures.len())]
    Listeners {
        /// Event kind name.
        event: &'static str,
        /// Invocation label.
        label: String,
        /// Number of listeners invoked.
        total: usize,
        /// One entry per failed listener.
        failures: Vec<ListenerError>,
    },
}

impl TriggerError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TriggerError::Listeners { .. } => "trigger_listeners_failed",
        }
    }

    /// Failures collected from individual listeners.
    pub fn failures(&self) -> &[ListenerError] {
        match self {
            TriggerError::Listeners { failures, .. } => failures,
        }
    }

    /// True when every failure is a cancellation (expected during shutdown).
    pub fn is_canceled(&self) -> bool {
        self.failures()
            .iter()
            .all(|f| matches!(f, ListenerError::Canceled))
    }
}

/// # Errors produced by the host runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some receive loops were still running.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of receivers that did not stop in time.
        stuck: Vec<String>,
    },

    /// Registering the OS signal handlers failed.
    #[error("signal registration failed: {0}")]
    Signal(#[from] std::io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use streamkeeper::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}
