//! # Connection state machine.
//!
//! A [`Connection`] owns the transport for one [`Endpoint`], a readiness
//! [`Gate`] and a reconnect counter. Data operations wait on the gate, so
//! nothing touches a transport before a successful [`Connection::connect`]
//! fulfilled the current gate.
//!
//! ```text
//!           connect()                       observe (lazy, on receive/send/close)
//! Unopened ─────────► Connecting ──ok──► Open ───────────────► CloseReceived | Closed | Aborted
//!     ▲                   │ fail                                        │
//!     │                   └─► (caller retries)                          ├─ cancel gate, install fresh gate
//!     └──────────── new transport on next connect() ◄───────────────────┴─ ConnectionLost (detached)
//! ```
//!
//! ## Rules
//! - Exactly one gate is live; a settled gate is replaced, never reused.
//! - `Open` implies the live gate is fulfilled.
//! - A lost transition fires `ConnectionLost` exactly once and bumps
//!   `reconnect_count` by one.
//! - While a handshake runs the cached state belongs to `connect`; a failed
//!   handshake never counts as a lost connection.
//! - A caller's token only ends that caller's wait; it never settles the gate.
//! - `send`, `close` and `dispose` never fail.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::{Endpoint, FrameKind, Gate, Readiness, Transport, TransportFactory, TransportState};
use crate::error::{ConnectionError, TransportError};
use crate::events::{Bus, Connected, ConnectionLost, Trigger};

/// Result of [`Connection::receive`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Received {
    /// One complete text message.
    Text(String),
    /// The peer started the closing handshake.
    Closed,
}

struct Inner {
    transport: Option<Arc<dyn Transport>>,
    state: TransportState,
    gate: Arc<Gate>,
    disposed: bool,
}

impl Inner {
    /// Replaces the live gate with a fresh pending one.
    fn renew_gate(&mut self) {
        self.gate = Arc::new(Gate::new());
    }
}

enum Handshake {
    Done(Result<(), TransportError>),
    Canceled,
}

/// Self-healing connection to one endpoint.
///
/// Publishes [`Connected`] and [`ConnectionLost`] scoped by the endpoint name.
///
/// ## Example
/// ```rust,no_run
/// use std::sync::Arc;
/// use tokio_util::sync::CancellationToken;
/// use streamkeeper::{Bus, Connection, Endpoint, Received, WsTransportFactory};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let bus = Bus::new();
/// let ep = Endpoint::parse("echo", "ws://127.0.0.1:9001/")?;
/// let conn = Connection::new(ep, Arc::new(WsTransportFactory), &bus);
///
/// let token = CancellationToken::new();
/// conn.connect(&token).await?;
/// conn.send("ping", &token).await;
/// if let Received::Text(reply) = conn.receive(&token).await? {
///     println!("{reply}");
/// }
/// conn.close(&token).await;
/// # Ok(())
/// # }
/// ```
pub struct Connection {
    endpoint: Endpoint,
    factory: Arc<dyn TransportFactory>,
    inner: Mutex<Inner>,
    reconnects: AtomicU64,
    connected: Trigger<Connected>,
    lost: Trigger<ConnectionLost>,
}

impl Connection {
    pub fn new(endpoint: Endpoint, factory: Arc<dyn TransportFactory>, bus: &Bus) -> Self {
        let connected = bus.trigger_for::<Connected>(endpoint.name());
        let lost = bus.trigger_for::<ConnectionLost>(endpoint.name());
        Self {
            endpoint,
            factory,
            inner: Mutex::new(Inner {
                transport: None,
                state: TransportState::Unopened,
                gate: Arc::new(Gate::new()),
                disposed: false,
            }),
            reconnects: AtomicU64::new(0),
            connected,
            lost,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Last observed transport state.
    pub fn state(&self) -> TransportState {
        self.lock().state
    }

    /// Number of lost transitions observed so far.
    pub fn reconnect_count(&self) -> u64 {
        self.reconnects.load(Ordering::Relaxed)
    }

    /// True when the live gate is fulfilled and the transport is open.
    pub fn is_connected(&self) -> bool {
        let inner = self.lock();
        inner.gate.is_ready()
            && inner
                .transport
                .as_ref()
                .is_some_and(|t| t.state() == TransportState::Open)
    }

    /// Opens a fresh transport and performs the handshake.
    ///
    /// On success the gate is fulfilled and [`Connected`] is fired joined.
    ///
    /// # Errors
    /// - [`ConnectionError::Canceled`] if `token` is already cancelled (no
    ///   transport is created) or fires during the handshake (the gate is
    ///   canceled and replaced).
    /// - [`ConnectionError::Transport`] for transport-level failures; the gate
    ///   is left pending for the caller's retry.
    /// - [`ConnectionError::Unexpected`] otherwise; the failure is recorded on
    ///   the gate so waiters observe it.
    /// - [`ConnectionError::Disposed`] after [`Connection::dispose`].
    pub async fn connect(&self, token: &CancellationToken) -> Result<(), ConnectionError> {
        if token.is_cancelled() {
            return Err(ConnectionError::Canceled);
        }
        let (transport, gate) = {
            let mut inner = self.lock();
            if inner.disposed {
                return Err(self.disposed());
            }

            let transport = match inner.transport.clone() {
                Some(t) if t.state() == TransportState::Unopened => t,
                old => {
                    if let Some(old) = old {
                        if old.state().is_active() {
                            old.abort();
                        }
                    }
                    let fresh = self.factory.create();
                    inner.transport = Some(Arc::clone(&fresh));
                    fresh
                }
            };
            if !inner.gate.is_pending() {
                inner.renew_gate();
            }
            inner.state = TransportState::Connecting;
            (transport, Arc::clone(&inner.gate))
        };

        debug!(endpoint = %self.endpoint.name(), address = %self.endpoint.address(), "connecting");
        let attempt = tokio::select! {
            biased;
            _ = token.cancelled() => Handshake::Canceled,
            res = transport.connect(self.endpoint.address()) => Handshake::Done(res),
        };

        let result = {
            let mut inner = self.lock();
            let current = inner
                .transport
                .as_ref()
                .is_some_and(|t| Arc::ptr_eq(t, &transport));
            let current_gate = Arc::ptr_eq(&inner.gate, &gate);

            match attempt {
                Handshake::Canceled => {
                    transport.abort();
                    if current {
                        inner.state = transport.state();
                    }
                    gate.cancel();
                    if current_gate {
                        inner.renew_gate();
                    }
                    Err(ConnectionError::Canceled)
                }
                Handshake::Done(Err(err)) if err.is_transport_level() => {
                    if current {
                        inner.state = transport.state();
                    }
                    Err(ConnectionError::Transport {
                        endpoint: self.endpoint.name_arc(),
                        source: err,
                    })
                }
                Handshake::Done(Err(err)) => {
                    if current {
                        inner.state = transport.state();
                    }
                    gate.fail(err.to_string());
                    if current_gate {
                        inner.renew_gate();
                    }
                    Err(ConnectionError::Unexpected {
                        endpoint: self.endpoint.name_arc(),
                        error: err.to_string(),
                    })
                }
                Handshake::Done(Ok(())) if current && current_gate && !inner.disposed => {
                    inner.state = TransportState::Open;
                    gate.fulfill();
                    Ok(())
                }
                Handshake::Done(Ok(())) => {
                    // Disposed or superseded while the handshake ran.
                    transport.abort();
                    Err(ConnectionError::Interrupted {
                        endpoint: self.endpoint.name_arc(),
                    })
                }
            }
        };

        match &result {
            Ok(()) => {
                info!(endpoint = %self.endpoint.name(), "connected");
                if let Err(err) = self
                    .connected
                    .invoke(self.endpoint.name(), self.endpoint.clone())
                    .await
                {
                    warn!(endpoint = %self.endpoint.name(), error = %err, "connected listeners failed");
                }
            }
            Err(ConnectionError::Canceled) => {
                debug!(endpoint = %self.endpoint.name(), "connect canceled");
            }
            Err(err) => {
                debug!(endpoint = %self.endpoint.name(), error = %err, "connect failed");
            }
        }
        result
    }

    /// Reads one complete message.
    ///
    /// Waits for readiness first. Frames are drained until end of message and
    /// decoded as UTF-8; a close frame yields [`Received::Closed`].
    pub async fn receive(&self, token: &CancellationToken) -> Result<Received, ConnectionError> {
        let transport = self.wait_ready(token).await?;

        let mut payload = Vec::new();
        loop {
            let frame = tokio::select! {
                frame = transport.receive() => frame,
                _ = token.cancelled() => return Err(ConnectionError::Canceled),
            };

            match frame {
                Ok(frame) if frame.kind == FrameKind::Close => {
                    self.observe();
                    return Ok(Received::Closed);
                }
                Ok(frame) => {
                    payload.extend_from_slice(&frame.payload);
                    if frame.end_of_message {
                        break;
                    }
                }
                Err(err) => {
                    self.observe();
                    return Err(self.transport_error(err));
                }
            }
        }

        String::from_utf8(payload)
            .map(Received::Text)
            .map_err(|e| ConnectionError::Unexpected {
                endpoint: self.endpoint.name_arc(),
                error: format!("message is not valid utf-8: {e}"),
            })
    }

    /// Writes one message and reports failures.
    pub async fn try_send(&self, text: &str, token: &CancellationToken) -> Result<(), ConnectionError> {
        let transport = self.wait_ready(token).await?;

        let res = tokio::select! {
            res = transport.send(text) => res,
            _ = token.cancelled() => return Err(ConnectionError::Canceled),
        };
        res.map_err(|err| {
            self.observe();
            self.transport_error(err)
        })
    }

    /// Best-effort [`Connection::try_send`]: failures are logged, never returned.
    pub async fn send(&self, text: &str, token: &CancellationToken) {
        match self.try_send(text, token).await {
            Ok(()) => {}
            Err(ConnectionError::Canceled) => {
                debug!(endpoint = %self.endpoint.name(), "send canceled");
            }
            Err(err) => {
                warn!(endpoint = %self.endpoint.name(), error = %err, "send failed");
            }
        }
    }

    /// Starts the graceful closing handshake if connecting or open.
    ///
    /// Failures are logged; repeated calls are no-ops.
    pub async fn close(&self, token: &CancellationToken) {
        let transport = {
            let mut inner = self.lock();
            if inner.disposed {
                return;
            }
            let lost = self.observe_locked(&mut inner);
            let transport = inner
                .transport
                .clone()
                .filter(|t| t.state().is_active());
            drop(inner);
            if lost {
                self.fire_lost();
            }
            match transport {
                Some(t) => t,
                None => return,
            }
        };

        debug!(endpoint = %self.endpoint.name(), "closing");
        tokio::select! {
            res = transport.close_output() => {
                if let Err(err) = res {
                    warn!(endpoint = %self.endpoint.name(), error = %err, "close failed");
                }
            }
            _ = token.cancelled() => {
                debug!(endpoint = %self.endpoint.name(), "close canceled");
            }
        }
        self.observe();
    }

    /// Aborts an active transport and releases it. Idempotent.
    ///
    /// Waiters on the gate observe cancellation; later operations fail with
    /// [`ConnectionError::Disposed`].
    pub fn dispose(&self) {
        let mut inner = self.lock();
        if inner.disposed {
            return;
        }
        inner.disposed = true;
        if let Some(t) = inner.transport.take() {
            if t.state().is_active() {
                t.abort();
            }
        }
        inner.gate.cancel();
        debug!(endpoint = %self.endpoint.name(), "disposed");
    }

    /// Waits until the live gate is fulfilled and returns the open transport.
    async fn wait_ready(&self, token: &CancellationToken) -> Result<Arc<dyn Transport>, ConnectionError> {
        loop {
            let gate = {
                let mut inner = self.lock();
                if inner.disposed {
                    return Err(self.disposed());
                }
                let lost = self.observe_locked(&mut inner);
                let ready = match (&inner.transport, inner.state) {
                    (Some(t), TransportState::Open) if inner.gate.is_ready() => Some(Arc::clone(t)),
                    _ => None,
                };
                let gate = Arc::clone(&inner.gate);
                drop(inner);
                if lost {
                    self.fire_lost();
                }
                if let Some(transport) = ready {
                    return Ok(transport);
                }
                gate
            };

            let readiness = tokio::select! {
                r = gate.wait() => r,
                _ = token.cancelled() => return Err(ConnectionError::Canceled),
            };
            match readiness {
                Readiness::Ready | Readiness::Pending => continue,
                Readiness::Canceled => {
                    let disposed = self.lock().disposed;
                    return Err(if disposed {
                        self.disposed()
                    } else {
                        ConnectionError::Interrupted {
                            endpoint: self.endpoint.name_arc(),
                        }
                    });
                }
                Readiness::Failed(reason) => {
                    return Err(ConnectionError::Unavailable {
                        endpoint: self.endpoint.name_arc(),
                        reason,
                    });
                }
            }
        }
    }

    fn observe(&self) {
        let lost = {
            let mut inner = self.lock();
            self.observe_locked(&mut inner)
        };
        if lost {
            self.fire_lost();
        }
    }

    /// Syncs the cached state with the transport; true on a lost transition.
    fn observe_locked(&self, inner: &mut Inner) -> bool {
        if inner.state == TransportState::Connecting {
            return false;
        }
        let Some(live) = inner.transport.as_ref().map(|t| t.state()) else {
            return false;
        };
        if live == inner.state {
            return false;
        }

        let was = std::mem::replace(&mut inner.state, live);
        debug!(
            endpoint = %self.endpoint.name(),
            from = was.as_str(),
            to = live.as_str(),
            "transport state changed"
        );
        if was.is_lost() || !live.is_lost() {
            return false;
        }

        inner.gate.cancel();
        inner.renew_gate();
        self.reconnects.fetch_add(1, Ordering::Relaxed);
        true
    }

    fn fire_lost(&self) {
        warn!(endpoint = %self.endpoint.name(), state = self.state().as_str(), "connection lost");
        self.lost
            .invoke_detached(self.endpoint.name(), self.endpoint.clone());
    }

    fn transport_error(&self, err: TransportError) -> ConnectionError {
        if err.is_transport_level() {
            ConnectionError::Transport {
                endpoint: self.endpoint.name_arc(),
                source: err,
            }
        } else {
            ConnectionError::Unexpected {
                endpoint: self.endpoint.name_arc(),
                error: err.to_string(),
            }
        }
    }

    fn disposed(&self) -> ConnectionError {
        ConnectionError::Disposed {
            endpoint: self.endpoint.name_arc(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use crate::connection::Frame;
    use crate::events::Listener;
    use crate::testing::{MockFactory, Outcome, refused};

    fn setup(factory: &Arc<MockFactory>) -> (Bus, Arc<Connection>) {
        let bus = Bus::new();
        let ep = Endpoint::parse("T", "wss://example/test").unwrap();
        let conn = Arc::new(Connection::new(ep, factory.clone(), &bus));
        (bus, conn)
    }

    fn count_lost(bus: &Bus) -> Arc<AtomicUsize> {
        let n = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&n);
        bus.condition_for::<ConnectionLost>("T").add(Listener::new("count", move |_| {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));
        n
    }

    async fn eventually(mut cond: impl FnMut() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_send_waits_for_connect() {
        let factory = MockFactory::new();
        let (_bus, conn) = setup(&factory);
        let token = CancellationToken::new();

        let pending = tokio::spawn({
            let conn = Arc::clone(&conn);
            let token = token.clone();
            async move { conn.try_send("ping", &token).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!pending.is_finished());
        assert_eq!(factory.created(), 0);

        conn.connect(&token).await.unwrap();
        tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(factory.last().sent(), vec!["ping".to_owned()]);
        assert!(conn.is_connected());
        assert_eq!(conn.state(), TransportState::Open);
    }

    #[tokio::test]
    async fn test_connected_fires_before_connect_returns() {
        let factory = MockFactory::new();
        let (bus, conn) = setup(&factory);
        let seen = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&seen);
        bus.condition_for::<Connected>("T").add(Listener::new("seen", move |ep: Endpoint| {
            let s = Arc::clone(&s);
            async move {
                assert_eq!(ep.name(), "T");
                tokio::time::sleep(Duration::from_millis(10)).await;
                s.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }));

        conn.connect(&CancellationToken::new()).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_connected_listener_does_not_fail_connect() {
        let factory = MockFactory::new();
        let (bus, conn) = setup(&factory);
        bus.condition_for::<Connected>("T").add(Listener::new("boom", |_| async {
            Err(crate::error::ListenerError::failed("boom"))
        }));
        assert!(conn.connect(&CancellationToken::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_lost_transition_fires_once() {
        let factory = MockFactory::new();
        let (bus, conn) = setup(&factory);
        let lost = count_lost(&bus);
        let token = CancellationToken::new();

        conn.connect(&token).await.unwrap();
        factory.last().kill();

        conn.close(&token).await;
        conn.close(&token).await;
        eventually(|| lost.load(Ordering::SeqCst) == 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(lost.load(Ordering::SeqCst), 1);
        assert_eq!(conn.reconnect_count(), 1);
        assert_eq!(conn.state(), TransportState::Aborted);
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_failed_handshake_is_not_a_lost_transition() {
        let factory = MockFactory::new();
        factory.script([Outcome::Fail(refused())]);
        let (bus, conn) = setup(&factory);
        let lost = count_lost(&bus);
        let token = CancellationToken::new();

        let err = conn.connect(&token).await.unwrap_err();
        assert!(err.is_retryable(), "{err:?}");

        conn.close(&token).await;
        conn.connect(&token).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(factory.created(), 2);
        assert_eq!(lost.load(Ordering::SeqCst), 0);
        assert_eq!(conn.reconnect_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_cancel_interrupts_waiters() {
        let factory = MockFactory::new();
        factory.script([Outcome::Hang]);
        let (_bus, conn) = setup(&factory);

        let waiter = tokio::spawn({
            let conn = Arc::clone(&conn);
            async move { conn.receive(&CancellationToken::new()).await }
        });

        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let err = conn.connect(&token).await.unwrap_err();
        assert!(err.is_canceled());

        let res = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(res, Err(ConnectionError::Interrupted { .. })), "{res:?}");
    }

    #[tokio::test]
    async fn test_unexpected_failure_is_recorded_on_gate() {
        let factory = MockFactory::new();
        factory.script([Outcome::Fail(TransportError::Invalid {
            error: "unsupported scheme".into(),
        })]);
        let (_bus, conn) = setup(&factory);

        let waiter = tokio::spawn({
            let conn = Arc::clone(&conn);
            async move { conn.try_send("x", &CancellationToken::new()).await }
        });
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let err = conn.connect(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Unexpected { .. }));

        let res = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(res, Err(ConnectionError::Unavailable { .. })), "{res:?}");
    }

    #[tokio::test]
    async fn test_caller_cancel_does_not_settle_gate() {
        let factory = MockFactory::new();
        let (_bus, conn) = setup(&factory);

        let canceled = CancellationToken::new();
        canceled.cancel();
        let err = conn.try_send("early", &canceled).await.unwrap_err();
        assert!(err.is_canceled());

        let token = CancellationToken::new();
        conn.connect(&token).await.unwrap();
        conn.try_send("late", &token).await.unwrap();
        assert_eq!(factory.created(), 1);
        assert_eq!(factory.last().sent(), vec!["late".to_owned()]);
    }

    #[tokio::test]
    async fn test_receive_drains_frames_until_end_of_message() {
        let factory = MockFactory::new();
        let (_bus, conn) = setup(&factory);
        let token = CancellationToken::new();
        conn.connect(&token).await.unwrap();

        let t = factory.last();
        t.push(Frame {
            kind: FrameKind::Text,
            payload: b"hel".to_vec(),
            end_of_message: false,
        });
        t.push(Frame {
            kind: FrameKind::Text,
            payload: b"lo".to_vec(),
            end_of_message: true,
        });
        assert_eq!(conn.receive(&token).await.unwrap(), Received::Text("hello".into()));

        t.push(Frame {
            kind: FrameKind::Binary,
            payload: vec![0xff, 0xfe],
            end_of_message: true,
        });
        let err = conn.receive(&token).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Unexpected { .. }));
    }

    #[tokio::test]
    async fn test_close_frame_yields_closed_and_lost() {
        let factory = MockFactory::new();
        let (bus, conn) = setup(&factory);
        let lost = count_lost(&bus);
        let token = CancellationToken::new();
        conn.connect(&token).await.unwrap();

        factory.last().push(Frame::close());
        assert_eq!(conn.receive(&token).await.unwrap(), Received::Closed);
        eventually(|| lost.load(Ordering::SeqCst) == 1).await;
        assert_eq!(conn.state(), TransportState::CloseReceived);
    }

    #[tokio::test]
    async fn test_close_and_dispose_are_idempotent() {
        let factory = MockFactory::new();
        let (_bus, conn) = setup(&factory);
        let token = CancellationToken::new();
        conn.connect(&token).await.unwrap();

        conn.close(&token).await;
        conn.close(&token).await;
        assert_eq!(factory.last().state(), TransportState::CloseSent);

        conn.dispose();
        conn.dispose();
        conn.close(&token).await;
        conn.send("ignored", &token).await;

        let err = conn.try_send("x", &token).await.unwrap_err();
        assert!(matches!(err, ConnectionError::Disposed { .. }));
        assert!(factory.last().sent().is_empty());
        assert!(matches!(
            conn.connect(&token).await,
            Err(ConnectionError::Disposed { .. })
        ));
    }

    #[tokio::test]
    async fn test_dispose_releases_waiters() {
        let factory = MockFactory::new();
        let (_bus, conn) = setup(&factory);
        let waiter = tokio::spawn({
            let conn = Arc::clone(&conn);
            async move { conn.receive(&CancellationToken::new()).await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        conn.dispose();
        let res = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(res, Err(ConnectionError::Disposed { .. })), "{res:?}");
    }

    #[tokio::test]
    async fn test_ping_pong_then_abrupt_drop_reconnects_before_data() {
        let factory = MockFactory::new();
        let (bus, conn) = setup(&factory);
        let token = CancellationToken::new();

        let lost = Arc::new(AtomicUsize::new(0));
        bus.condition_for::<ConnectionLost>("T").add(Listener::new("reconnect", {
            let conn = Arc::clone(&conn);
            let lost = Arc::clone(&lost);
            move |_| {
                let conn = Arc::clone(&conn);
                let lost = Arc::clone(&lost);
                async move {
                    lost.fetch_add(1, Ordering::SeqCst);
                    conn.connect(&CancellationToken::new())
                        .await
                        .map_err(crate::error::ListenerError::from)
                }
            }
        }));

        conn.connect(&token).await.unwrap();
        conn.send("ping", &token).await;
        assert_eq!(factory.last().sent(), vec!["ping".to_owned()]);

        factory.last().push_text("pong");
        assert_eq!(conn.receive(&token).await.unwrap(), Received::Text("pong".into()));

        factory.last().kill();
        let next = tokio::spawn({
            let conn = Arc::clone(&conn);
            async move { conn.receive(&CancellationToken::new()).await }
        });

        eventually(|| factory.created() == 2 && conn.is_connected()).await;
        factory.last().push_text("fresh");

        let got = tokio::time::timeout(Duration::from_secs(1), next)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(got, Received::Text("fresh".into()));
        assert_eq!(lost.load(Ordering::SeqCst), 1);
        assert_eq!(conn.reconnect_count(), 1);
    }
}
