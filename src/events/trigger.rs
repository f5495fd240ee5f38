//! # Write-side handle.
//!
//! A [`Trigger`] invokes the current listener set of one event kind.
//!
//! ## Dispatch disciplines
//! ```text
//! invoke(label, args)            invoke_detached(label, args)
//!   snapshot listeners             tokio::spawn ─┐ (returns immediately)
//!   ├─► L1(args) ─┐                              ▼
//!   ├─► L2(args) ─┼─ join_all      select! { shutdown.cancelled() → return silently
//!   └─► LN(args) ─┘                          invoke(label, args)  → log failures }
//!   Ok(()) or TriggerError::Listeners
//! ```
//!
//! ## Rules
//! - One snapshot per invocation; every listener sees the same args.
//! - Listeners run concurrently; no ordering between them.
//! - A failing or panicking listener never stops the others.
//! - An empty set completes immediately with `Ok(())`.
//! - Detached dispatch swallows shutdown cancellation: in-flight background
//!   events during shutdown cannot be recovered and are not reported.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{ListenerError, TriggerError};
use crate::events::{Event, Slot};

/// Write-side handle for event kind `E`.
pub struct Trigger<E: Event> {
    slot: Arc<Slot<E>>,
    shutdown: CancellationToken,
}

impl<E: Event> Trigger<E> {
    /// Creates a trigger over `slot`; `shutdown` bounds detached dispatch.
    pub fn new(slot: Arc<Slot<E>>, shutdown: CancellationToken) -> Self {
        Self { slot, shutdown }
    }

    /// Invokes every listener concurrently and waits for all of them.
    pub async fn invoke(&self, label: &str, args: E::Args) -> Result<(), TriggerError> {
        let listeners = self.slot.snapshot();
        debug!(event = E::NAME, label, listeners = listeners.len(), "trigger");

        if listeners.is_empty() {
            return Ok(());
        }

        let total = listeners.len();
        let runs = listeners.iter().cloned().map(|listener| {
            let args = args.clone();
            let run = async move { listener.call(args).await };
            AssertUnwindSafe(run).catch_unwind()
        });

        let failures: Vec<ListenerError> = join_all(runs)
            .await
            .into_iter()
            .filter_map(|res| match res {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err),
                Err(panic) => Some(ListenerError::Panicked {
                    info: panic_info(panic.as_ref()),
                }),
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TriggerError::Listeners {
                event: E::NAME,
                label: label.to_owned(),
                total,
                failures,
            })
        }
    }

    /// Schedules [`Trigger::invoke`] on the runtime and returns immediately.
    ///
    /// Failures are logged. Cancellation (shutdown token or all-canceled
    /// listeners) ends the dispatch silently.
    pub fn invoke_detached(&self, label: impl Into<String>, args: E::Args) -> JoinHandle<()> {
        let trigger = self.clone();
        let label = label.into();

        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = trigger.shutdown.cancelled() => {}
                res = trigger.invoke(&label, args) => match res {
                    Ok(()) => {}
                    Err(err) if err.is_canceled() => {}
                    Err(err) => {
                        warn!(event = E::NAME, label = %label, error = %err, "detached trigger failed");
                    }
                },
            }
        })
    }
}

impl<E: Event> Clone for Trigger<E> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            shutdown: self.shutdown.clone(),
        }
    }
}

fn panic_info(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::{Notify, oneshot};

    use crate::events::{Listener, Listeners};

    struct Ping;

    impl Event for Ping {
        type Args = u32;
        const NAME: &'static str = "ping";
    }

    fn trigger_with(listeners: Listeners<Ping>) -> Trigger<Ping> {
        let slot = Arc::new(Slot::new());
        slot.update(|_| listeners);
        Trigger::new(slot, CancellationToken::new())
    }

    #[tokio::test]
    async fn test_empty_slot_completes_immediately() {
        let trigger = trigger_with(Listeners::empty());
        assert!(trigger.invoke("nothing", 1).await.is_ok());
    }

    #[tokio::test]
    async fn test_failure_does_not_stop_other_listeners() {
        let done = Arc::new(AtomicUsize::new(0));
        let d = Arc::clone(&done);
        let slow_ok = Listener::<Ping>::new("ok", move |n| {
            let d = Arc::clone(&d);
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                d.fetch_add(n as usize, Ordering::SeqCst);
                Ok(())
            }
        });
        let fails = Listener::<Ping>::new("fails", |_| async { Err(ListenerError::failed("boom")) });

        let trigger = trigger_with(Listeners::empty().with(slow_ok).with(fails));
        let err = trigger.invoke("fan-out", 7).await.unwrap_err();

        assert_eq!(done.load(Ordering::SeqCst), 7);
        assert_eq!(err.failures().len(), 1);
        assert!(matches!(
            err,
            TriggerError::Listeners { total: 2, event: "ping", .. }
        ));
    }

    #[tokio::test]
    async fn test_listeners_run_concurrently() {
        let gate = Arc::new(Notify::new());
        let g = Arc::clone(&gate);
        let waiter = Listener::<Ping>::new("waiter", move |_| {
            let g = Arc::clone(&g);
            async move {
                g.notified().await;
                Ok(())
            }
        });
        let g = Arc::clone(&gate);
        let releaser = Listener::<Ping>::new("releaser", move |_| {
            let g = Arc::clone(&g);
            async move {
                g.notify_one();
                Ok(())
            }
        });

        let trigger = trigger_with(Listeners::empty().with(waiter).with(releaser));
        let res = tokio::time::timeout(Duration::from_secs(1), trigger.invoke("pair", 0)).await;
        assert!(matches!(res, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_panicking_listener_is_reported() {
        let panics = Listener::<Ping>::new("panics", |n| async move {
            if n > 0 {
                panic!("listener blew up");
            }
            Ok(())
        });
        let trigger = trigger_with(Listeners::empty().with(panics));
        let err = trigger.invoke("panic", 1).await.unwrap_err();
        assert!(matches!(
            &err.failures()[0],
            ListenerError::Panicked { info } if info == "listener blew up"
        ));
    }

    #[tokio::test]
    async fn test_detached_returns_before_listeners_finish() {
        let (tx, rx) = oneshot::channel::<()>();
        let rx = Arc::new(tokio::sync::Mutex::new(Some(rx)));
        let ran = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&ran);
        let blocked = Listener::<Ping>::new("blocked", move |_| {
            let rx = Arc::clone(&rx);
            let r = Arc::clone(&r);
            async move {
                if let Some(rx) = rx.lock().await.take() {
                    let _ = rx.await;
                }
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let trigger = trigger_with(Listeners::empty().with(blocked));
        let handle = trigger.invoke_detached("background", 0);
        assert_eq!(ran.load(Ordering::SeqCst), 0);

        tx.send(()).unwrap();
        handle.await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_detached_swallows_shutdown_cancellation() {
        let shutdown = CancellationToken::new();
        let slot = Arc::new(Slot::new());
        slot.update(|cur: &Listeners<Ping>| {
            cur.with(Listener::new("forever", |_| async {
                std::future::pending::<()>().await;
                Ok(())
            }))
        });
        let trigger = Trigger::new(slot, shutdown.clone());

        let handle = trigger.invoke_detached("stuck", 0);
        shutdown.cancel();
        let joined = tokio::time::timeout(Duration::from_secs(1), handle).await;
        assert!(matches!(joined, Ok(Ok(()))));
    }

    #[tokio::test]
    async fn test_detached_absorbs_listener_failure() {
        let trigger = trigger_with(
            Listeners::empty().with(Listener::new("fails", |_| async {
                Err(ListenerError::failed("boom"))
            })),
        );
        assert!(trigger.invoke_detached("absorbed", 0).await.is_ok());
    }
}
