//! # Readiness gate.
//!
//! A [`Gate`] is a single-use completion signal: it starts `Pending` and is
//! settled exactly once to `Ready`, `Canceled` or `Failed`. A settled gate is
//! never reset; the owning connection installs a new one instead, so waiters
//! of the old gate observe its final outcome rather than hanging.
//!
//! ```text
//! Pending ──fulfill()──► Ready
//!    │ ───cancel()───► Canceled
//!    └────fail(e)────► Failed(e)
//! ```

use std::sync::Arc;

use tokio::sync::watch;

/// Settlement of a [`Gate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Readiness {
    Pending,
    Ready,
    Canceled,
    Failed(Arc<str>),
}

#[derive(Debug)]
pub struct Gate {
    tx: watch::Sender<Readiness>,
}

impl Gate {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Readiness::Pending);
        Self { tx }
    }

    pub fn readiness(&self) -> Readiness {
        self.tx.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        matches!(*self.tx.borrow(), Readiness::Pending)
    }

    pub fn is_ready(&self) -> bool {
        matches!(*self.tx.borrow(), Readiness::Ready)
    }

    /// Returns false if the gate was already settled.
    pub fn fulfill(&self) -> bool {
        self.settle(Readiness::Ready)
    }

    pub fn cancel(&self) -> bool {
        self.settle(Readiness::Canceled)
    }

    pub fn fail(&self, reason: impl Into<Arc<str>>) -> bool {
        self.settle(Readiness::Failed(reason.into()))
    }

    fn settle(&self, to: Readiness) -> bool {
        self.tx.send_if_modified(|cur| {
            if *cur != Readiness::Pending {
                return false;
            }
            *cur = to;
            true
        })
    }

    /// Waits until the gate is settled and returns the settlement.
    pub async fn wait(&self) -> Readiness {
        let mut rx = self.tx.subscribe();
        let settled = match rx.wait_for(|r| *r != Readiness::Pending).await {
            Ok(r) => r.clone(),
            // Sender lives in `self`; unreachable in practice.
            Err(_) => Readiness::Canceled,
        };
        settled
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_settles_once() {
        let gate = Gate::new();
        assert!(gate.is_pending());
        assert!(gate.fulfill());
        assert!(!gate.cancel());
        assert!(!gate.fail("late"));
        assert_eq!(gate.readiness(), Readiness::Ready);
    }

    #[tokio::test]
    async fn test_waiters_observe_cancel() {
        let gate = Arc::new(Gate::new());
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let g = Arc::clone(&gate);
                tokio::spawn(async move { g.wait().await })
            })
            .collect();

        tokio::task::yield_now().await;
        gate.cancel();

        for w in waiters {
            let got = tokio::time::timeout(Duration::from_secs(1), w)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(got, Readiness::Canceled);
        }
    }

    #[tokio::test]
    async fn test_wait_on_settled_gate_returns_immediately() {
        let gate = Gate::new();
        gate.fail("handshake rejected");
        assert_eq!(gate.wait().await, Readiness::Failed("handshake rejected".into()));
    }
}
