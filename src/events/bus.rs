//! # Event bus: typed registry of listener slots.
//!
//! [`Bus`] maps an event kind (plus an optional scope string) to the one
//! [`Slot`] holding its listeners, and hands out [`Trigger`] and [`Condition`]
//! handles bound to that slot. Publishers and subscribers never see each other,
//! only the slot.
//!
//! ## Architecture
//! ```text
//! Publishers:                                     Subscribers:
//!   Host ─────── Trigger<ApplicationStart> ──┐ ┌── Condition<ApplicationStart> ── ReconnectBehavior
//!   Connection ─ Trigger<ConnectionLost>("T") ┼─┼── Condition<ConnectionLost>("T") ─ ReconnectBehavior
//!                                             ▼ ▲
//!                          slots: (TypeId, scope) → Slot<E>
//! ```
//!
//! ## Rules
//! - **One slot per key**: the first request for `(E, scope)` creates the slot,
//!   later requests share it.
//! - **Scopes**: process-wide kinds use the global scope (`""`); per-endpoint
//!   kinds use the endpoint name.
//! - **Shutdown token**: the bus owns the process-wide [`CancellationToken`];
//!   every trigger it creates observes it for detached dispatch.
//! - **Cloneable**: cheap to clone (internally `Arc`-backed).

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::events::{Condition, Event, Slot, Trigger};

type SlotKey = (TypeId, Arc<str>);
type AnySlot = Arc<dyn Any + Send + Sync>;

/// Scope used by process-wide event kinds.
pub const GLOBAL: &str = "";

struct Inner {
    slots: Mutex<HashMap<SlotKey, AnySlot>>,
    shutdown: CancellationToken,
}

/// Typed registry of event slots.
#[derive(Clone)]
pub struct Bus {
    inner: Arc<Inner>,
}

impl Bus {
    /// Creates a bus with its own shutdown token.
    pub fn new() -> Self {
        Self::with_shutdown(CancellationToken::new())
    }

    /// Creates a bus whose detached dispatch stops when `shutdown` is cancelled.
    pub fn with_shutdown(shutdown: CancellationToken) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                shutdown,
            }),
        }
    }

    /// Process-wide shutdown token.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.inner.shutdown.clone()
    }

    /// Slot of process-wide kind `E`.
    pub fn slot<E: Event>(&self) -> Arc<Slot<E>> {
        self.slot_for::<E>(GLOBAL)
    }

    /// Slot of kind `E` in `scope`, created on first use.
    pub fn slot_for<E: Event>(&self, scope: &str) -> Arc<Slot<E>> {
        let key: SlotKey = (TypeId::of::<E>(), Arc::from(scope));
        let mut slots = self
            .inner
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(existing) = slots.get(&key) {
            if let Ok(slot) = Arc::clone(existing).downcast::<Slot<E>>() {
                return slot;
            }
        }

        let slot = Arc::new(Slot::<E>::new());
        slots.insert(key, Arc::clone(&slot) as AnySlot);
        slot
    }

    /// Trigger of process-wide kind `E`.
    pub fn trigger<E: Event>(&self) -> Trigger<E> {
        self.trigger_for::<E>(GLOBAL)
    }

    /// Trigger of kind `E` in `scope`.
    pub fn trigger_for<E: Event>(&self, scope: &str) -> Trigger<E> {
        Trigger::new(self.slot_for::<E>(scope), self.shutdown_token())
    }

    /// Condition of process-wide kind `E` with the pass-through filter.
    pub fn condition<E: Event>(&self) -> Condition<E> {
        self.condition_for::<E>(GLOBAL)
    }

    /// Condition of kind `E` in `scope` with the pass-through filter.
    pub fn condition_for<E: Event>(&self, scope: &str) -> Condition<E> {
        Condition::new(self.slot_for::<E>(scope))
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::events::{ApplicationStart, ApplicationStop, Listener};

    fn counter<E: Event>(hits: &Arc<AtomicUsize>) -> Listener<E> {
        let hits = Arc::clone(hits);
        Listener::new("counter", move |_| {
            let hits = Arc::clone(&hits);
            async move {
                hits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
    }

    #[tokio::test]
    async fn test_condition_and_trigger_share_slot() {
        let bus = Bus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        bus.condition::<ApplicationStart>().add(counter(&hits));

        bus.trigger::<ApplicationStart>().invoke("start", ()).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_kinds_are_isolated() {
        let bus = Bus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        bus.condition::<ApplicationStart>().add(counter(&hits));

        bus.trigger::<ApplicationStop>().invoke("stop", ()).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scopes_are_isolated() {
        let bus = Bus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        bus.condition_for::<ApplicationStart>("a").add(counter(&hits));

        bus.trigger_for::<ApplicationStart>("b").invoke("b", ()).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        bus.trigger_for::<ApplicationStart>("a").invoke("a", ()).await.unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_slot_is_created_once() {
        let bus = Bus::new();
        let a = bus.slot::<ApplicationStart>();
        let b = bus.clone().slot::<ApplicationStart>();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
