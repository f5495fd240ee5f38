//! # Subscribe-side handle.
//!
//! A [`Condition`] adds and removes listeners of one event kind. Every change
//! goes through its [`Filter`] and is written into the shared [`Slot`] as one
//! atomic read-modify-write, so concurrent subscribe/unsubscribe calls on the
//! same slot never lose updates.
//!
//! ## Example
//! ```rust
//! use streamkeeper::{ApplicationStart, Bus, Listener};
//!
//! let bus = Bus::new();
//! let on_start = bus.condition::<ApplicationStart>();
//! let hello = Listener::new("hello", |_: ()| async { Ok(()) });
//!
//! on_start.add(hello.clone());
//! assert_eq!(on_start.when().len(), 1);
//! on_start.remove(&hello);
//! assert!(on_start.when().is_empty());
//! ```

use std::sync::Arc;

use crate::events::{Event, Filter, Identity, Listener, Listeners, Slot};

/// Subscribe-side handle for event kind `E`.
pub struct Condition<E: Event> {
    slot: Arc<Slot<E>>,
    filter: Arc<dyn Filter<E>>,
}

impl<E: Event> Condition<E> {
    /// Creates a condition over `slot` with the pass-through filter.
    pub fn new(slot: Arc<Slot<E>>) -> Self {
        Self {
            slot,
            filter: Arc::new(Identity),
        }
    }

    /// Replaces the filter applied on every change.
    #[must_use]
    pub fn with_filter(mut self, filter: Arc<dyn Filter<E>>) -> Self {
        self.filter = filter;
        self
    }

    /// Current listener set.
    pub fn when(&self) -> Listeners<E> {
        self.slot.snapshot()
    }

    /// Stores `filter(proposed, current)` as the new set.
    pub fn set_when(&self, proposed: Listeners<E>) -> Listeners<E> {
        self.slot
            .update(|current| self.filter.apply(proposed, current))
    }

    /// Registers `listener`; returns the stored set.
    pub fn add(&self, listener: Listener<E>) -> Listeners<E> {
        self.slot
            .update(|current| self.filter.apply(current.with(listener), current))
    }

    /// Unregisters `listener`; returns the stored set.
    pub fn remove(&self, listener: &Listener<E>) -> Listeners<E> {
        self.slot
            .update(|current| self.filter.apply(current.without(listener), current))
    }
}

impl<E: Event> Clone for Condition<E> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
            filter: Arc::clone(&self.filter),
        }
    }
}
