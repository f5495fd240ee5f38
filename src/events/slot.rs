//! # Listener sets and the slot that holds them.
//!
//! - [`Listener`] named async callback, compared by identity.
//! - [`Listeners`] immutable ordered set; adding/removing yields a new set.
//! - [`Slot`] single holding cell for the current set of one event kind.
//!
//! ## Rules
//! - Registration order is preserved; execution order is not promised.
//! - A [`Slot`] is only written through [`Slot::update`], which holds the lock
//!   across the whole read-modify-write.
//! - Readers take a snapshot; a snapshot never changes after it was taken.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;

use crate::error::ListenerError;
use crate::events::Event;

/// Boxed future returned by a listener.
pub type ListenerFuture = BoxFuture<'static, Result<(), ListenerError>>;

type Callback<A> = dyn Fn(A) -> ListenerFuture + Send + Sync;

/// Named listener of event kind `E`.
///
/// Cloning is cheap and keeps identity: a clone is equal to its original and
/// can be used to remove it from a [`Listeners`] set.
///
/// ## Example
/// ```rust
/// use streamkeeper::{ApplicationStart, Listener, Listeners};
///
/// let hello = Listener::<ApplicationStart>::new("hello", |_: ()| async { Ok(()) });
/// let set = Listeners::empty().with(hello.clone());
/// assert!(set.contains(&hello));
/// assert!(set.without(&hello).is_empty());
/// ```
pub struct Listener<E: Event> {
    name: Cow<'static, str>,
    f: Arc<Callback<E::Args>>,
}

impl<E: Event> Listener<E> {
    /// Wraps a closure that creates a fresh future per invocation.
    pub fn new<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(E::Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ListenerError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(move |args| Box::pin(f(args)) as ListenerFuture),
        }
    }

    /// Listener name used in logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call(&self, args: E::Args) -> ListenerFuture {
        (self.f)(args)
    }

    fn same(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.f) as *const () == Arc::as_ptr(&other.f) as *const ()
    }
}

impl<E: Event> Clone for Listener<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            f: Arc::clone(&self.f),
        }
    }
}

impl<E: Event> PartialEq for Listener<E> {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl<E: Event> Eq for Listener<E> {}

impl<E: Event> fmt::Debug for Listener<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("event", &E::NAME)
            .field("name", &self.name)
            .finish()
    }
}

/// Ordered, immutable set of listeners for one event kind.
pub struct Listeners<E: Event> {
    items: Arc<[Listener<E>]>,
}

impl<E: Event> Listeners<E> {
    /// The empty set.
    pub fn empty() -> Self {
        Self {
            items: Arc::from(Vec::new()),
        }
    }

    /// Returns a new set with `listener` appended.
    #[must_use]
    pub fn with(&self, listener: Listener<E>) -> Self {
        let mut items = self.items.to_vec();
        items.push(listener);
        Self {
            items: items.into(),
        }
    }

    /// Returns a new set without the last registration of `listener`.
    ///
    /// Removing a listener that is not present returns an equal set.
    #[must_use]
    pub fn without(&self, listener: &Listener<E>) -> Self {
        let mut items = self.items.to_vec();
        if let Some(pos) = items.iter().rposition(|l| l == listener) {
            items.remove(pos);
        }
        Self {
            items: items.into(),
        }
    }

    /// True if `listener` is registered at least once.
    pub fn contains(&self, listener: &Listener<E>) -> bool {
        self.items.iter().any(|l| l == listener)
    }

    /// Iterates in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Listener<E>> {
        self.items.iter()
    }

    /// Number of registrations.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if there are no registrations.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<E: Event> Clone for Listeners<E> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<E: Event> Default for Listeners<E> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<E: Event> FromIterator<Listener<E>> for Listeners<E> {
    fn from_iter<I: IntoIterator<Item = Listener<E>>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect::<Vec<_>>().into(),
        }
    }
}

impl<E: Event> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.items.iter().map(|l| l.name()))
            .finish()
    }
}

/// Holding cell for the current listener set of one event kind.
///
/// Created once per (event kind, scope) by the [`Bus`](crate::Bus) and kept for
/// the bus lifetime.
pub struct Slot<E: Event> {
    current: Mutex<Listeners<E>>,
}

impl<E: Event> Slot<E> {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self {
            current: Mutex::new(Listeners::empty()),
        }
    }

    /// Consistent snapshot of the current set.
    pub fn snapshot(&self) -> Listeners<E> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Atomically replaces the set with `f(current)` and returns the new set.
    pub fn update(&self, f: impl FnOnce(&Listeners<E>) -> Listeners<E>) -> Listeners<E> {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        let next = f(&current);
        *current = next.clone();
        next
    }
}

impl<E: Event> Default for Slot<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ApplicationStart;

    fn noop(name: &'static str) -> Listener<ApplicationStart> {
        Listener::new(name, |_: ()| async { Ok(()) })
    }

    #[test]
    fn test_listener_identity_survives_clone() {
        let a = noop("a");
        let b = noop("a");
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_with_and_without_preserve_order() {
        let (a, b, c) = (noop("a"), noop("b"), noop("c"));
        let set = Listeners::empty().with(a.clone()).with(b.clone()).with(c.clone());
        let names: Vec<_> = set.without(&b).iter().map(|l| l.name().to_owned()).collect();
        assert_eq!(names, vec!["a", "c"]);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_without_missing_listener_is_noop() {
        let a = noop("a");
        let set = Listeners::empty().with(a);
        assert_eq!(set.without(&noop("x")).len(), 1);
    }

    #[test]
    fn test_slot_update_is_visible_to_new_snapshots_only() {
        let slot = Slot::<ApplicationStart>::new();
        let before = slot.snapshot();
        slot.update(|cur| cur.with(noop("a")));
        assert!(before.is_empty());
        assert_eq!(slot.snapshot().len(), 1);
    }
}
