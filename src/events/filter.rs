//! # Filters applied when a listener set changes.
//!
//! A [`Filter`] sees the proposed set and the set it replaces and returns the
//! set that is actually stored. The default behavior is pass-through.
//!
//! - [`Identity`] stores the proposed set unchanged.
//! - [`Dedup`] drops repeated registrations of the same listener.

use crate::events::{Event, Listeners};

/// Transformation applied by a [`Condition`](crate::Condition) on every change.
///
/// Called while the slot lock is held: keep it pure and fast.
pub trait Filter<E: Event>: Send + Sync + 'static {
    /// Returns the effective set to store. Default: `proposed`.
    fn apply(&self, proposed: Listeners<E>, current: &Listeners<E>) -> Listeners<E> {
        let _ = current;
        proposed
    }
}

/// Pass-through filter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl<E: Event> Filter<E> for Identity {}

/// Keeps the first registration of each listener, drops the repeats.
///
/// ## Example
/// ```rust
/// use streamkeeper::{ApplicationStart, Dedup, Filter, Listener, Listeners};
///
/// let l = Listener::<ApplicationStart>::new("l", |_: ()| async { Ok(()) });
/// let current = Listeners::empty().with(l.clone());
/// let stored = Dedup.apply(current.with(l), &current);
/// assert_eq!(stored.len(), 1);
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct Dedup;

impl<E: Event> Filter<E> for Dedup {
    fn apply(&self, proposed: Listeners<E>, _current: &Listeners<E>) -> Listeners<E> {
        let mut kept: Vec<_> = Vec::with_capacity(proposed.len());
        for l in proposed.iter() {
            if !kept.contains(l) {
                kept.push(l.clone());
            }
        }
        kept.into_iter().collect()
    }
}
