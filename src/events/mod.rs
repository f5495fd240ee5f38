//! Lifecycle events: kinds, listener slots, triggers and conditions.
//!
//! This module is the decoupling layer between components: a publisher holds a
//! [`Trigger`], a subscriber holds a [`Condition`], both bound to the same
//! [`Slot`] through the [`Bus`].
//!
//! ## Contents
//! - [`Event`] and the built-in kinds ([`ApplicationStart`], [`ApplicationStop`],
//!   [`Connected`], [`ConnectionLost`])
//! - [`Listener`], [`Listeners`], [`Slot`] the listener set and its holding cell
//! - [`Filter`], [`Identity`], [`Dedup`] transformations applied on change
//! - [`Trigger`] joined / detached invocation
//! - [`Condition`] add / remove through a filter
//! - [`Bus`] registry keyed by event kind and scope

mod bus;
mod condition;
mod event;
mod filter;
mod slot;
mod trigger;

pub use bus::{Bus, GLOBAL};
pub use condition::Condition;
pub use event::{ApplicationStart, ApplicationStop, Connected, ConnectionLost, Event};
pub use filter::{Dedup, Filter, Identity};
pub use slot::{Listener, ListenerFuture, Listeners, Slot};
pub use trigger::Trigger;
