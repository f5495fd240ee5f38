//! # Behaviors.
//!
//! A [`Behavior`] is a unit of business logic wired to the event bus. The
//! host enables every registered behavior once, before firing
//! [`ApplicationStart`](crate::ApplicationStart).
//!
//! - [`ReconnectBehavior`] keeps one [`Connection`](crate::Connection) open.

mod reconnect;

pub use reconnect::ReconnectBehavior;

/// Subscribes business logic to lifecycle events.
pub trait Behavior: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Registers the behavior's listeners. Calling it again is a no-op.
    fn enable(&self);
}
