//! Runtime core: process hosting and lifecycle.
//!
//! - [`Host`] / [`HostBuilder`] wire connections, behaviors and receivers to one bus and run the lifecycle.
//! - [`HostConfig`] grace, retry schedule and receive pause.
//! - [`MessageReceiver`] / [`run_receiver`] supervised receive loops; [`LogReceiver`] logs what arrives.
//!
//! Internal modules:
//! - `shutdown`: OS termination signals and the host stop token.

mod builder;
mod config;
mod host;
mod receiver;
mod shutdown;

pub use builder::HostBuilder;
pub use config::HostConfig;
pub use host::Host;
pub use receiver::{LogReceiver, MessageReceiver, run_receiver};
