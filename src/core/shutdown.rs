//! # Shutdown triggers.
//!
//! [`wait_for_shutdown`] completes on the first of:
//! - an OS termination signal: `SIGINT`, `SIGTERM`, `SIGQUIT` on unix, `Ctrl-C` elsewhere
//! - the host's stop token (see [`Host::shutdown`](crate::Host::shutdown))

use tokio_util::sync::CancellationToken;

/// Why the host is stopping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StopReason {
    Signal,
    Requested,
}

/// Waits for a termination signal or for `stop` to be cancelled.
///
/// Fails only when signal handlers cannot be registered.
pub(crate) async fn wait_for_shutdown(stop: &CancellationToken) -> std::io::Result<StopReason> {
    tokio::select! {
        res = termination_signal() => res.map(|()| StopReason::Signal),
        _ = stop.cancelled() => Ok(StopReason::Requested),
    }
}

#[cfg(unix)]
async fn termination_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
async fn termination_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requested_stop() {
        let stop = CancellationToken::new();
        stop.cancel();
        assert_eq!(wait_for_shutdown(&stop).await.unwrap(), StopReason::Requested);
    }
}
