/// Observed state of a transport.
///
/// ```text
/// Unopened ─► Connecting ─► Open ─┬─► CloseSent ─► Closed
///                 │               ├─► CloseReceived
///                 │               ├─► Closed
///                 └───────────────┴─► Aborted
/// ```
///
/// `CloseReceived`, `Closed` and `Aborted` are the lost states: a connection
/// that observes one of them after being usable fires `ConnectionLost`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TransportState {
    /// Fresh, never used.
    #[default]
    Unopened,
    /// Handshake in progress.
    Connecting,
    /// Handshake completed; frames may flow both ways.
    Open,
    /// Local side requested a graceful close.
    CloseSent,
    /// Peer sent a close frame.
    CloseReceived,
    /// Stream ended.
    Closed,
    /// Transport failed or was aborted.
    Aborted,
}

impl TransportState {
    /// True for `CloseReceived`, `Closed` and `Aborted`.
    pub fn is_lost(self) -> bool {
        matches!(
            self,
            TransportState::CloseReceived | TransportState::Closed | TransportState::Aborted
        )
    }

    /// True while a handshake is running or the transport is open.
    pub fn is_active(self) -> bool {
        matches!(self, TransportState::Connecting | TransportState::Open)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransportState::Unopened => "unopened",
            TransportState::Connecting => "connecting",
            TransportState::Open => "open",
            TransportState::CloseSent => "close_sent",
            TransportState::CloseReceived => "close_received",
            TransportState::Closed => "closed",
            TransportState::Aborted => "aborted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lost_states() {
        let lost: Vec<_> = [
            TransportState::Unopened,
            TransportState::Connecting,
            TransportState::Open,
            TransportState::CloseSent,
            TransportState::CloseReceived,
            TransportState::Closed,
            TransportState::Aborted,
        ]
        .into_iter()
        .filter(|s| s.is_lost())
        .collect();
        assert_eq!(
            lost,
            vec![TransportState::CloseReceived, TransportState::Closed, TransportState::Aborted]
        );
    }
}
