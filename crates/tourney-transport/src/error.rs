/// Errors raised by the transport layer.
///
/// These never cross into packet handling: a failed send or receive ends
/// the affected connection's task and nothing else.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Writing a frame to the peer failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Reading a frame from the peer failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the listener, accepting a peer, or upgrading it failed.
    /// An upgrade that runs past its deadline reports `TimedOut`.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),
}
