//! Unified error type for the Tourney server.

use tourney_protocol::ProtocolError;
use tourney_state::StateError;
use tourney_transport::TransportError;

use crate::ConfigError;

/// Top-level error for everything that crosses the server's API: the
/// builder, the accept loop, connection tasks, and rejected packets.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TourneyError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A packet that breaks a protocol rule, such as a repeated connect.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registration that the state refused.
    #[error(transparent)]
    State(#[from] StateError),

    /// The configuration file could not be read or written.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A socket operation outside the transport failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
