//! Transport abstraction layer for Tourney.
//!
//! Provides the [`Transport`], [`Incoming`], and [`Connection`] traits
//! that abstract over the network protocol carrying framed byte buffers,
//! plus the
//! [`Outbound`] addressed-send primitive the server core uses to reach
//! connected parties by identity.
//!
//! # Feature Flags
//!
//! - `websocket` (default) — WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
mod registry;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use registry::{ConnectionRegistry, Outbound, OutboundReceiver};
#[cfg(feature = "websocket")]
pub use websocket::{
    WebSocketConnection, WebSocketIncoming, WebSocketTransport,
    HANDSHAKE_TIMEOUT,
};

use std::fmt;
use std::net::SocketAddr;

/// Stable identity token assigned to a connection when it is accepted.
///
/// The core reuses this token as the identity of the player or
/// coordinator that registers over the connection, so it is a string
/// rather than a counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Wraps an existing identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random identity: 32 lowercase hex characters
    /// (128 bits).
    pub fn generate() -> Self {
        use rand::Rng;
        let bytes: [u8; 16] = rand::rng().random();
        Self(bytes.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Borrows the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the underlying string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// A peer accepted at the socket level, not yet usable.
    type Incoming: Incoming<Connection = Self::Connection, Error = Self::Error>;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next peer.
    ///
    /// Returns as soon as the socket is accepted. Any protocol handshake
    /// happens in [`Incoming::establish`], so one slow peer never holds
    /// up the next accept.
    async fn accept(&mut self) -> Result<Self::Incoming, Self::Error>;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;

    /// Gracefully shuts down the transport, stopping new connections.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A peer that has been accepted but has not finished its handshake.
pub trait Incoming: Send + 'static {
    /// The connection this peer becomes once established.
    type Connection: Connection;
    /// The error type for a failed handshake.
    type Error: std::error::Error + Send + Sync;

    /// Identity the connection will carry once established.
    fn id(&self) -> &ConnectionId;

    /// Completes the handshake.
    async fn establish(self) -> Result<Self::Connection, Self::Error>;
}

/// A single connection that can send and receive framed bytes.
///
/// Sending and receiving must be usable concurrently: a connection task
/// waits on `recv` while queued outbound data is written with `send`.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends data to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the identity assigned to this connection.
    fn id(&self) -> &ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new("abc");
        assert_eq!(id.as_str(), "abc");
        assert_eq!(id.into_inner(), "abc");
    }

    #[test]
    fn test_connection_id_display_is_raw_token() {
        let id = ConnectionId::new("c-7");
        assert_eq!(id.to_string(), "c-7");
    }

    #[test]
    fn test_generated_ids_are_hex_and_distinct() {
        let a = ConnectionId::generate();
        let b = ConnectionId::generate();
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_connection_id_hash_works_as_map_key() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ConnectionId::new("1"), "alice");
        map.insert(ConnectionId::new("2"), "bob");
        assert_eq!(map[&ConnectionId::new("1")], "alice");
    }
}
