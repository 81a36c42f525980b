//! Addressed send: delivering bytes to connections by identity.
//!
//! Every live connection owns an unbounded outbound queue. Sending only
//! enqueues, so callers never wait on socket I/O; the connection's own
//! task drains the queue onto the wire. A stalled peer therefore just
//! accumulates queued frames here.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::ConnectionId;

/// Receiving half of a connection's outbound queue.
pub type OutboundReceiver = mpsc::UnboundedReceiver<Arc<[u8]>>;

type OutboundSender = mpsc::UnboundedSender<Arc<[u8]>>;

/// Fire-and-forget addressed send.
///
/// Delivery to an unknown or already-closed identity is silently
/// dropped; there is no acknowledgement and no retry.
pub trait Outbound: Send + Sync + 'static {
    /// Queues `data` for one connection.
    fn send(&self, to: &ConnectionId, data: Arc<[u8]>);

    /// Queues the same buffer for every listed connection.
    fn send_many(&self, to: &[ConnectionId], data: Arc<[u8]>) {
        for id in to {
            self.send(id, Arc::clone(&data));
        }
    }
}

impl<T: Outbound + ?Sized> Outbound for Arc<T> {
    fn send(&self, to: &ConnectionId, data: Arc<[u8]>) {
        (**self).send(to, data)
    }

    fn send_many(&self, to: &[ConnectionId], data: Arc<[u8]>) {
        (**self).send_many(to, data)
    }
}

/// Maps live connection identities to their outbound queues.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    senders: Mutex<HashMap<ConnectionId, OutboundSender>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns the queue its task must drain.
    ///
    /// Registering an identity twice replaces the earlier queue; the old
    /// receiver then sees its channel closed.
    pub fn register(&self, id: ConnectionId) -> OutboundReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        if self.lock().insert(id.clone(), tx).is_some() {
            tracing::warn!(%id, "connection identity registered twice");
        }
        rx
    }

    /// Removes a connection. Unknown identities are ignored.
    pub fn unregister(&self, id: &ConnectionId) {
        self.lock().remove(id);
    }

    /// Returns `true` if the identity has a live queue.
    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.lock().contains_key(id)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no connection is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<ConnectionId, OutboundSender>> {
        self.senders.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Outbound for ConnectionRegistry {
    fn send(&self, to: &ConnectionId, data: Arc<[u8]>) {
        let senders = self.lock();
        match senders.get(to) {
            Some(tx) => {
                if tx.send(data).is_err() {
                    tracing::trace!(%to, "outbound queue closed, dropping");
                }
            }
            None => tracing::trace!(%to, "no such connection, dropping"),
        }
    }

    fn send_many(&self, to: &[ConnectionId], data: Arc<[u8]>) {
        let senders = self.lock();
        for id in to {
            if let Some(tx) = senders.get(id) {
                let _ = tx.send(Arc::clone(&data));
            }
        }
    }
}
