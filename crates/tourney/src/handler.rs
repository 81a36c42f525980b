//! Per-connection handler: decode, dispatch, and drain outbound traffic.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The task waits on two things at once:
//!   1. frames from the peer → decoded and handed to the [`Dispatcher`]
//!   2. frames queued for the peer by broadcasts, relays, and replies
//!
//! Inbound packets are therefore processed strictly in receipt order,
//! and all writes to the socket happen here, never under the state lock.
//!
//! [`Dispatcher`]: crate::Dispatcher

use std::sync::Arc;

use tourney_protocol::{Codec, Guid, Packet};
use tourney_transport::{Connection, ConnectionId, WebSocketConnection};

use crate::dispatch::Role;
use crate::server::ServerState;
use crate::TourneyError;

/// Drop guard that unregisters a connection and removes whatever it
/// registered as, even if the handler exits early or panics.
struct ConnectionGuard<C: Codec> {
    conn_id: ConnectionId,
    guid: Guid,
    role: Role,
    state: Arc<ServerState<C>>,
}

impl<C: Codec> Drop for ConnectionGuard<C> {
    fn drop(&mut self) {
        // Unregister first so the leave event is not queued for a
        // connection that is already gone.
        self.state.registry.unregister(&self.conn_id);
        self.state
            .dispatcher
            .on_client_disconnected(&self.guid, &self.role);
        tracing::info!(conn_id = %self.conn_id, "connection closed");
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Codec>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C>>,
) -> Result<(), TourneyError> {
    let conn_id = conn.id().clone();
    let mut outbound = state.registry.register(conn_id.clone());
    let mut guard = ConnectionGuard {
        guid: Guid::from(&conn_id),
        conn_id,
        role: Role::Unidentified,
        state: Arc::clone(&state),
    };
    state.dispatcher.on_client_connected(&guard.guid);

    loop {
        tokio::select! {
            inbound = conn.recv() => {
                let data = match inbound {
                    Ok(Some(data)) => data,
                    Ok(None) => {
                        tracing::debug!(conn_id = %guard.conn_id, "peer closed the connection");
                        break;
                    }
                    Err(e) => {
                        tracing::debug!(conn_id = %guard.conn_id, error = %e, "recv error");
                        break;
                    }
                };

                let packet: Packet = match state.codec.decode(&data) {
                    Ok(packet) => packet,
                    Err(e) => {
                        tracing::error!(
                            conn_id = %guard.conn_id,
                            bytes = data.len(),
                            error = %e,
                            "dropping undecodable packet"
                        );
                        continue;
                    }
                };

                if let Err(e) = state
                    .dispatcher
                    .on_packet_received(&guard.guid, &mut guard.role, packet)
                {
                    tracing::warn!(conn_id = %guard.conn_id, error = %e, "packet rejected");
                }
            }
            queued = outbound.recv() => {
                let Some(bytes) = queued else {
                    // Replaced by a newer registration under the same id.
                    break;
                };
                tracing::trace!(conn_id = %guard.conn_id, bytes = bytes.len(), "sending");
                conn.send(&bytes).await?;
            }
        }
    }

    let _ = conn.close().await;
    // guard drops here → unregister and disconnect fire.
    Ok(())
}
