//! Packet routing: the connect handshake and everything after it.
//!
//! The transport layer calls three hooks per connection:
//! [`Dispatcher::on_client_connected`], [`Dispatcher::on_packet_received`]
//! for each decoded packet (in receipt order), and
//! [`Dispatcher::on_client_disconnected`] exactly once at the end.
//!
//! Each connection moves through
//! `Unidentified → Player | Coordinator → (disconnected)`, tracked in a
//! [`Role`] the connection task owns. A connection registers at most
//! once; a second `Connect` is refused and the first role stands.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tourney_protocol::{
    Codec, Connect, ConnectResponse, ConnectType, Event, Guid,
    MatchCoordinator, Packet, PacketBody, Participant, Player,
    ProtocolError, ServerSettings, VERSION, VERSION_CODE,
};
use tourney_state::{Hub, StateError};
use tourney_transport::Outbound;

use crate::TourneyError;

/// Display names with this prefix register under [`Guid::TEST`].
pub const TEST_NAME_PREFIX: &str = "TEST";

/// What a connection has registered as.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Role {
    /// Connected, no successful `Connect` yet.
    #[default]
    Unidentified,
    /// Registered as the player with this identity.
    Player(Guid),
    /// Registered as the coordinator with this identity.
    Coordinator(Guid),
}

impl Role {
    /// The identity registered in the state, if any.
    pub fn guid(&self) -> Option<&Guid> {
        match self {
            Self::Unidentified => None,
            Self::Player(guid) | Self::Coordinator(guid) => Some(guid),
        }
    }
}

/// Interprets inbound packets and drives the [`Hub`].
pub struct Dispatcher<O: Outbound, C: Codec> {
    hub: Arc<Hub<O, C>>,
    server_name: String,
    settings: ServerSettings,
    /// Live connections registered under [`Guid::TEST`].
    test_clients: Mutex<usize>,
}

impl<O: Outbound, C: Codec> Dispatcher<O, C> {
    pub fn new(
        hub: Arc<Hub<O, C>>,
        server_name: impl Into<String>,
        settings: ServerSettings,
    ) -> Self {
        Self {
            hub,
            server_name: server_name.into(),
            settings,
            test_clients: Mutex::new(0),
        }
    }

    pub fn hub(&self) -> &Arc<Hub<O, C>> {
        &self.hub
    }

    /// Nothing happens until the client sends `Connect`.
    pub fn on_client_connected(&self, conn: &Guid) {
        tracing::debug!(%conn, "client connected");
    }

    /// Handles one packet from `conn`.
    ///
    /// An error means the packet was rejected; the client has already
    /// been told where the protocol calls for it. Nothing here fails the
    /// connection, and irrelevant packets are logged and dropped.
    pub fn on_packet_received(
        &self,
        conn: &Guid,
        role: &mut Role,
        packet: Packet,
    ) -> Result<(), TourneyError> {
        tracing::debug!(
            %conn,
            id = packet.id,
            kind = %packet.kind(),
            detail = %packet.body.describe(),
            "received packet"
        );

        let Packet { id, from, body } = packet;
        match body {
            PacketBody::Connect(connect) => {
                return self.handle_connect(conn, role, connect);
            }
            PacketBody::Event(event) => self.handle_event(event),
            PacketBody::SongFinished(result) => {
                self.hub.song_finished(id, from, result)
            }
            PacketBody::ForwardedPacket(forwarded) => {
                self.hub
                    .forward(&forwarded.forward_to, *forwarded.body, from)
            }
            PacketBody::SongList(_) | PacketBody::LoadedSong(_) => {
                tracing::debug!(%conn, "song info received, no server-side effect");
            }
            other @ (PacketBody::ConnectResponse(_)
            | PacketBody::State(_)
            | PacketBody::LoadSong(_)
            | PacketBody::PlaySong(_)
            | PacketBody::Command(_)
            | PacketBody::Acknowledgement(_)
            | PacketBody::File(_)) => {
                tracing::debug!(
                    %conn,
                    kind = %other.kind(),
                    "packet addressed to the server directly, ignoring"
                );
            }
        }
        Ok(())
    }

    /// Removes whatever `conn` registered as.
    ///
    /// Players are checked before coordinators. A connection that never
    /// registered, or whose entity is already gone, changes nothing. The
    /// shared test identity is removed only when its last connection
    /// leaves.
    pub fn on_client_disconnected(&self, conn: &Guid, role: &Role) {
        let guid = role.guid().unwrap_or(conn);

        // Held through the removal; test registration takes it too.
        let _test_clients = match role {
            Role::Player(id) if *id == Guid::TEST => {
                let mut live = self.test_clients();
                *live = live.saturating_sub(1);
                if *live > 0 {
                    tracing::debug!(
                        %conn,
                        remaining = *live,
                        "test identity still in use"
                    );
                    return;
                }
                Some(live)
            }
            _ => None,
        };

        if let Some(player) = self.hub.player(guid) {
            self.hub.remove_player(player);
        } else if let Some(coordinator) = self.hub.coordinator(guid) {
            if !coordinator.guid.is_host() {
                self.hub.remove_coordinator(coordinator);
            }
        } else {
            tracing::debug!(%conn, "disconnected without a registered entity");
        }
    }

    fn handle_connect(
        &self,
        conn: &Guid,
        role: &mut Role,
        connect: Connect,
    ) -> Result<(), TourneyError> {
        if let Some(registered) = role.guid() {
            let err = ProtocolError::InvalidMessage(format!(
                "connection is already registered as {registered}"
            ));
            self.refuse(conn, err.to_string());
            return Err(err.into());
        }

        if connect.client_version < VERSION_CODE {
            tracing::info!(
                %conn,
                client_version = connect.client_version,
                server_version = VERSION_CODE,
                "refusing outdated client"
            );
            self.refuse(
                conn,
                format!("Version mismatch, this server is on version {VERSION}"),
            );
            return Ok(());
        }

        let registered = match connect.client_type {
            ConnectType::Player => self.register_player(conn, connect.name),
            ConnectType::Coordinator => {
                self.register_coordinator(conn, connect.name)
            }
        };

        match registered {
            Ok((new_role, entity)) => {
                *role = new_role;
                self.welcome(conn, entity);
                Ok(())
            }
            Err(e) => {
                self.refuse(conn, e.to_string());
                Err(e.into())
            }
        }
    }

    fn register_player(
        &self,
        conn: &Guid,
        name: String,
    ) -> Result<(Role, Participant), StateError> {
        let guid = if name.starts_with(TEST_NAME_PREFIX) {
            Guid::TEST
        } else {
            conn.clone()
        };
        let player = Player::new(guid.clone(), name);

        if guid == Guid::TEST {
            // Test clients share one identity; a later one takes over the
            // existing entry instead of duplicating it.
            let mut live = self.test_clients();
            if self.hub.player(&guid).is_some() {
                self.hub.update_player(player.clone())?;
            } else {
                self.hub.add_player(player.clone())?;
            }
            *live += 1;
        } else {
            self.hub.add_player(player.clone())?;
        }
        Ok((Role::Player(guid), Participant::Player(player)))
    }

    fn register_coordinator(
        &self,
        conn: &Guid,
        name: String,
    ) -> Result<(Role, Participant), StateError> {
        let coordinator = MatchCoordinator::new(conn.clone(), name);
        self.hub.add_coordinator(coordinator.clone())?;
        Ok((
            Role::Coordinator(conn.clone()),
            Participant::Coordinator(coordinator),
        ))
    }

    /// Response first, then the full snapshot.
    fn welcome(&self, conn: &Guid, entity: Participant) {
        let response = ConnectResponse::success(
            entity,
            self.settings,
            format!("Connected to {}!", self.server_name),
            VERSION_CODE,
        );
        self.hub.send_to(conn, PacketBody::ConnectResponse(response));
        self.hub.send_to(conn, PacketBody::State(self.hub.snapshot()));
    }

    fn refuse(&self, conn: &Guid, message: String) {
        let response = ConnectResponse::failure(message, VERSION_CODE);
        self.hub.send_to(conn, PacketBody::ConnectResponse(response));
    }

    fn test_clients(&self) -> MutexGuard<'_, usize> {
        self.test_clients
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn handle_event(&self, event: Event) {
        // Failures are already logged by the hub.
        match event {
            Event::PlayerAdded(player) => {
                let _ = self.hub.add_player(player);
            }
            Event::PlayerUpdated(player) => {
                let _ = self.hub.update_player(player);
            }
            Event::PlayerLeft(player) => {
                self.hub.remove_player(player);
            }
            Event::CoordinatorAdded(coordinator) => {
                let _ = self.hub.add_coordinator(coordinator);
            }
            Event::CoordinatorLeft(coordinator) => {
                self.hub.remove_coordinator(coordinator);
            }
            Event::MatchCreated(m) => {
                let _ = self.hub.create_match(m);
            }
            Event::MatchUpdated(m) => {
                let _ = self.hub.update_match(m);
            }
            Event::MatchDeleted(m) => {
                self.hub.delete_match(m);
            }
        }
    }
}
