//! Mutation, broadcast, and relay.
//!
//! The [`Hub`] is the only way to change the [`World`]. Every mutator
//! follows the same shape:
//!
//! 1. lock the world, apply the change, unlock (inside [`Hub::mutate`])
//! 2. broadcast the matching [`Event`] to every participant
//! 3. notify local subscribers
//!
//! Steps 2 and 3 run with the lock released. Sends only enqueue onto
//! per-connection queues, so no socket I/O ever happens under the lock
//! either way.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tourney_protocol::{
    Codec, Event, Guid, Match, MatchCoordinator, Packet, PacketBody, Player,
    SongFinished, State,
};
use tourney_transport::{ConnectionId, Outbound};

use crate::{Notification, StateError, World};

/// Capacity of the local notification channel. Slow subscribers lag
/// and skip ahead rather than block publishers.
const NOTIFICATION_CAPACITY: usize = 256;

/// Owns the authoritative world and fans changes out to participants.
///
/// `O` delivers bytes to connections by identity; `C` turns packets into
/// bytes. All methods take `&self`, so a hub is shared behind an `Arc`
/// and called from any number of connection tasks in parallel.
pub struct Hub<O: Outbound, C: Codec> {
    world: Mutex<World>,
    outbound: O,
    codec: C,
    next_packet_id: AtomicU64,
    notifications: broadcast::Sender<Notification>,
}

impl<O: Outbound, C: Codec> Hub<O, C> {
    /// Creates a hub around a fresh world (HOST coordinator only).
    pub fn new(outbound: O, codec: C) -> Self {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Self {
            world: Mutex::new(World::new()),
            outbound,
            codec,
            next_packet_id: AtomicU64::new(1),
            notifications,
        }
    }

    // -- Reads --

    /// A full copy of the current state.
    pub fn snapshot(&self) -> State {
        self.lock().snapshot()
    }

    pub fn version(&self) -> u64 {
        self.lock().version()
    }

    pub fn player(&self, guid: &Guid) -> Option<Player> {
        self.lock().player(guid).cloned()
    }

    pub fn coordinator(&self, guid: &Guid) -> Option<MatchCoordinator> {
        self.lock().coordinator(guid).cloned()
    }

    pub fn find_match(&self, guid: &Guid) -> Option<Match> {
        self.lock().find_match(guid).cloned()
    }

    /// Subscribes to changes as they are published.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    // -- Players --

    pub fn add_player(&self, player: Player) -> Result<(), StateError> {
        self.mutate(|world| world.add_player(player.clone()))?;
        tracing::info!(guid = %player.guid, name = %player.name, "player added");
        self.publish(Event::PlayerAdded(player));
        Ok(())
    }

    /// Replaces the player that has the same identity.
    pub fn update_player(&self, player: Player) -> Result<(), StateError> {
        self.mutate(|world| world.update_player(player.clone()))?;
        self.publish(Event::PlayerUpdated(player));
        Ok(())
    }

    /// Removes the player with `player`'s identity. Returns `false`, and
    /// publishes nothing, if no such player exists.
    pub fn remove_player(&self, player: Player) -> bool {
        if self.mutate(|world| world.remove_player(&player.guid)).is_err() {
            return false;
        }
        tracing::info!(guid = %player.guid, name = %player.name, "player left");
        self.publish(Event::PlayerLeft(player));
        true
    }

    // -- Coordinators --

    pub fn add_coordinator(
        &self,
        coordinator: MatchCoordinator,
    ) -> Result<(), StateError> {
        self.mutate(|world| world.add_coordinator(coordinator.clone()))?;
        tracing::info!(
            guid = %coordinator.guid,
            name = %coordinator.name,
            "coordinator added"
        );
        self.publish(Event::CoordinatorAdded(coordinator));
        Ok(())
    }

    /// Removes a coordinator. Matches it leads are left untouched.
    pub fn remove_coordinator(&self, coordinator: MatchCoordinator) -> bool {
        if self
            .mutate(|world| world.remove_coordinator(&coordinator.guid))
            .is_err()
        {
            return false;
        }
        tracing::info!(
            guid = %coordinator.guid,
            name = %coordinator.name,
            "coordinator left"
        );
        self.publish(Event::CoordinatorLeft(coordinator));
        true
    }

    // -- Matches --

    pub fn create_match(&self, m: Match) -> Result<(), StateError> {
        self.mutate(|world| world.create_match(m.clone()))?;
        tracing::info!(guid = %m.guid, "match created");
        self.publish(Event::MatchCreated(m));
        Ok(())
    }

    pub fn update_match(&self, m: Match) -> Result<(), StateError> {
        self.mutate(|world| world.update_match(m.clone()))?;
        self.publish(Event::MatchUpdated(m));
        Ok(())
    }

    pub fn delete_match(&self, m: Match) -> bool {
        if self.mutate(|world| world.delete_match(&m.guid)).is_err() {
            return false;
        }
        tracing::info!(guid = %m.guid, "match deleted");
        self.publish(Event::MatchDeleted(m));
        true
    }

    // -- Sending --

    /// Encodes `packet` once and queues it for every coordinator and
    /// player present right now.
    pub fn broadcast_to_all(&self, packet: &Packet) {
        let targets: Vec<ConnectionId> = self
            .lock()
            .participants()
            .iter()
            .map(ConnectionId::from)
            .collect();

        let Some(bytes) = self.encode(packet) else {
            return;
        };
        tracing::debug!(
            kind = %packet.kind(),
            detail = %packet.body.describe(),
            targets = targets.len(),
            "broadcasting"
        );
        self.outbound.send_many(&targets, bytes);
    }

    /// Sends a server-originated packet to one participant.
    pub fn send_to(&self, to: &Guid, body: PacketBody) {
        let packet = Packet::new(self.next_id(), Guid::HOST, body);
        if let Some(bytes) = self.encode(&packet) {
            tracing::debug!(%to, kind = %packet.kind(), "sending");
            self.outbound.send(&ConnectionId::from(to), bytes);
        }
    }

    /// Relays `body` to exactly the listed identities.
    ///
    /// The body is re-wrapped with a fresh packet id and `from` kept as
    /// the relaying party. Nothing is validated and nothing in the
    /// world changes.
    pub fn forward(&self, to: &[Guid], body: PacketBody, from: Guid) {
        let packet = Packet::new(self.next_id(), from, body);
        let Some(bytes) = self.encode(&packet) else {
            return;
        };
        let targets: Vec<ConnectionId> =
            to.iter().map(ConnectionId::from).collect();
        tracing::debug!(
            from = %packet.from,
            kind = %packet.kind(),
            targets = targets.len(),
            "forwarding"
        );
        self.outbound.send_many(&targets, bytes);
    }

    /// Re-broadcasts a song result unchanged and notifies local
    /// subscribers. The result is not stored.
    pub fn song_finished(&self, id: u64, from: Guid, result: SongFinished) {
        let packet =
            Packet::new(id, from, PacketBody::SongFinished(result.clone()));
        self.broadcast_to_all(&packet);
        let _ = self.notifications.send(Notification::SongFinished(result));
    }

    /// Next id for a server-originated packet.
    pub fn next_id(&self) -> u64 {
        self.next_packet_id.fetch_add(1, Ordering::Relaxed)
    }

    // -- Internals --

    /// Applies `op` to the world under the lock. The guard never
    /// outlives this call.
    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut World) -> Result<T, StateError>,
    ) -> Result<T, StateError> {
        let result = {
            let mut world = self.lock();
            op(&mut world)
        };
        if let Err(e) = &result {
            tracing::warn!(error = %e, "state mutation rejected");
        }
        result
    }

    fn publish(&self, event: Event) {
        let packet = Packet::new(
            self.next_id(),
            Guid::HOST,
            PacketBody::Event(event.clone()),
        );
        self.broadcast_to_all(&packet);
        // No subscribers is fine.
        let _ = self.notifications.send(Notification::Event(event));
    }

    fn encode(&self, packet: &Packet) -> Option<Arc<[u8]>> {
        match self.codec.encode(packet) {
            Ok(bytes) => Some(Arc::from(bytes)),
            Err(e) => {
                tracing::warn!(kind = %packet.kind(), error = %e, "failed to encode packet");
                None
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, World> {
        self.world.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tourney_protocol::JsonCodec;
    use tourney_transport::ConnectionRegistry;

    fn hub() -> (Arc<ConnectionRegistry>, Hub<Arc<ConnectionRegistry>, JsonCodec>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let hub = Hub::new(Arc::clone(&registry), JsonCodec);
        (registry, hub)
    }

    #[test]
    fn test_packet_ids_increase() {
        let (_, hub) = hub();
        let a = hub.next_id();
        let b = hub.next_id();
        assert!(b > a);
    }

    #[test]
    fn test_failed_mutation_publishes_nothing() {
        let (registry, hub) = hub();
        let mut rx = registry.register(ConnectionId::new("p1"));
        hub.add_player(Player::new(Guid::new("p1"), "A")).unwrap();
        let _ = rx.try_recv();

        let err = hub.add_player(Player::new(Guid::new("p1"), "A"));

        assert!(err.is_err());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_subscriber_sees_event_after_mutation() {
        let (_, hub) = hub();
        let mut notifications = hub.subscribe();

        hub.create_match(Match::new(Guid::new("m1"))).unwrap();

        let got = notifications.recv().await.unwrap();
        assert_eq!(
            got,
            Notification::Event(Event::MatchCreated(Match::new(Guid::new("m1"))))
        );
    }

    #[test]
    fn test_remove_host_is_refused() {
        let (_, hub) = hub();
        assert!(!hub.remove_coordinator(MatchCoordinator::host()));
        assert!(hub.coordinator(&Guid::HOST).is_some());
    }
}
