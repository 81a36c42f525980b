//! The tournament world: players, coordinators, and matches.
//!
//! `World` is NOT thread-safe by itself. The [`Hub`](crate::Hub) owns it
//! behind a single mutex so that all three collections change and are
//! read as one unit.

use tourney_protocol::{
    Guid, Identified, Match, MatchCoordinator, Player, State,
};

use crate::{EntityKind, StateError};

/// The authoritative state. Starts with the HOST coordinator only.
#[derive(Debug, Clone)]
pub struct World {
    version: u64,
    players: Vec<Player>,
    coordinators: Vec<MatchCoordinator>,
    matches: Vec<Match>,
}

impl World {
    pub fn new() -> Self {
        Self {
            version: 0,
            players: Vec::new(),
            coordinators: vec![MatchCoordinator::host()],
            matches: Vec::new(),
        }
    }

    /// Number of mutations applied so far.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// A full copy of the current state.
    pub fn snapshot(&self) -> State {
        State {
            version: self.version,
            players: self.players.clone(),
            coordinators: self.coordinators.clone(),
            matches: self.matches.clone(),
        }
    }

    /// Every coordinator identity followed by every player identity,
    /// without duplicates.
    pub fn participants(&self) -> Vec<Guid> {
        let mut ids: Vec<Guid> = Vec::with_capacity(
            self.coordinators.len() + self.players.len(),
        );
        let all = self
            .coordinators
            .iter()
            .map(|c| &c.guid)
            .chain(self.players.iter().map(|p| &p.guid));
        for guid in all {
            if !ids.contains(guid) {
                ids.push(guid.clone());
            }
        }
        ids
    }

    pub fn player(&self, guid: &Guid) -> Option<&Player> {
        self.players.iter().find(|p| p.guid == *guid)
    }

    pub fn coordinator(&self, guid: &Guid) -> Option<&MatchCoordinator> {
        self.coordinators.iter().find(|c| c.guid == *guid)
    }

    pub fn find_match(&self, guid: &Guid) -> Option<&Match> {
        self.matches.iter().find(|m| m.guid == *guid)
    }

    // -- Players --

    pub fn add_player(&mut self, player: Player) -> Result<(), StateError> {
        insert(&mut self.players, player, EntityKind::Player)?;
        self.bump();
        Ok(())
    }

    /// Replaces the stored player with the same identity.
    pub fn update_player(
        &mut self,
        player: Player,
    ) -> Result<(), StateError> {
        replace(&mut self.players, player, EntityKind::Player)?;
        self.bump();
        Ok(())
    }

    pub fn remove_player(
        &mut self,
        guid: &Guid,
    ) -> Result<Player, StateError> {
        let removed = remove(&mut self.players, guid, EntityKind::Player)?;
        self.bump();
        Ok(removed)
    }

    // -- Coordinators --

    pub fn add_coordinator(
        &mut self,
        coordinator: MatchCoordinator,
    ) -> Result<(), StateError> {
        insert(&mut self.coordinators, coordinator, EntityKind::Coordinator)?;
        self.bump();
        Ok(())
    }

    /// Removes a coordinator. The HOST coordinator is never removed.
    pub fn remove_coordinator(
        &mut self,
        guid: &Guid,
    ) -> Result<MatchCoordinator, StateError> {
        if guid.is_host() {
            return Err(StateError::Reserved(guid.clone()));
        }
        let removed =
            remove(&mut self.coordinators, guid, EntityKind::Coordinator)?;
        self.bump();
        Ok(removed)
    }

    // -- Matches --

    pub fn create_match(&mut self, m: Match) -> Result<(), StateError> {
        insert(&mut self.matches, m, EntityKind::Match)?;
        self.bump();
        Ok(())
    }

    pub fn update_match(&mut self, m: Match) -> Result<(), StateError> {
        replace(&mut self.matches, m, EntityKind::Match)?;
        self.bump();
        Ok(())
    }

    pub fn delete_match(&mut self, guid: &Guid) -> Result<Match, StateError> {
        let removed = remove(&mut self.matches, guid, EntityKind::Match)?;
        self.bump();
        Ok(removed)
    }

    fn bump(&mut self) {
        self.version += 1;
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn insert<T: Identified>(
    items: &mut Vec<T>,
    item: T,
    kind: EntityKind,
) -> Result<(), StateError> {
    if items.iter().any(|existing| existing.guid() == item.guid()) {
        return Err(StateError::AlreadyExists {
            kind,
            guid: item.guid().clone(),
        });
    }
    items.push(item);
    Ok(())
}

fn replace<T: Identified>(
    items: &mut [T],
    item: T,
    kind: EntityKind,
) -> Result<(), StateError> {
    match items.iter_mut().find(|existing| existing.guid() == item.guid()) {
        Some(slot) => {
            *slot = item;
            Ok(())
        }
        None => Err(StateError::NotFound {
            kind,
            guid: item.guid().clone(),
        }),
    }
}

fn remove<T: Identified>(
    items: &mut Vec<T>,
    guid: &Guid,
    kind: EntityKind,
) -> Result<T, StateError> {
    let index = items
        .iter()
        .position(|existing| existing.guid() == guid)
        .ok_or_else(|| StateError::NotFound {
            kind,
            guid: guid.clone(),
        })?;
    // `remove`, not `swap_remove`: append order is kept.
    Ok(items.remove(index))
}
