//! The tournament model: who is present and what matches exist.
//!
//! Everything here travels on the wire, either inside an [`Event`]
//! (one changed entity) or wholesale as a [`State`] snapshot.
//!
//! [`Event`]: crate::Event

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};
use tourney_transport::ConnectionId;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Globally unique identity of a player, coordinator, or match.
///
/// Players and coordinators reuse the identity of the connection they
/// registered over; matches are named by the coordinator that creates
/// them. Serialized as a plain string.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Guid(Cow<'static, str>);

impl Guid {
    /// The server's own synthetic coordinator.
    pub const HOST: Guid = Guid(Cow::Borrowed("0"));

    /// Shared identity of automated test clients.
    pub const TEST: Guid = Guid(Cow::Borrowed("test"));

    /// Wraps an identity string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(Cow::Owned(id.into()))
    }

    /// Borrows the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the reserved HOST identity.
    pub fn is_host(&self) -> bool {
        *self == Self::HOST
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Guid {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<&ConnectionId> for Guid {
    fn from(id: &ConnectionId) -> Self {
        Self::new(id.as_str())
    }
}

impl From<&Guid> for ConnectionId {
    fn from(guid: &Guid) -> Self {
        ConnectionId::new(guid.as_str())
    }
}

/// Anything stored in a [`State`] collection, keyed by its identity.
pub trait Identified {
    /// The entity's immutable identity.
    fn guid(&self) -> &Guid;
}

// ---------------------------------------------------------------------------
// Players
// ---------------------------------------------------------------------------

/// Where a player is in fetching the currently selected song.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
pub enum DownloadState {
    #[default]
    None,
    Downloading,
    Downloaded,
    DownloadError,
}

/// Whether a player is idle or inside a song.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
pub enum PlayState {
    #[default]
    Waiting,
    InGame,
}

/// One competing participant. Exists only while connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub guid: Guid,
    pub name: String,
    #[serde(default)]
    pub download_state: DownloadState,
    #[serde(default)]
    pub play_state: PlayState,
    #[serde(default)]
    pub score: i32,
}

impl Player {
    /// A freshly connected player: nothing downloaded, waiting, no score.
    pub fn new(guid: Guid, name: impl Into<String>) -> Self {
        Self {
            guid,
            name: name.into(),
            download_state: DownloadState::None,
            play_state: PlayState::Waiting,
            score: 0,
        }
    }
}

impl Identified for Player {
    fn guid(&self) -> &Guid {
        &self.guid
    }
}

/// A controlling client allowed to manage matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchCoordinator {
    pub guid: Guid,
    pub name: String,
}

impl MatchCoordinator {
    pub fn new(guid: Guid, name: impl Into<String>) -> Self {
        Self {
            guid,
            name: name.into(),
        }
    }

    /// The server's own coordinator, present for the whole process
    /// lifetime.
    pub fn host() -> Self {
        Self::new(Guid::HOST, "HOST")
    }
}

impl Identified for MatchCoordinator {
    fn guid(&self) -> &Guid {
        &self.guid
    }
}

// ---------------------------------------------------------------------------
// Matches
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
pub enum BeatmapDifficulty {
    #[default]
    Easy,
    Normal,
    Hard,
    Expert,
    ExpertPlus,
}

impl fmt::Display for BeatmapDifficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Minimal description of a song as shown in lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewBeatmapLevel {
    pub level_id: String,
    pub name: String,
}

/// A group of players playing the same chart, run by a coordinator.
///
/// Created, replaced, and deleted only by explicit coordinator action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub guid: Guid,
    /// Member player identities.
    #[serde(default)]
    pub players: Vec<Guid>,
    /// The coordinator running the match.
    #[serde(default)]
    pub leader: Option<Guid>,
    #[serde(default)]
    pub selected_level: Option<PreviewBeatmapLevel>,
    #[serde(default)]
    pub selected_characteristic: Option<String>,
    #[serde(default)]
    pub selected_difficulty: BeatmapDifficulty,
}

impl Match {
    /// An empty match with nothing selected.
    pub fn new(guid: Guid) -> Self {
        Self {
            guid,
            players: Vec::new(),
            leader: None,
            selected_level: None,
            selected_characteristic: None,
            selected_difficulty: BeatmapDifficulty::default(),
        }
    }
}

impl Identified for Match {
    fn guid(&self) -> &Guid {
        &self.guid
    }
}

// ---------------------------------------------------------------------------
// Settings and State
// ---------------------------------------------------------------------------

/// Server-wide feature flags pushed to every client on connect.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default,
)]
pub struct ServerSettings {
    pub teams: bool,
    pub tournament_mode: bool,
}

/// The aggregate root every client mirrors.
///
/// Sequences keep append order. Identities are unique within each
/// sequence. `version` increases by one with every applied mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct State {
    #[serde(default)]
    pub version: u64,
    pub players: Vec<Player>,
    pub coordinators: Vec<MatchCoordinator>,
    pub matches: Vec<Match>,
}

impl State {
    pub fn player(&self, guid: &Guid) -> Option<&Player> {
        self.players.iter().find(|p| p.guid == *guid)
    }

    pub fn coordinator(&self, guid: &Guid) -> Option<&MatchCoordinator> {
        self.coordinators.iter().find(|c| c.guid == *guid)
    }

    pub fn find_match(&self, guid: &Guid) -> Option<&Match> {
        self.matches.iter().find(|m| m.guid == *guid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_serializes_as_plain_string() {
        let json = serde_json::to_string(&Guid::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
        let back: Guid = serde_json::from_str("\"0\"").unwrap();
        assert!(back.is_host());
    }

    #[test]
    fn test_guid_connection_id_conversions_preserve_text() {
        let conn = ConnectionId::new("f00d");
        let guid = Guid::from(&conn);
        assert_eq!(guid.as_str(), "f00d");
        assert_eq!(ConnectionId::from(&guid), conn);
    }

    #[test]
    fn test_reserved_guids() {
        assert_eq!(Guid::HOST.as_str(), "0");
        assert_eq!(Guid::TEST.as_str(), "test");
        assert_eq!(Guid::new("0"), Guid::HOST);
    }

    #[test]
    fn test_new_player_defaults() {
        let p = Player::new(Guid::new("p1"), "Alice");
        assert_eq!(p.download_state, DownloadState::None);
        assert_eq!(p.play_state, PlayState::Waiting);
        assert_eq!(p.score, 0);
    }

    #[test]
    fn test_player_missing_status_fields_use_defaults() {
        let p: Player =
            serde_json::from_str(r#"{"guid":"p1","name":"Alice"}"#).unwrap();
        assert_eq!(p, Player::new(Guid::new("p1"), "Alice"));
    }

    #[test]
    fn test_host_coordinator() {
        let host = MatchCoordinator::host();
        assert!(host.guid.is_host());
        assert_eq!(host.name, "HOST");
    }

    #[test]
    fn test_match_minimal_json_uses_defaults() {
        let m: Match = serde_json::from_str(r#"{"guid":"m1"}"#).unwrap();
        assert_eq!(m, Match::new(Guid::new("m1")));
        assert_eq!(m.selected_difficulty, BeatmapDifficulty::Easy);
    }

    #[test]
    fn test_state_lookups() {
        let state = State {
            version: 3,
            players: vec![Player::new(Guid::new("p1"), "A")],
            coordinators: vec![MatchCoordinator::host()],
            matches: vec![Match::new(Guid::new("m1"))],
        };
        assert!(state.player(&Guid::new("p1")).is_some());
        assert!(state.player(&Guid::new("p2")).is_none());
        assert!(state.coordinator(&Guid::HOST).is_some());
        assert!(state.find_match(&Guid::new("m1")).is_some());
    }
}
