//! The wire envelope and its tagged-union payloads.
//!
//! Every frame on the wire is one [`Packet`]. The body is adjacently
//! tagged so the JSON reads `{"type": "Event", "data": {...}}`, and the
//! set of tags is closed: an unknown tag fails to decode.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    BeatmapDifficulty, Guid, Match, MatchCoordinator, Player,
    PreviewBeatmapLevel, ServerSettings, State,
};

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// One framed message: an identifier, the sender, and exactly one body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Assigned by the sender; the server numbers its own packets
    /// monotonically.
    pub id: u64,
    /// Identity of the party that produced the packet.
    pub from: Guid,
    pub body: PacketBody,
}

impl Packet {
    pub fn new(id: u64, from: Guid, body: PacketBody) -> Self {
        Self { id, from, body }
    }

    /// The tag of the body.
    pub fn kind(&self) -> PacketKind {
        self.body.kind()
    }
}

/// Discriminant of [`PacketBody`], for logging and routing decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Connect,
    ConnectResponse,
    Event,
    State,
    SongList,
    LoadSong,
    LoadedSong,
    PlaySong,
    SongFinished,
    Command,
    ForwardedPacket,
    Acknowledgement,
    File,
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// The payload of a [`Packet`], one variant per packet kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PacketBody {
    Connect(Connect),
    ConnectResponse(ConnectResponse),
    Event(Event),
    /// A full snapshot, sent to a party right after it connects.
    State(State),
    SongList(SongList),
    LoadSong(LoadSong),
    LoadedSong(LoadedSong),
    PlaySong(PlaySong),
    SongFinished(SongFinished),
    Command(Command),
    ForwardedPacket(ForwardedPacket),
    Acknowledgement(Acknowledgement),
    File(File),
}

impl PacketBody {
    pub fn kind(&self) -> PacketKind {
        match self {
            Self::Connect(_) => PacketKind::Connect,
            Self::ConnectResponse(_) => PacketKind::ConnectResponse,
            Self::Event(_) => PacketKind::Event,
            Self::State(_) => PacketKind::State,
            Self::SongList(_) => PacketKind::SongList,
            Self::LoadSong(_) => PacketKind::LoadSong,
            Self::LoadedSong(_) => PacketKind::LoadedSong,
            Self::PlaySong(_) => PacketKind::PlaySong,
            Self::SongFinished(_) => PacketKind::SongFinished,
            Self::Command(_) => PacketKind::Command,
            Self::ForwardedPacket(_) => PacketKind::ForwardedPacket,
            Self::Acknowledgement(_) => PacketKind::Acknowledgement,
            Self::File(_) => PacketKind::File,
        }
    }

    /// Short human-readable detail for traffic logs. Empty when the kind
    /// alone says enough.
    pub fn describe(&self) -> String {
        match self {
            Self::Event(event) => event.describe(),
            Self::PlaySong(play) => format!(
                "{} : {}",
                play.beatmap.level_id, play.beatmap.difficulty
            ),
            Self::LoadSong(load) => load.level_id.clone(),
            Self::Command(cmd) => format!("{:?}", cmd.command_type),
            Self::ForwardedPacket(fwd) => format!(
                "{} -> {} target(s)",
                fwd.body.kind(),
                fwd.forward_to.len()
            ),
            _ => String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Handshake
// ---------------------------------------------------------------------------

/// The role a client asks for when it connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectType {
    Player,
    Coordinator,
}

/// Client → Server: the first packet on a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connect {
    pub client_version: u32,
    pub client_type: ConnectType,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    Success,
    Fail,
}

/// The entity the server created for a connecting client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entity")]
pub enum Participant {
    Player(Player),
    Coordinator(MatchCoordinator),
}

impl Participant {
    pub fn guid(&self) -> &Guid {
        match self {
            Self::Player(p) => &p.guid,
            Self::Coordinator(c) => &c.guid,
        }
    }
}

/// Server → Client: outcome of a [`Connect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResponse {
    pub result: ResponseType,
    /// The caller's own entity; absent on failure.
    #[serde(rename = "self")]
    pub self_entity: Option<Participant>,
    pub settings: Option<ServerSettings>,
    pub message: String,
    pub server_version: u32,
}

impl ConnectResponse {
    pub fn success(
        self_entity: Participant,
        settings: ServerSettings,
        message: impl Into<String>,
        server_version: u32,
    ) -> Self {
        Self {
            result: ResponseType::Success,
            self_entity: Some(self_entity),
            settings: Some(settings),
            message: message.into(),
            server_version,
        }
    }

    pub fn failure(message: impl Into<String>, server_version: u32) -> Self {
        Self {
            result: ResponseType::Fail,
            self_entity: None,
            settings: None,
            message: message.into(),
            server_version,
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Event tag without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    PlayerAdded,
    PlayerUpdated,
    PlayerLeft,
    CoordinatorAdded,
    CoordinatorLeft,
    MatchCreated,
    MatchUpdated,
    MatchDeleted,
}

/// One state change already applied by the server.
///
/// The variant fixes the type of the changed object, so a `MatchUpdated`
/// can never carry a `Player`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "changed_object")]
pub enum Event {
    PlayerAdded(Player),
    PlayerUpdated(Player),
    PlayerLeft(Player),
    CoordinatorAdded(MatchCoordinator),
    CoordinatorLeft(MatchCoordinator),
    MatchCreated(Match),
    MatchUpdated(Match),
    MatchDeleted(Match),
}

impl Event {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::PlayerAdded(_) => EventType::PlayerAdded,
            Self::PlayerUpdated(_) => EventType::PlayerUpdated,
            Self::PlayerLeft(_) => EventType::PlayerLeft,
            Self::CoordinatorAdded(_) => EventType::CoordinatorAdded,
            Self::CoordinatorLeft(_) => EventType::CoordinatorLeft,
            Self::MatchCreated(_) => EventType::MatchCreated,
            Self::MatchUpdated(_) => EventType::MatchUpdated,
            Self::MatchDeleted(_) => EventType::MatchDeleted,
        }
    }

    /// Identity of the changed object.
    pub fn changed_guid(&self) -> &Guid {
        match self {
            Self::PlayerAdded(p)
            | Self::PlayerUpdated(p)
            | Self::PlayerLeft(p) => &p.guid,
            Self::CoordinatorAdded(c) | Self::CoordinatorLeft(c) => &c.guid,
            Self::MatchCreated(m)
            | Self::MatchUpdated(m)
            | Self::MatchDeleted(m) => &m.guid,
        }
    }

    /// Log detail: the event type, plus player status for
    /// `PlayerUpdated` and the selected difficulty for `MatchUpdated`.
    pub fn describe(&self) -> String {
        match self {
            Self::PlayerUpdated(p) => format!(
                "PlayerUpdated from ({} : {:?}) : ({:?} : {})",
                p.name, p.download_state, p.play_state, p.score
            ),
            Self::MatchUpdated(m) => {
                format!("MatchUpdated ({})", m.selected_difficulty)
            }
            other => format!("{:?}", other.event_type()),
        }
    }
}

// ---------------------------------------------------------------------------
// Song flow (carried, not interpreted)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Beatmap {
    pub level_id: String,
    pub characteristic: String,
    pub difficulty: BeatmapDifficulty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongList {
    pub levels: Vec<PreviewBeatmapLevel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSong {
    pub level_id: String,
    #[serde(default)]
    pub custom_host_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedSong {
    pub level: PreviewBeatmapLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaySong {
    pub beatmap: Beatmap,
    /// Gameplay modifiers and player settings, opaque to the server.
    #[serde(default)]
    pub options: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongFinished {
    pub player: Player,
    pub beatmap: Beatmap,
    pub score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandType {
    Heartbeat,
    ReturnToMenu,
    ScreenOverlayShowPng,
    DelayTestFinish,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub command_type: CommandType,
}

// ---------------------------------------------------------------------------
// Relay and file transfer
// ---------------------------------------------------------------------------

/// A body addressed to specific parties, relayed blindly by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardedPacket {
    pub forward_to: Vec<Guid>,
    pub body: Box<PacketBody>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcknowledgementType {
    FileDownloaded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgement {
    /// Id of the packet being acknowledged.
    pub packet_id: u64,
    pub kind: AcknowledgementType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileIntent {
    None,
    SetPngToShowWhenTriggered,
    ShowPngImmediately,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub file_id: String,
    pub intent: FileIntent,
    #[serde(default)]
    pub compressed: bool,
    pub data: Vec<u8>,
}

#[cfg(test)]
mod tests {
    //! JSON shape checks. Clients parse these by tag, so the tag layout
    //! is part of the protocol.

    use super::*;

    fn player() -> Player {
        Player::new(Guid::new("p1"), "Alice")
    }

    #[test]
    fn test_packet_body_is_adjacently_tagged() {
        let body = PacketBody::Connect(Connect {
            client_version: 3,
            client_type: ConnectType::Coordinator,
            name: "Ref".into(),
        });
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["type"], "Connect");
        assert_eq!(json["data"]["client_version"], 3);
        assert_eq!(json["data"]["client_type"], "Coordinator");
    }

    #[test]
    fn test_event_json_format() {
        let event = Event::PlayerAdded(player());
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event_type"], "PlayerAdded");
        assert_eq!(json["changed_object"]["guid"], "p1");
        assert_eq!(json["changed_object"]["name"], "Alice");
    }

    #[test]
    fn test_event_with_mismatched_object_fails_to_decode() {
        // The changed object must decode as a Match, which needs a guid.
        let wrong = r#"{"event_type":"MatchUpdated","changed_object":{"name":"x"}}"#;
        assert!(serde_json::from_str::<Event>(wrong).is_err());
    }

    #[test]
    fn test_unknown_event_type_fails_to_decode() {
        let unknown =
            r#"{"event_type":"PlayerTeleported","changed_object":{}}"#;
        assert!(serde_json::from_str::<Event>(unknown).is_err());
    }

    #[test]
    fn test_unknown_packet_tag_fails_to_decode() {
        let unknown = r#"{"id":1,"from":"a","body":{"type":"FlyToMoon","data":{}}}"#;
        assert!(serde_json::from_str::<Packet>(unknown).is_err());
    }

    #[test]
    fn test_connect_response_self_field_name() {
        let resp = ConnectResponse::success(
            Participant::Player(player()),
            ServerSettings::default(),
            "hi",
            7,
        );
        let json = serde_json::to_value(&resp).unwrap();

        assert_eq!(json["result"], "Success");
        assert_eq!(json["self"]["kind"], "Player");
        assert_eq!(json["self"]["entity"]["guid"], "p1");
        assert_eq!(json["server_version"], 7);
    }

    #[test]
    fn test_connect_response_failure_has_no_self() {
        let resp = ConnectResponse::failure("old client", 7);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["result"], "Fail");
        assert!(json["self"].is_null());
        assert!(json["settings"].is_null());
    }

    #[test]
    fn test_forwarded_packet_nests_a_body() {
        let fwd = ForwardedPacket {
            forward_to: vec![Guid::new("a"), Guid::new("b")],
            body: Box::new(PacketBody::Command(Command {
                command_type: CommandType::ReturnToMenu,
            })),
        };
        let packet =
            Packet::new(4, Guid::new("c1"), PacketBody::ForwardedPacket(fwd));
        let bytes = serde_json::to_vec(&packet).unwrap();
        let back: Packet = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(back, packet);
        assert_eq!(back.kind(), PacketKind::ForwardedPacket);
    }

    #[test]
    fn test_event_type_and_changed_guid() {
        let event = Event::MatchDeleted(Match::new(Guid::new("m9")));
        assert_eq!(event.event_type(), EventType::MatchDeleted);
        assert_eq!(event.changed_guid(), &Guid::new("m9"));
    }

    #[test]
    fn test_describe_player_updated_includes_status() {
        let mut p = player();
        p.download_state = crate::DownloadState::Downloaded;
        p.score = 1200;
        let text = Event::PlayerUpdated(p).describe();
        assert!(text.contains("Alice"));
        assert!(text.contains("Downloaded"));
        assert!(text.contains("1200"));
    }

    #[test]
    fn test_describe_match_updated_includes_difficulty() {
        let mut m = Match::new(Guid::new("m1"));
        m.selected_difficulty = BeatmapDifficulty::ExpertPlus;
        assert_eq!(
            PacketBody::Event(Event::MatchUpdated(m)).describe(),
            "MatchUpdated (ExpertPlus)"
        );
    }

    #[test]
    fn test_describe_play_song_and_load_song() {
        let play = PacketBody::PlaySong(PlaySong {
            beatmap: Beatmap {
                level_id: "lvl".into(),
                characteristic: "Standard".into(),
                difficulty: BeatmapDifficulty::Hard,
            },
            options: vec![],
        });
        assert_eq!(play.describe(), "lvl : Hard");

        let load = PacketBody::LoadSong(LoadSong {
            level_id: "custom_level_ab".into(),
            custom_host_url: None,
        });
        assert_eq!(load.describe(), "custom_level_ab");
    }
}
