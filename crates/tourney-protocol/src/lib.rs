//! Wire protocol for Tourney.
//!
//! This crate defines what the server and its clients say to each other:
//!
//! - **Model** ([`Player`], [`MatchCoordinator`], [`Match`], [`State`]) —
//!   the tournament state every client mirrors.
//! - **Packets** ([`Packet`], [`PacketBody`], [`Event`]) — the envelope
//!   and its closed set of tagged payloads.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how packets become
//!   bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! ```text
//! Transport (bytes) → Protocol (Packet) → State (World / Hub)
//! ```

mod codec;
mod error;
mod packet;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use packet::{
    Acknowledgement, AcknowledgementType, Beatmap, Command, CommandType,
    Connect, ConnectResponse, ConnectType, Event, EventType, File,
    FileIntent, ForwardedPacket, LoadSong, LoadedSong, Packet, PacketBody,
    PacketKind, Participant, PlaySong, ResponseType, SongFinished, SongList,
};
pub use types::{
    BeatmapDifficulty, DownloadState, Guid, Identified, Match,
    MatchCoordinator, PlayState, Player, PreviewBeatmapLevel,
    ServerSettings, State,
};

/// Protocol version code. Clients reporting a lower code are refused.
pub const VERSION_CODE: u32 = 3;

/// Human-readable server version, shown in refusal messages.
pub const VERSION: &str = "0.3.0";
