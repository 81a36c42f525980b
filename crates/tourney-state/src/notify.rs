//! In-process notifications for local observers.

use tourney_protocol::{Event, SongFinished};

/// Something that just happened on the server, as seen by local
/// (non-network) observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A state mutation was applied and broadcast.
    Event(Event),
    /// A player finished a song; the result was relayed to everyone.
    SongFinished(SongFinished),
}
