//! # Tourney
//!
//! Authoritative state-synchronization server for live tournaments.
//!
//! Players and coordinators connect over WebSocket, register with a
//! `Connect` handshake, receive the full tournament state, and from then
//! on stay in sync through events broadcast after every change. Any
//! party can also relay packets to specific others through the server.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tourney::prelude::*;
//!
//! # async fn start() -> Result<(), TourneyError> {
//! let config = ServerConfig::load_or_init("serverConfig.json")?;
//! let server = TourneyServer::builder().config(config).build().await?;
//! server.run().await
//! # }
//! ```

mod config;
mod dispatch;
mod error;
mod handler;
mod nat;
mod server;

pub use config::{ConfigError, ServerConfig, DEFAULT_PORT, DEFAULT_SERVER_NAME};
pub use dispatch::{Dispatcher, Role, TEST_NAME_PREFIX};
pub use error::TourneyError;
pub use nat::{open_port, NatError, NoPortMapping, PortMapper, PORT_MAPPING_TIMEOUT};
pub use server::{ServerHub, TourneyServer, TourneyServerBuilder};

/// Everything needed to run a server and talk to its state.
pub mod prelude {
    pub use crate::{
        NoPortMapping, PortMapper, ServerConfig, TourneyError, TourneyServer,
    };
    pub use tourney_protocol::{
        Event, Guid, Match, MatchCoordinator, Packet, PacketBody, Player,
        State,
    };
    pub use tourney_state::Notification;
}
