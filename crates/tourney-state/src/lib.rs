//! Authoritative tournament state for Tourney.
//!
//! - [`World`]: the players, coordinators, and matches, plus a version
//!   counter. Plain data, no locking.
//! - [`Hub`]: wraps the world in one mutex and is the only mutation
//!   entry point. Each applied change is broadcast as an
//!   [`Event`](tourney_protocol::Event) to every participant and
//!   published to local [`Notification`] subscribers.
//! - Relay: [`Hub::forward`] sends a packet to a given identity list
//!   without touching the world.

mod error;
mod hub;
mod notify;
mod world;

pub use error::{EntityKind, StateError};
pub use hub::Hub;
pub use notify::Notification;
pub use world::World;
