//! Error types for the state layer.

use std::fmt;

use tourney_protocol::Guid;

/// Which collection of the state an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Player,
    Coordinator,
    Match,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "player"),
            Self::Coordinator => write!(f, "coordinator"),
            Self::Match => write!(f, "match"),
        }
    }
}

/// A mutation that could not be applied. The state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// Adding an identity that is already present.
    #[error("{kind} {guid} already exists")]
    AlreadyExists { kind: EntityKind, guid: Guid },

    /// Updating or removing an identity that is not present.
    #[error("{kind} {guid} not found")]
    NotFound { kind: EntityKind, guid: Guid },

    /// Removing the HOST coordinator.
    #[error("{0} is reserved and cannot be removed")]
    Reserved(Guid),
}
