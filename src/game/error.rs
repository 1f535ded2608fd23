//! Reasons an inbound event is dropped

use uuid::Uuid;

use crate::ws::protocol::RoundPhase;

/// Coarse grouping used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    Malformed,
    Authority,
    Capacity,
}

impl RejectionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::Authority => "authority",
            Self::Capacity => "capacity",
        }
    }
}

/// An inbound event that was dropped without touching shared state
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    #[error("unknown player {0}")]
    UnknownPlayer(Uuid),

    #[error("player is not in a room")]
    NotInRoom,

    #[error("player is already in room {0}")]
    AlreadyInRoom(String),

    #[error("attacker and target are in different rooms")]
    RoomMismatch,

    #[error("room phase is {0:?}, not playing")]
    NotPlaying(RoundPhase),

    #[error("attacker is invulnerable")]
    AttackerInvulnerable,

    #[error("target is invulnerable or shielded")]
    TargetProtected,

    #[error("target is not an active player")]
    TargetNotActive,

    #[error("players cannot hit themselves")]
    SelfHit,

    #[error("unknown powerup {0}")]
    UnknownPowerup(Uuid),

    #[error("powerup {0} was already collected")]
    AlreadyCollected(Uuid),

    #[error("powerup {0} has not landed yet")]
    NotLanded(Uuid),

    #[error("powerup {0} has expired")]
    PowerupExpired(Uuid),

    #[error("only active players can collect powerups")]
    CollectorNotActive,

    #[error("room {0} is full")]
    RoomFull(String),
}

impl Rejection {
    pub fn kind(&self) -> RejectionKind {
        match self {
            Self::MissingField(_) | Self::InvalidField(_) => RejectionKind::Malformed,
            Self::RoomFull(_) => RejectionKind::Capacity,
            _ => RejectionKind::Authority,
        }
    }
}
