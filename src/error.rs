//! Typed error taxonomy for framing, decoding, and game-rule failures.
//!
//! Handlers convert these into the wire-level `ERROR(UNKNOWN)` packet or a
//! log line; nothing in this module ever panics the reactor.

use thiserror::Error;

/// Failures while reading or writing a framed packet.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unknown main_type {0}")]
    UnknownMainType(u16),

    #[error("sub_type {sub} is not valid for main_type {main}")]
    SubTypeOutOfRange { main: u16, sub: u16 },

    #[error("body_length {0} exceeds the 10 MiB frame cap")]
    BodyTooLarge(u32),
}

/// A rejected `PLAYER_MOVED` request.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    #[error("player has no current map")]
    NoCurrentMap,

    #[error("target position is not walkable")]
    InvalidPosition,

    #[error("move is not a single orthogonal step")]
    NotSingleStep,
}

/// Procedural generation gave up after exhausting its retry budget.
#[derive(Debug, Error)]
pub enum MapGenError {
    #[error("could not place a portal at least {min_distance} away from start after {attempts} attempts")]
    PortalExhausted { min_distance: i32, attempts: u32 },

    #[error("could not carve a connected maze after {attempts} outer attempts")]
    ObstacleExhausted { attempts: u32 },
}

/// Room/map-chain consistency failures.
#[derive(Debug, Error)]
pub enum RoomError {
    #[error("map {0:?} not found in room")]
    MapNotFound(String),

    #[error("portal at {0:?} has no linked map in this room")]
    DanglingPortal(crate::point::Point),
}
