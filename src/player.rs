//! Player state and id allocation.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::point::Point;
use crate::room::RoomId;

/// A 12-digit zero-padded decimal player id, e.g. `"000000000007"`.
pub type PlayerId = String;

/// Hands out the canonical, monotonically increasing player id.
///
/// The JOIN body carries a client-supplied `player_id`, but per this
/// codebase's id policy the client's value is only used to validate the
/// JSON shape — the id that actually identifies the `Player` everywhere
/// else always comes from this counter.
#[derive(Debug, Default)]
pub struct PlayerIdGenerator {
    next: AtomicU64,
}

impl PlayerIdGenerator {
    pub fn new() -> Self {
        PlayerIdGenerator {
            next: AtomicU64::new(0),
        }
    }

    pub fn next_id(&self) -> PlayerId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{:012}", n)
    }
}

/// A connected player's game state.
///
/// `Room` is the sole owner of a `Player`; `current_map`/`room_id` are held
/// as plain names/ids rather than references, so there is nothing here that
/// can dangle the way a `shared_ptr` cycle or stale `weak_ptr` could.
#[derive(Debug, Clone, Serialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub position: Point,
    pub total_distance: u32,
    pub is_finished: bool,

    /// Name of the map this player currently occupies, if any.
    pub current_map: Option<String>,

    pub room_id: Option<RoomId>,
}

impl Player {
    pub fn new(id: PlayerId, name: String) -> Self {
        Player {
            id,
            name,
            position: Point::new(0, 0),
            total_distance: 0,
            is_finished: false,
            current_map: None,
            room_id: None,
        }
    }

    /// Move the player to `new_position`, incrementing `total_distance`.
    ///
    /// Callers are expected to have already validated the move (single-step,
    /// in-bounds, not an obstacle) via [`crate::map::Map::is_valid_position`].
    pub fn update_position(&mut self, new_position: Point) {
        self.position = new_position;
        self.total_distance += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_zero_padded() {
        let gen = PlayerIdGenerator::new();
        assert_eq!(gen.next_id(), "000000000000");
        assert_eq!(gen.next_id(), "000000000001");
        assert_eq!(gen.next_id(), "000000000002");
    }

    #[test]
    fn update_position_tracks_total_distance() {
        let mut p = Player::new("000000000000".into(), "Alice".into());
        p.update_position(Point::new(1, 1));
        assert_eq!(p.total_distance, 1);
        p.update_position(Point::new(2, 1));
        assert_eq!(p.total_distance, 2);
        assert_eq!(p.position, Point::new(2, 1));
    }
}
