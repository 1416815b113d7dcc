//! Pure state container: the waiting queue and the rooms index.
//!
//! `GameState` does no I/O and makes no scheduling decisions; it is owned
//! exclusively by the [`Reactor`](crate::reactor::Reactor)'s single
//! dispatch task, which is what makes it safe to hold `&mut` freely instead
//! of behind a lock.

use std::collections::HashMap;

use crate::player::Player;
use crate::room::{Room, RoomId};

#[derive(Debug, Default)]
pub struct GameState {
    waiting: Vec<Player>,
    rooms: HashMap<RoomId, Room>,
    next_room_id: RoomId,
}

impl GameState {
    pub fn new() -> Self {
        GameState::default()
    }

    pub fn add_waiting(&mut self, player: Player) {
        self.waiting.push(player);
    }

    /// Remove a waiting player by id. Returns `true` if they were present.
    pub fn remove_waiting(&mut self, player_id: &str) -> bool {
        let before = self.waiting.len();
        self.waiting.retain(|p| p.id != player_id);
        self.waiting.len() != before
    }

    /// Pop up to `n` players from the front of the waiting queue, FIFO.
    pub fn pop_waiting(&mut self, n: usize) -> Vec<Player> {
        let n = n.min(self.waiting.len());
        self.waiting.drain(0..n).collect()
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    pub fn create_room(&mut self) -> RoomId {
        let id = self.next_room_id;
        self.next_room_id += 1;
        self.rooms.insert(id, Room::new(id));
        id
    }

    pub fn find_room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    pub fn find_room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(&id)
    }

    pub fn remove_room(&mut self, id: RoomId) -> Option<Room> {
        self.rooms.remove(&id)
    }

    pub fn all_rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Find whichever room (if any) currently indexes this player, along
    /// with their room id.
    pub fn find_room_with_player(&self, player_id: &str) -> Option<RoomId> {
        self.rooms
            .values()
            .find(|room| room.find_player(&player_id.to_string()).is_some())
            .map(|room| room.id)
    }
}
