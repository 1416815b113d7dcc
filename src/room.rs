//! A game session: an ordered chain of [`Map`]s plus the players currently
//! inside it.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::RoomError;
use crate::map::{Map, MapInfo};
use crate::player::{Player, PlayerId};
use crate::point::Point;

pub type RoomId = u64;

/// Default room template: three 15x15 maps chained A -> B -> C.
#[derive(Debug, Clone)]
pub struct RoomTemplate {
    pub map_names: Vec<String>,
    pub map_width: i32,
    pub map_height: i32,
    pub start: Point,
    pub end: Point,
}

impl Default for RoomTemplate {
    fn default() -> Self {
        RoomTemplate {
            map_names: vec!["A".to_string(), "B".to_string(), "C".to_string()],
            map_width: 15,
            map_height: 15,
            start: Point::new(1, 1),
            end: Point::new(14, 14),
        }
    }
}

/// A room owns its players outright; maps only ever hold player ids. This
/// sidesteps the Room<->Player<->Map reference cycle the source modeled with
/// `shared_ptr`/`weak_ptr`.
#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    pub maps: Vec<Map>,
    players: std::collections::HashMap<PlayerId, Player>,
    finish_order: Vec<PlayerId>,
}

impl Room {
    pub fn new(id: RoomId) -> Self {
        Room {
            id,
            maps: Vec::new(),
            players: std::collections::HashMap::new(),
            finish_order: Vec::new(),
        }
    }

    /// Build the default map chain: generate one outbound portal per
    /// non-terminal map pointing at the next map, then carve obstacles with
    /// `is_terminal` set only on the last map.
    pub fn initialize_maps(&mut self, template: &RoomTemplate) -> Result<(), crate::error::MapGenError> {
        let count = template.map_names.len();
        let mut maps: Vec<Map> = template
            .map_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut map = Map::new(name.clone(), template.map_width, template.map_height, template.start);
                if i == count - 1 {
                    map = map.with_end_point(template.end);
                }
                map
            })
            .collect();

        for i in 0..count.saturating_sub(1) {
            let next_name = template.map_names[i + 1].clone();
            maps[i].generate_random_portal(next_name)?;
        }

        for (i, map) in maps.iter_mut().enumerate() {
            let is_terminal = i == count - 1;
            map.generate_random_obstacles(is_terminal)?;
        }

        info!(room = self.id, maps = count, "room maps initialized");
        self.maps = maps;
        Ok(())
    }

    /// `true` if `maps` is a terminal map (the last one, the only one with
    /// an `end_point`).
    pub fn is_terminal_map(&self, map_name: &str) -> bool {
        self.maps.last().map(|m| m.name.as_str()) == Some(map_name)
    }

    pub fn get_map_by_name(&self, name: &str) -> Option<&Map> {
        self.maps.iter().find(|m| m.name == name)
    }

    pub fn get_map_by_name_mut(&mut self, name: &str) -> Option<&mut Map> {
        self.maps.iter_mut().find(|m| m.name == name)
    }

    /// Add a player to the room's entry map and register them in the
    /// player index.
    pub fn join_player(&mut self, mut player: Player) -> bool {
        let Some(entry) = self.maps.first_mut() else {
            return false;
        };
        let entry_name = entry.name.clone();
        let start = entry.start_point;

        entry.add_player(player.id.clone());
        player.current_map = Some(entry_name);
        player.position = start;
        player.room_id = Some(self.id);

        self.players.insert(player.id.clone(), player);
        true
    }

    pub fn find_player(&self, player_id: &PlayerId) -> Option<&Player> {
        self.players.get(player_id)
    }

    pub fn find_player_mut(&mut self, player_id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(player_id)
    }

    /// Remove a player from whichever map they occupy and from the room's
    /// player index. Returns `true` if they were present.
    pub fn remove_player(&mut self, player_id: &PlayerId) -> bool {
        let mut removed_from_map = false;
        for map in &mut self.maps {
            if map.remove_player(player_id) {
                removed_from_map = true;
            }
        }
        let removed_from_index = self.players.remove(player_id).is_some();
        debug!(room = self.id, player = %player_id, "player removed from room");
        removed_from_map || removed_from_index
    }

    /// Remove a player from the map they currently occupy (per
    /// `player.current_map`), without touching the room's player index.
    ///
    /// Returns the name of the map they were removed from, if any. Exposed
    /// as a standalone step (rather than folded into a single "transfer")
    /// because the portal-traversal handler must broadcast
    /// `player_come_out_map` between removing the player and resolving the
    /// destination map, and must be able to undo this step in isolation if
    /// the destination turns out to be missing.
    pub fn remove_player_from_current_map(&mut self, player_id: &PlayerId) -> Option<String> {
        let current_name = self.find_player(player_id)?.current_map.clone()?;
        if let Some(map) = self.get_map_by_name_mut(&current_name) {
            map.remove_player(player_id);
        }
        Some(current_name)
    }

    /// Add a player (already removed from wherever they were) onto
    /// `target_map_name`'s `start_point`, updating their `current_map` and
    /// `position` to match.
    pub fn add_player_to_map(
        &mut self,
        player_id: &PlayerId,
        target_map_name: &str,
    ) -> Result<Point, RoomError> {
        let target_start = {
            let target = self
                .get_map_by_name_mut(target_map_name)
                .ok_or_else(|| RoomError::MapNotFound(target_map_name.to_string()))?;
            target.add_player(player_id.clone());
            target.start_point
        };

        if let Some(player) = self.find_player_mut(player_id) {
            player.current_map = Some(target_map_name.to_string());
            player.position = target_start;
        }

        Ok(target_start)
    }

    /// Every player currently present in the room's maps, across all of
    /// them. Used for room-wide broadcasts.
    pub fn all_player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().cloned().collect()
    }

    pub fn player_ids_on_map(&self, map_name: &str) -> Vec<PlayerId> {
        self.get_map_by_name(map_name)
            .map(|m| m.players().to_vec())
            .unwrap_or_default()
    }

    /// Mark a player as finished and record their place in finish order.
    /// A no-op if they were already finished (idempotent against duplicate
    /// finish events).
    pub fn mark_finished(&mut self, player_id: &PlayerId) {
        if let Some(player) = self.players.get_mut(player_id) {
            if !player.is_finished {
                player.is_finished = true;
                self.finish_order.push(player_id.clone());
            }
        }
    }

    /// Player ids in the order they finished, oldest first.
    pub fn finish_order(&self) -> &[PlayerId] {
        &self.finish_order
    }

    /// `true` iff every player the room still indexes has finished.
    ///
    /// A finished player is removed from their map (so "indexed by any
    /// map" would never see them), but remains in `self.players` until
    /// `GAME_END` tears the room down, which is what this predicate reads.
    pub fn all_finished(&self) -> bool {
        !self.players.is_empty() && self.players.values().all(|p| p.is_finished)
    }

    pub fn extract_all_map_info(&self) -> RoomInfo {
        RoomInfo {
            room_id: self.id,
            maps: self.maps.iter().map(Map::extract_map_info).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomInfo {
    pub room_id: RoomId,
    pub maps: Vec<MapInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn built_room() -> Room {
        let mut room = Room::new(0);
        room.initialize_maps(&RoomTemplate::default()).unwrap();
        room
    }

    #[test]
    fn initialize_maps_builds_a_linked_chain() {
        let room = built_room();
        assert_eq!(room.maps.len(), 3);
        assert_eq!(room.maps[0].name, "A");
        assert_eq!(room.maps[2].name, "C");
        assert_eq!(room.maps[2].end_point, Some(Point::new(14, 14)));

        // each non-terminal map links to the next one in the chain
        for i in 0..room.maps.len() - 1 {
            let next_name = room.maps[i + 1].name.clone();
            assert!(room.maps[i].portals.iter().any(|p| p.linked_map_name == next_name));
        }
    }

    #[test]
    fn join_player_places_them_on_the_entry_map() {
        let mut room = built_room();
        let player = Player::new("000000000000".into(), "Alice".into());
        assert!(room.join_player(player));

        let p = room.find_player(&"000000000000".to_string()).unwrap();
        assert_eq!(p.current_map.as_deref(), Some("A"));
        assert_eq!(p.position, room.maps[0].start_point);
        assert_eq!(room.player_ids_on_map("A"), vec!["000000000000".to_string()]);
    }

    #[test]
    fn transfer_player_moves_them_between_maps() {
        let mut room = built_room();
        room.join_player(Player::new("p1".into(), "Alice".into()));

        room.remove_player_from_current_map(&"p1".to_string());
        room.add_player_to_map(&"p1".to_string(), "B").unwrap();

        assert!(room.player_ids_on_map("A").is_empty());
        assert_eq!(room.player_ids_on_map("B"), vec!["p1".to_string()]);
        let p = room.find_player(&"p1".to_string()).unwrap();
        assert_eq!(p.current_map.as_deref(), Some("B"));
        assert_eq!(p.position, room.maps[1].start_point);
    }

    #[test]
    fn add_to_missing_map_errors_and_can_be_rolled_back() {
        let mut room = built_room();
        room.join_player(Player::new("p1".into(), "Alice".into()));

        let old_map = room.remove_player_from_current_map(&"p1".to_string()).unwrap();
        assert_eq!(old_map, "A");
        assert!(room.player_ids_on_map("A").is_empty());

        let err = room.add_player_to_map(&"p1".to_string(), "Z").unwrap_err();
        assert!(matches!(err, RoomError::MapNotFound(_)));

        // the handler rolls the player back onto the map they came from
        room.add_player_to_map(&"p1".to_string(), &old_map).unwrap();
        assert_eq!(room.player_ids_on_map("A"), vec!["p1".to_string()]);
    }

    #[test]
    fn all_finished_is_false_until_everyone_finishes() {
        let mut room = built_room();
        room.join_player(Player::new("p1".into(), "A".into()));
        room.join_player(Player::new("p2".into(), "B".into()));
        assert!(!room.all_finished());

        room.find_player_mut(&"p1".to_string()).unwrap().is_finished = true;
        assert!(!room.all_finished());

        room.find_player_mut(&"p2".to_string()).unwrap().is_finished = true;
        assert!(room.all_finished());
    }

    #[test]
    fn mark_finished_records_finish_order_once() {
        let mut room = built_room();
        room.join_player(Player::new("p1".into(), "A".into()));
        room.join_player(Player::new("p2".into(), "B".into()));

        room.mark_finished(&"p2".to_string());
        room.mark_finished(&"p1".to_string());
        room.mark_finished(&"p2".to_string());

        assert_eq!(room.finish_order(), &["p2".to_string(), "p1".to_string()]);
    }

    #[test]
    fn remove_player_clears_both_map_and_index() {
        let mut room = built_room();
        room.join_player(Player::new("p1".into(), "A".into()));
        assert!(room.remove_player(&"p1".to_string()));
        assert!(room.find_player(&"p1".to_string()).is_none());
        assert!(room.player_ids_on_map("A").is_empty());
        assert!(!room.remove_player(&"p1".to_string()));
    }
}
