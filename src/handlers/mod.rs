//! Event handlers: the code that actually mutates [`GameState`] in response
//! to a dequeued [`Event`], split by the category the [`Reactor`](crate::reactor::Reactor)
//! dispatches on.

pub mod game;
pub mod net;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::event::Event;
use crate::player::PlayerIdGenerator;
use crate::registry::Registry;
use crate::state::GameState;

/// Everything a handler needs to process one event: mutable access to the
/// shared state this dispatch task owns exclusively, plus a sink to
/// re-enqueue follow-up events (possibly from a spawned timer).
pub struct Context<'a> {
    pub state: &'a mut GameState,
    pub registry: &'a mut Registry,
    pub players: &'a PlayerIdGenerator,
    pub config: &'a Config,
    pub reactor_tx: &'a mpsc::UnboundedSender<Event>,
}

/// Broadcast a pre-encoded frame to every player the room currently indexes.
fn broadcast_to_room(state: &GameState, registry: &Registry, room_id: crate::room::RoomId, frame: Vec<u8>) {
    let Some(room) = state.find_room(room_id) else {
        return;
    };
    for player_id in room.all_player_ids() {
        registry.send_to_player(&player_id, frame.clone());
    }
}

/// Broadcast a pre-encoded frame to every player currently standing on one
/// map of the room.
fn broadcast_to_map(
    state: &GameState,
    registry: &Registry,
    room_id: crate::room::RoomId,
    map_name: &str,
    frame: Vec<u8>,
) {
    let Some(room) = state.find_room(room_id) else {
        return;
    };
    for player_id in room.player_ids_on_map(map_name) {
        registry.send_to_player(&player_id, frame.clone());
    }
}

/// Remove a player from wherever they currently are: the waiting queue, or
/// whichever room's map(s) they occupy. Used by both LEFT and CLOSE.
fn remove_player_everywhere(state: &mut GameState, player_id: &crate::player::PlayerId) {
    if state.remove_waiting(player_id) {
        return;
    }
    if let Some(room_id) = state.find_room_with_player(player_id) {
        if let Some(room) = state.find_room_mut(room_id) {
            room.remove_player(player_id);
        }
    }
}
