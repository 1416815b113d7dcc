//! Handlers for `GAME` events: room formation, countdown, movement, portal
//! traversal, finishing, and teardown.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::codec::{GameSubType, MainType};
use crate::error::{MapGenError, MoveError, RoomError};
use crate::event::Event;
use crate::point::Point;
use crate::protocol::{MoveBody, RankingEntry, ServerMessage};
use crate::room::Room;

use super::{broadcast_to_map, broadcast_to_room, Context};

pub async fn handle(ctx: &mut Context<'_>, event: Event) {
    let Some(sub) = GameSubType::from_code(event.sub_type) else {
        warn!(sub = event.sub_type, "unknown game sub_type, dropping event");
        return;
    };

    match sub {
        GameSubType::RoomCreate => handle_room_create(ctx).await,
        GameSubType::Countdown => handle_countdown(ctx, event),
        GameSubType::GameStart => handle_game_start(ctx, event),
        GameSubType::PlayerMoved => handle_player_moved(ctx, event),
        GameSubType::GameEnd => handle_game_end(ctx, event),
        // These three are broadcast-only: the server never receives them as
        // inbound events, only emits them from PLAYER_MOVED handling.
        GameSubType::PlayerComeInMap | GameSubType::PlayerComeOutMap | GameSubType::PlayerFinished => {}
    }
}

async fn handle_room_create(ctx: &mut Context<'_>) {
    let popped = ctx.state.pop_waiting(ctx.config.room_batch_size);
    if popped.is_empty() {
        return;
    }

    let room_id = ctx.state.create_room();
    let template = ctx.config.room_template.clone();

    let built = tokio::task::spawn_blocking(move || -> Result<Room, MapGenError> {
        let mut room = Room::new(room_id);
        room.initialize_maps(&template)?;
        Ok(room)
    })
    .await
    .expect("maze generation task panicked");

    let built_room = match built {
        Ok(room) => room,
        Err(err) => {
            error!(room = room_id, %err, "failed to generate room maps, returning players to the queue");
            ctx.state.remove_room(room_id);
            for player in popped {
                ctx.state.add_waiting(player);
            }
            return;
        }
    };

    let Some(room) = ctx.state.find_room_mut(room_id) else {
        return;
    };
    room.maps = built_room.maps;
    for player in popped {
        room.join_player(player);
    }

    let info = room.extract_all_map_info();
    broadcast_to_room(ctx.state, ctx.registry, room_id, ServerMessage::room_create_frame(info.room_id, info.maps));
    info!(room = room_id, "room created");

    let _ = ctx.reactor_tx.send(
        Event::new(MainType::Game, GameSubType::Countdown as u16)
            .with_room(room_id)
            .with_data(ctx.config.countdown_from.to_string().into_bytes()),
    );
}

fn handle_countdown(ctx: &mut Context<'_>, event: Event) {
    let Some(room_id) = event.room_id else {
        return;
    };
    let Some(n) = std::str::from_utf8(&event.data).ok().and_then(|s| s.trim().parse::<i32>().ok()) else {
        warn!(room = room_id, "malformed COUNTDOWN body, dropping");
        return;
    };

    broadcast_to_room(ctx.state, ctx.registry, room_id, ServerMessage::count_down_frame(n));

    if n <= 0 {
        let _ = ctx
            .reactor_tx
            .send(Event::new(MainType::Game, GameSubType::GameStart as u16).with_room(room_id));
        return;
    }

    let tx = ctx.reactor_tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let _ = tx.send(
            Event::new(MainType::Game, GameSubType::Countdown as u16)
                .with_room(room_id)
                .with_data((n - 1).to_string().into_bytes()),
        );
    });
}

fn handle_game_start(ctx: &mut Context<'_>, event: Event) {
    let Some(room_id) = event.room_id else {
        return;
    };
    broadcast_to_room(ctx.state, ctx.registry, room_id, ServerMessage::game_start_frame());
    info!(room = room_id, "game started");
}

fn handle_player_moved(ctx: &mut Context<'_>, event: Event) {
    let Some(conn) = event.connection.clone() else {
        return;
    };
    if conn.is_closed() {
        return;
    }
    let Some(player_id) = ctx.registry.player_of_handle(&conn).cloned() else {
        debug!("PLAYER_MOVED for an unregistered connection, dropping");
        return;
    };

    let body: MoveBody = match serde_json::from_slice(&event.data) {
        Ok(body) => body,
        Err(err) => {
            conn.send_error(&format!("malformed PLAYER_MOVED body: {err}"));
            return;
        }
    };
    let target = Point::new(body.x, body.y);

    let Some(room_id) = ctx.state.find_room_with_player(&player_id) else {
        conn.send_error("player is not in a room");
        return;
    };

    // Validate against a snapshot; nothing is mutated until every check passes.
    let (current_map_name, finished, portal) = {
        let Some(room) = ctx.state.find_room(room_id) else {
            return;
        };
        let Some(player) = room.find_player(&player_id) else {
            return;
        };
        let Some(current_map_name) = player.current_map.clone() else {
            conn.send_error(&MoveError::NoCurrentMap.to_string());
            return;
        };
        let current_position = player.position;

        let Some(map) = room.get_map_by_name(&current_map_name) else {
            conn.send_error(&MoveError::NoCurrentMap.to_string());
            return;
        };

        if !current_position.is_single_step_from(target) {
            conn.send_error(&MoveError::NotSingleStep.to_string());
            return;
        }
        if !map.is_valid_position(target) {
            conn.send_error(&MoveError::InvalidPosition.to_string());
            return;
        }

        let finished = room.is_terminal_map(&current_map_name) && map.end_point == Some(target);
        let portal = map.portal_at(target).cloned();
        (current_map_name, finished, portal)
    };

    let total_distance = {
        let room = ctx.state.find_room_mut(room_id).expect("room vanished mid-handler");
        let player = room.find_player_mut(&player_id).expect("player vanished mid-handler");
        player.update_position(target);
        player.total_distance
    };

    broadcast_to_map(
        ctx.state,
        ctx.registry,
        room_id,
        &current_map_name,
        ServerMessage::player_moved_frame(player_id.clone(), target.x, target.y),
    );

    if finished {
        {
            let room = ctx.state.find_room_mut(room_id).expect("room vanished mid-handler");
            room.remove_player_from_current_map(&player_id);
            room.mark_finished(&player_id);
        }
        broadcast_to_room(
            ctx.state,
            ctx.registry,
            room_id,
            ServerMessage::player_finished_frame(player_id.clone(), total_distance),
        );

        let all_finished = ctx.state.find_room(room_id).map(|r| r.all_finished()).unwrap_or(false);
        if all_finished {
            let _ = ctx
                .reactor_tx
                .send(Event::new(MainType::Game, GameSubType::GameEnd as u16).with_room(room_id));
        }
        return;
    }

    let Some(portal) = portal else {
        return;
    };

    let old_map_name = {
        let room = ctx.state.find_room_mut(room_id).expect("room vanished mid-handler");
        room.remove_player_from_current_map(&player_id)
    };
    let Some(old_map_name) = old_map_name else {
        return;
    };

    broadcast_to_map(
        ctx.state,
        ctx.registry,
        room_id,
        &old_map_name,
        ServerMessage::player_come_out_map_frame(player_id.clone(), old_map_name.clone()),
    );

    let add_result = {
        let room = ctx.state.find_room_mut(room_id).expect("room vanished mid-handler");
        room.add_player_to_map(&player_id, &portal.linked_map_name)
    };

    match add_result {
        Ok(new_pos) => {
            broadcast_to_map(
                ctx.state,
                ctx.registry,
                room_id,
                &portal.linked_map_name,
                ServerMessage::player_come_in_map_frame(player_id.clone(), portal.linked_map_name.clone(), new_pos.x, new_pos.y),
            );
        }
        Err(_) => {
            // The portal's own linked_map_name doesn't resolve to a map in
            // this room, not a generic lookup miss, so report it as such.
            let err = RoomError::DanglingPortal(target);
            error!(room = room_id, player = %player_id, %err, "dangling portal, rolling the player back");
            let room = ctx.state.find_room_mut(room_id).expect("room vanished mid-handler");
            let _ = room.add_player_to_map(&player_id, &old_map_name);
            conn.send_error(&err.to_string());
        }
    }
}

fn handle_game_end(ctx: &mut Context<'_>, event: Event) {
    let Some(room_id) = event.room_id else {
        return;
    };
    let Some(room) = ctx.state.find_room(room_id) else {
        return;
    };

    let mut ranking = Vec::new();
    for player_id in room.finish_order() {
        if let Some(player) = room.find_player(player_id) {
            ranking.push(RankingEntry {
                player_id: player.id.clone(),
                name: player.name.clone(),
                total_distance: player.total_distance,
            });
        }
    }

    let frame = ServerMessage::game_end_frame(ranking);
    for player_id in room.all_player_ids() {
        ctx.registry.send_to_player(&player_id, frame.clone());
    }

    info!(room = room_id, "game ended");
    ctx.state.remove_room(room_id);
}
