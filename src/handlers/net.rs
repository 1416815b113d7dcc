//! Handlers for `NETWORK` events: JOIN, LEFT, CLOSE.

use tracing::{debug, info, warn};

use crate::codec::{GameSubType, MainType, NetworkSubType};
use crate::event::Event;
use crate::player::Player;
use crate::protocol::{JoinBody, ServerMessage};

use super::{remove_player_everywhere, Context};

pub async fn handle(ctx: &mut Context<'_>, event: Event) {
    let Some(sub) = NetworkSubType::from_code(event.sub_type) else {
        warn!(sub = event.sub_type, "unknown network sub_type, dropping event");
        return;
    };

    match sub {
        NetworkSubType::Join => handle_join(ctx, event),
        NetworkSubType::Left => handle_left(ctx, event),
        NetworkSubType::Close => handle_close(ctx, event),
    }
}

fn handle_join(ctx: &mut Context<'_>, event: Event) {
    let Some(conn) = event.connection else {
        debug!("JOIN event missing its connection, dropping");
        return;
    };
    if conn.is_closed() {
        debug!(connection = ?conn.id(), "JOIN arrived with an already-closed connection, dropping");
        return;
    }

    let body: JoinBody = match serde_json::from_slice(&event.data) {
        Ok(body) => body,
        Err(err) => {
            warn!(%err, "malformed JOIN body");
            conn.send_error(&format!("malformed JOIN body: {err}"));
            return;
        }
    };

    let player_id = ctx.players.next_id();
    let player = Player::new(player_id.clone(), body.player_name);

    ctx.registry.register(player_id.clone(), conn.clone());
    ctx.state.add_waiting(player);
    conn.write(ServerMessage::join_ack_frame());

    let waiting = ctx.state.waiting_count();
    info!(player = %player_id, waiting, "player joined the queue");

    if waiting >= ctx.config.room_batch_size {
        let _ = ctx
            .reactor_tx
            .send(Event::new(MainType::Game, GameSubType::RoomCreate as u16));
    }
}

fn handle_left(ctx: &mut Context<'_>, event: Event) {
    let Some(conn) = event.connection else {
        return;
    };
    let Some(player_id) = ctx.registry.player_of_handle(&conn).cloned() else {
        debug!("LEFT for an unregistered connection, dropping");
        return;
    };

    remove_player_everywhere(ctx.state, &player_id);
    info!(player = %player_id, "player left");
    conn.write(ServerMessage::left_ack_frame());
}

fn handle_close(ctx: &mut Context<'_>, event: Event) {
    let Some(conn) = event.connection else {
        return;
    };
    if let Some(player_id) = ctx.registry.player_of_handle(&conn).cloned() {
        remove_player_everywhere(ctx.state, &player_id);
        ctx.registry.unregister(&player_id);
        info!(player = %player_id, "connection closed, player removed");
    }
    conn.close();
}
