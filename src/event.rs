//! The internal event that flows from a [`Connection`](crate::connection::Connection)
//! or a timer into the [`Reactor`](crate::reactor::Reactor)'s queue.
//!
//! An `Event` never leaves the process; it is the unit of work the single
//! dispatcher loop drains one at a time.

use crate::codec::MainType;
use crate::connection::ConnectionHandle;
use crate::player::PlayerId;
use crate::room::RoomId;

/// One item on the reactor's event queue.
#[derive(Debug, Clone)]
pub struct Event {
    pub main_type: MainType,
    pub sub_type: u16,

    /// The connection that produced this event, if any. Sending through a
    /// handle whose connection task has already exited is a silent no-op —
    /// that is this codebase's stand-in for the source's `weak_ptr`
    /// "may have expired" check.
    pub connection: Option<ConnectionHandle>,

    /// Raw JSON (or, for CLOSE, empty) payload.
    pub data: Vec<u8>,

    pub room_id: Option<RoomId>,
    pub player_id: Option<PlayerId>,
}

impl Event {
    pub fn new(main_type: MainType, sub_type: u16) -> Self {
        Event {
            main_type,
            sub_type,
            connection: None,
            data: Vec::new(),
            room_id: None,
            player_id: None,
        }
    }

    pub fn with_connection(mut self, conn: ConnectionHandle) -> Self {
        self.connection = Some(conn);
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn with_room(mut self, room_id: RoomId) -> Self {
        self.room_id = Some(room_id);
        self
    }

    pub fn with_player(mut self, player_id: PlayerId) -> Self {
        self.player_id = Some(player_id);
        self
    }
}
