//! Bidirectional player <-> connection mapping.

use std::collections::HashMap;

use crate::connection::{ConnectionHandle, ConnectionId};
use crate::player::PlayerId;

/// Maintains the bijection between live players and their connections.
///
/// Registering a player that is already registered replaces the prior
/// mapping; registering a connection that already belongs to another player
/// likewise displaces that player's entry, so the structure never drifts
/// out of being a true bijection.
#[derive(Debug, Default)]
pub struct Registry {
    player_to_conn: HashMap<PlayerId, ConnectionHandle>,
    conn_to_player: HashMap<ConnectionId, PlayerId>,
}

impl Registry {
    pub fn new() -> Self {
        Registry::default()
    }

    pub fn register(&mut self, player_id: PlayerId, conn: ConnectionHandle) {
        if let Some(stale_player) = self.conn_to_player.remove(&conn.id()) {
            if stale_player != player_id {
                self.player_to_conn.remove(&stale_player);
            }
        }
        if let Some(prev_conn) = self.player_to_conn.insert(player_id.clone(), conn.clone()) {
            if prev_conn.id() != conn.id() {
                self.conn_to_player.remove(&prev_conn.id());
            }
        }
        self.conn_to_player.insert(conn.id(), player_id);
    }

    pub fn unregister(&mut self, player_id: &PlayerId) -> Option<ConnectionHandle> {
        let conn = self.player_to_conn.remove(player_id)?;
        self.conn_to_player.remove(&conn.id());
        Some(conn)
    }

    pub fn connection_of(&self, player_id: &PlayerId) -> Option<&ConnectionHandle> {
        self.player_to_conn.get(player_id)
    }

    pub fn player_of(&self, conn_id: ConnectionId) -> Option<&PlayerId> {
        self.conn_to_player.get(&conn_id)
    }

    /// Look up a player by the connection handle that produced an event.
    pub fn player_of_handle(&self, conn: &ConnectionHandle) -> Option<&PlayerId> {
        self.player_of(conn.id())
    }

    pub fn send_to_player(&self, player_id: &PlayerId, frame: Vec<u8>) {
        if let Some(conn) = self.connection_of(player_id) {
            conn.write(frame);
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.player_to_conn.len(), self.conn_to_player.len());
        self.player_to_conn.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_handle() -> ConnectionHandle {
        crate::connection::test_support::fake_handle("127.0.0.1:1".parse().unwrap())
    }

    #[tokio::test]
    async fn register_then_lookup_both_directions() {
        let mut reg = Registry::new();
        let conn = test_handle();
        reg.register("000000000000".into(), conn.clone());

        assert_eq!(reg.connection_of(&"000000000000".to_string()), Some(&conn));
        assert_eq!(reg.player_of(conn.id()), Some(&"000000000000".to_string()));
        assert_eq!(reg.len(), 1);
    }

    #[tokio::test]
    async fn re_registering_a_player_replaces_the_old_connection() {
        let mut reg = Registry::new();
        let conn_a = test_handle();
        let conn_b = test_handle();

        reg.register("p1".into(), conn_a.clone());
        reg.register("p1".into(), conn_b.clone());

        assert_eq!(reg.connection_of(&"p1".to_string()), Some(&conn_b));
        assert_eq!(reg.player_of(conn_a.id()), None);
        assert_eq!(reg.player_of(conn_b.id()), Some(&"p1".to_string()));
        assert_eq!(reg.len(), 1);
    }

    #[tokio::test]
    async fn unregister_removes_both_directions() {
        let mut reg = Registry::new();
        let conn = test_handle();
        reg.register("p1".into(), conn.clone());

        let removed = reg.unregister(&"p1".to_string());
        assert_eq!(removed, Some(conn.clone()));
        assert_eq!(reg.connection_of(&"p1".to_string()), None);
        assert_eq!(reg.player_of(conn.id()), None);
        assert_eq!(reg.len(), 0);
    }
}
