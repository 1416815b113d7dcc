//! JSON payload shapes for packet bodies, plus helpers to serialize an
//! outbound message straight into a framed wire packet.
//!
//! Keeping these as small, derive-driven structs (rather than hand-rolled
//! parsing inside the handlers) keeps wire-JSON decoding out of the event
//! handlers entirely.

use serde::{Deserialize, Serialize};

use crate::codec::{self, GameSubType, MainType, NetworkSubType};
use crate::map::MapInfo;
use crate::player::PlayerId;
use crate::room::RoomId;

/// Body of a client's `JOIN` packet.
///
/// `player_id` is accepted to validate the JSON shape, but is not the
/// canonical id the server assigns to the `Player` — that always comes
/// from the server's own id generator.
#[derive(Debug, Deserialize)]
pub struct JoinBody {
    #[serde(default)]
    pub player_id: String,
    pub player_name: String,
}

/// Body of a client's `PLAYER_MOVED` packet.
#[derive(Debug, Deserialize)]
pub struct MoveBody {
    pub x: i32,
    pub y: i32,
}

/// A single finisher's entry in the `game_end` ranking.
#[derive(Debug, Clone, Serialize)]
pub struct RankingEntry {
    pub player_id: PlayerId,
    pub name: String,
    pub total_distance: u32,
}

/// Every JSON body this server ever sends, tagged by `action` so a client
/// can dispatch on it without consulting the packet header at all.
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ServerMessage {
    Join {
        result: &'static str,
    },
    Left {
        result: &'static str,
    },
    RoomCreate {
        room_id: RoomId,
        maps: Vec<MapInfo>,
    },
    CountDown {
        count: i32,
    },
    GameStart,
    PlayerMoved {
        result: bool,
        player_id: PlayerId,
        x: i32,
        y: i32,
    },
    PlayerComeOutMap {
        player_id: PlayerId,
        map: String,
    },
    PlayerComeInMap {
        player_id: PlayerId,
        map: String,
        x: i32,
        y: i32,
    },
    PlayerFinished {
        player_id: PlayerId,
        total_distance: u32,
    },
    GameEnd {
        ranking: Vec<RankingEntry>,
    },
}

impl ServerMessage {
    fn to_frame(&self, main: MainType, sub: u16) -> Vec<u8> {
        let body = serde_json::to_vec(self).expect("ServerMessage always serializes");
        codec::encode(main, sub, &body)
    }

    pub fn join_ack_frame() -> Vec<u8> {
        ServerMessage::Join { result: "ok" }.to_frame(MainType::Network, NetworkSubType::Join as u16)
    }

    pub fn left_ack_frame() -> Vec<u8> {
        ServerMessage::Left { result: "ok" }.to_frame(MainType::Network, NetworkSubType::Left as u16)
    }

    pub fn room_create_frame(room_id: RoomId, maps: Vec<MapInfo>) -> Vec<u8> {
        ServerMessage::RoomCreate { room_id, maps }
            .to_frame(MainType::Game, GameSubType::RoomCreate as u16)
    }

    pub fn count_down_frame(count: i32) -> Vec<u8> {
        ServerMessage::CountDown { count }.to_frame(MainType::Game, GameSubType::Countdown as u16)
    }

    pub fn game_start_frame() -> Vec<u8> {
        ServerMessage::GameStart.to_frame(MainType::Game, GameSubType::GameStart as u16)
    }

    pub fn player_moved_frame(player_id: PlayerId, x: i32, y: i32) -> Vec<u8> {
        ServerMessage::PlayerMoved {
            result: true,
            player_id,
            x,
            y,
        }
        .to_frame(MainType::Game, GameSubType::PlayerMoved as u16)
    }

    pub fn player_come_out_map_frame(player_id: PlayerId, map: String) -> Vec<u8> {
        ServerMessage::PlayerComeOutMap { player_id, map }
            .to_frame(MainType::Game, GameSubType::PlayerComeOutMap as u16)
    }

    pub fn player_come_in_map_frame(player_id: PlayerId, map: String, x: i32, y: i32) -> Vec<u8> {
        ServerMessage::PlayerComeInMap { player_id, map, x, y }
            .to_frame(MainType::Game, GameSubType::PlayerComeInMap as u16)
    }

    pub fn player_finished_frame(player_id: PlayerId, total_distance: u32) -> Vec<u8> {
        ServerMessage::PlayerFinished {
            player_id,
            total_distance,
        }
        .to_frame(MainType::Game, GameSubType::PlayerFinished as u16)
    }

    pub fn game_end_frame(ranking: Vec<RankingEntry>) -> Vec<u8> {
        ServerMessage::GameEnd { ranking }.to_frame(MainType::Game, GameSubType::GameEnd as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_ack_has_expected_shape() {
        let frame = ServerMessage::join_ack_frame();
        let hdr_bytes: [u8; codec::HEADER_LEN] = frame[..codec::HEADER_LEN].try_into().unwrap();
        let hdr = codec::decode_header(&hdr_bytes).unwrap();
        assert_eq!(hdr.main_type, MainType::Network);
        assert_eq!(hdr.sub_type, NetworkSubType::Join as u16);

        let body = &frame[codec::HEADER_LEN..codec::HEADER_LEN + hdr.body_length as usize];
        let value: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(value["action"], "join");
        assert_eq!(value["result"], "ok");
    }

    #[test]
    fn count_down_serializes_count() {
        let frame = ServerMessage::count_down_frame(5);
        let hdr_bytes: [u8; codec::HEADER_LEN] = frame[..codec::HEADER_LEN].try_into().unwrap();
        let hdr = codec::decode_header(&hdr_bytes).unwrap();
        let body = &frame[codec::HEADER_LEN..codec::HEADER_LEN + hdr.body_length as usize];
        let value: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(value["action"], "count_down");
        assert_eq!(value["count"], 5);
    }

    #[test]
    fn join_body_parses_minimal_json() {
        let body: JoinBody = serde_json::from_str(r#"{"player_id":"p1","player_name":"Alice"}"#).unwrap();
        assert_eq!(body.player_id, "p1");
        assert_eq!(body.player_name, "Alice");
    }
}
